//! Checked packages and their package-level scope.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::analysis::{ImportSpec, Span, ValueKind};

use super::{PackageRef, Type};

/// What a package-level name denotes.
#[derive(Debug, Clone)]
pub enum ObjectKind {
    /// `type Name[params] T`: `underlying` holds the resolved `T`, which may
    /// itself be another named type.
    TypeName {
        params: Vec<String>,
        underlying: Type,
    },
    /// `type Name = T`
    Alias { target: Type },
    Value(ValueKind),
    /// An exported name of a package known only by its path.
    Opaque,
}

/// A package-level object.
#[derive(Debug, Clone)]
pub struct Object {
    pub name: String,
    pub kind: ObjectKind,
    /// Declaring file and position, when declared in source.
    pub file: Option<String>,
    pub span: Option<Span>,
}

impl Object {
    /// Describe the object for "is not an interface" diagnostics.
    pub fn describe(&self) -> String {
        match &self.kind {
            ObjectKind::TypeName { underlying, .. } => underlying.kind(),
            ObjectKind::Alias { target } => target.kind(),
            ObjectKind::Value(kind) => kind.as_str().to_string(),
            ObjectKind::Opaque => "opaque type".to_string(),
        }
    }
}

/// A type-checked package. Immutable once built.
#[derive(Debug, Clone)]
pub struct Package {
    /// Import path; directories without one use their absolute path.
    pub path: String,
    /// Declared package name.
    pub name: String,
    /// Directory the files were read from, `None` for pre-built packages.
    pub dir: Option<PathBuf>,
    /// Import declarations of every file, in file order.
    pub imports: Vec<ImportSpec>,
    /// Objects in declaration order.
    objects: Vec<Object>,
    index: HashMap<String, usize>,
    /// Values of the integer constants.
    constants: HashMap<String, i128>,
    /// Pre-built packages known only by path answer every exported name.
    opaque: bool,
}

impl Package {
    pub fn new(path: &str, name: &str, dir: Option<PathBuf>, imports: Vec<ImportSpec>) -> Self {
        Self {
            path: path.to_string(),
            name: name.to_string(),
            dir,
            imports,
            objects: Vec::new(),
            index: HashMap::new(),
            constants: HashMap::new(),
            opaque: false,
        }
    }

    /// A package whose declarations are unknown; every exported name
    /// resolves to an opaque type.
    pub fn opaque(path: &str, name: &str) -> Self {
        let mut package = Self::new(path, name, None, Vec::new());
        package.opaque = true;
        package
    }

    pub fn is_opaque(&self) -> bool {
        self.opaque
    }

    pub fn reference(&self) -> PackageRef {
        PackageRef {
            path: self.path.clone(),
            name: self.name.clone(),
        }
    }

    /// Insert an object. Returns the previous object of that name, if any.
    pub(crate) fn insert(&mut self, object: Object) -> Option<&Object> {
        if let Some(&idx) = self.index.get(&object.name) {
            return Some(&self.objects[idx]);
        }
        self.index.insert(object.name.clone(), self.objects.len());
        self.objects.push(object);
        None
    }

    pub(crate) fn replace(&mut self, object: Object) {
        match self.index.get(&object.name) {
            Some(&idx) => self.objects[idx] = object,
            None => {
                self.insert(object);
            }
        }
    }

    /// Look up a name in the package scope only.
    pub fn lookup(&self, name: &str) -> Option<Object> {
        if let Some(&idx) = self.index.get(name) {
            return Some(self.objects[idx].clone());
        }
        if self.opaque && is_exported(name) {
            return Some(Object {
                name: name.to_string(),
                kind: ObjectKind::Opaque,
                file: None,
                span: None,
            });
        }
        None
    }

    /// Objects in declaration order.
    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    /// Value of an integer constant declared by the package.
    pub fn constant(&self, name: &str) -> Option<i128> {
        self.constants.get(name).copied()
    }

    pub(crate) fn set_constant(&mut self, name: &str, value: i128) {
        self.constants.insert(name.to_string(), value);
    }
}

/// Go's export rule: the name starts with an upper-case letter.
pub fn is_exported(name: &str) -> bool {
    name.chars().next().map(char::is_uppercase).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(name: &str) -> Object {
        Object {
            name: name.to_string(),
            kind: ObjectKind::Value(ValueKind::Var),
            file: None,
            span: None,
        }
    }

    #[test]
    fn test_insert_reports_redeclaration() {
        let mut pkg = Package::new("example.com/p", "p", None, Vec::new());
        assert!(pkg.insert(value("x")).is_none());
        assert!(pkg.insert(value("x")).is_some());
        assert_eq!(pkg.objects().len(), 1);
    }

    #[test]
    fn test_opaque_answers_exported_names_only() {
        let pkg = Package::opaque("net/http", "http");
        assert!(matches!(
            pkg.lookup("Request").map(|o| o.kind),
            Some(ObjectKind::Opaque)
        ));
        assert!(pkg.lookup("request").is_none());
    }
}
