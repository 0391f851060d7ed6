//! Package-level type checking.
//!
//! The checker builds a package scope from parsed files and resolves every
//! type declaration's expression into a [`Type`]. Imported packages are
//! requested from the [`Importer`] the first time a declaration refers to
//! them. Function bodies and variable initialisers are never looked at;
//! integer constants are evaluated so array lengths render as numbers.

use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use tracing::debug;

use crate::analysis::{
    ConstExpr, ConstKind, ConstValue, Decl, FieldExpr, FuncExpr, ImportSpec, InterfaceElem,
    ParamExpr, SourceFile, Span, TypeExpr, TypeSpec,
};
use crate::error::CheckError;

use super::env::Importer;
use super::package::{is_exported, Object, ObjectKind};
use super::{universe, Element, Field, Interface, Method, Named, Package, Signature, Type, Var};

/// Checks one package's files against an [`Importer`].
pub struct Checker<'a> {
    importer: &'a mut dyn Importer,
    package: Package,
    files: Vec<SourceFile>,
    /// Type declarations by name, with the index of their file.
    types: HashMap<String, (usize, TypeSpec)>,
    /// Import names already bound, per file.
    scopes: Vec<HashMap<String, Rc<Package>>>,
    /// Resolved alias targets of this package.
    aliases: HashMap<String, Type>,
    /// Aliases currently being resolved.
    alias_stack: Vec<String>,
    /// Constant declarations by name, with the index of their file.
    consts: HashMap<String, (usize, ConstValue)>,
    /// Evaluated constants; `None` when the value is not an integer.
    values: HashMap<String, Option<i128>>,
    /// Constants currently being evaluated.
    const_stack: Vec<String>,
}

/// Where a type expression is being resolved.
struct Scope<'s> {
    file: usize,
    type_params: &'s [String],
}

impl<'a> Checker<'a> {
    pub fn new(
        importer: &'a mut dyn Importer,
        path: &str,
        dir: Option<PathBuf>,
        files: Vec<SourceFile>,
    ) -> Self {
        let name = files.first().map(|f| f.package.clone()).unwrap_or_default();
        let imports: Vec<ImportSpec> = files.iter().flat_map(|f| f.imports.clone()).collect();
        let scopes = files.iter().map(|_| HashMap::new()).collect();
        Self {
            importer,
            package: Package::new(path, &name, dir, imports),
            files,
            types: HashMap::new(),
            scopes,
            aliases: HashMap::new(),
            alias_stack: Vec::new(),
            consts: HashMap::new(),
            values: HashMap::new(),
            const_stack: Vec::new(),
        }
    }

    /// Check the package and return its scope.
    pub fn check(mut self) -> Result<Package, CheckError> {
        let Some(first) = self.files.first() else {
            return Err(CheckError::NoGoFiles);
        };
        for file in &self.files[1..] {
            if file.package != first.package {
                return Err(CheckError::MixedPackages {
                    first: first.package.clone(),
                    first_file: first.path.clone(),
                    second: file.package.clone(),
                    second_file: file.path.clone(),
                });
            }
        }

        self.declare()?;

        let order: Vec<(usize, usize)> = self
            .files
            .iter()
            .enumerate()
            .flat_map(|(f, file)| (0..file.decls.len()).map(move |d| (f, d)))
            .collect();

        for (f, d) in order {
            let decl = self.files[f].decls[d].clone();
            let Decl::Type(spec) = decl else { continue };
            if spec.name == "_" {
                continue;
            }
            let object = self.check_type_decl(f, &spec)?;
            self.package.replace(object);
        }

        self.record_constants();

        debug!(
            path = %self.package.path,
            objects = self.package.objects().len(),
            "checked package"
        );
        Ok(self.package)
    }

    /// Insert every package-level name, reporting redeclarations.
    fn declare(&mut self) -> Result<(), CheckError> {
        for (f, file) in self.files.iter().enumerate() {
            for decl in &file.decls {
                let name = decl.name();
                if name == "_" || (name == "init" && matches!(decl, Decl::Value { .. })) {
                    continue;
                }
                let kind = match decl {
                    Decl::Type(_) => ObjectKind::Opaque,
                    Decl::Value { kind, .. } => ObjectKind::Value(*kind),
                };
                let object = Object {
                    name: name.to_string(),
                    kind,
                    file: Some(file.path.clone()),
                    span: Some(decl.span().clone()),
                };
                if self.package.insert(object).is_some() {
                    return Err(CheckError::Redeclared {
                        name: name.to_string(),
                        file: file.path.clone(),
                        span: decl.span().clone(),
                    });
                }
                match decl {
                    Decl::Type(spec) => {
                        self.types.insert(name.to_string(), (f, spec.clone()));
                    }
                    Decl::Value {
                        value: Some(value), ..
                    } => {
                        self.consts.insert(name.to_string(), (f, value.clone()));
                    }
                    Decl::Value { .. } => {}
                }
            }
        }
        Ok(())
    }

    fn check_type_decl(&mut self, file: usize, spec: &TypeSpec) -> Result<Object, CheckError> {
        let kind = if spec.alias {
            ObjectKind::Alias {
                target: self.alias_target(&spec.name)?,
            }
        } else {
            let params: Vec<String> = spec.type_params.iter().map(|p| p.name.clone()).collect();
            let scope = Scope {
                file,
                type_params: &params,
            };
            for param in &spec.type_params {
                self.resolve(&scope, &param.constraint)?;
            }
            let underlying = self.resolve(&scope, &spec.ty)?;
            ObjectKind::TypeName {
                params: params.clone(),
                underlying,
            }
        };
        Ok(Object {
            name: spec.name.clone(),
            kind,
            file: Some(self.files[file].path.clone()),
            span: Some(spec.span.clone()),
        })
    }

    /// Resolve `type name = T` to `T`, following chains of aliases.
    fn alias_target(&mut self, name: &str) -> Result<Type, CheckError> {
        if let Some(target) = self.aliases.get(name) {
            return Ok(target.clone());
        }
        if self.alias_stack.iter().any(|n| n == name) {
            return Err(CheckError::RecursiveType {
                name: name.to_string(),
            });
        }
        let Some((file, spec)) = self.types.get(name).cloned() else {
            return Err(CheckError::UnknownType {
                package: self.package.path.clone(),
                name: name.to_string(),
            });
        };

        self.alias_stack.push(name.to_string());
        let params: Vec<String> = spec.type_params.iter().map(|p| p.name.clone()).collect();
        let scope = Scope {
            file,
            type_params: &params,
        };
        let target = self.resolve(&scope, &spec.ty);
        self.alias_stack.pop();

        let target = target?;
        self.aliases.insert(name.to_string(), target.clone());
        Ok(target)
    }

    fn resolve(&mut self, scope: &Scope<'_>, expr: &TypeExpr) -> Result<Type, CheckError> {
        match expr {
            TypeExpr::Name { name, span } => self.resolve_name(scope, name, span),
            TypeExpr::Qualified {
                package,
                name,
                span,
            } => self.resolve_qualified(scope, package, name, span),
            TypeExpr::Generic { base, args } => {
                let base = self.resolve(scope, base)?;
                let args = args
                    .iter()
                    .map(|a| self.resolve(scope, a))
                    .collect::<Result<Vec<_>, _>>()?;
                match base {
                    Type::Named(named) => Ok(Type::Named(Named { args, ..named })),
                    other => Ok(other),
                }
            }
            TypeExpr::Pointer(elem) => Ok(Type::Pointer(Box::new(self.resolve(scope, elem)?))),
            TypeExpr::Slice(elem) => Ok(Type::Slice(Box::new(self.resolve(scope, elem)?))),
            TypeExpr::Array { len, elem } => Ok(Type::Array {
                len: self.array_length(scope, len)?.to_string(),
                elem: Box::new(self.resolve(scope, elem)?),
            }),
            TypeExpr::Map { key, value } => Ok(Type::Map {
                key: Box::new(self.resolve(scope, key)?),
                value: Box::new(self.resolve(scope, value)?),
            }),
            TypeExpr::Chan { dir, elem } => Ok(Type::Chan {
                dir: *dir,
                elem: Box::new(self.resolve(scope, elem)?),
            }),
            TypeExpr::Func(func) => Ok(Type::Signature(self.resolve_func(scope, func)?)),
            TypeExpr::Struct(fields) => Ok(Type::Struct(self.resolve_fields(scope, fields)?)),
            TypeExpr::Interface(elems) => {
                let mut iface = Interface::default();
                for elem in elems {
                    match elem {
                        InterfaceElem::Method { name, sig } => {
                            iface.elems.push(Element::Method(Method {
                                name: name.clone(),
                                sig: self.resolve_func(scope, sig)?,
                            }))
                        }
                        InterfaceElem::Embed(ty) => {
                            iface.elems.push(Element::Embedded(self.resolve(scope, ty)?))
                        }
                    }
                }
                Ok(Type::Interface(iface))
            }
            TypeExpr::Union(terms) => Ok(Type::Union(
                terms
                    .iter()
                    .map(|t| self.resolve(scope, t))
                    .collect::<Result<_, _>>()?,
            )),
            TypeExpr::Tilde(inner) => Ok(Type::Tilde(Box::new(self.resolve(scope, inner)?))),
        }
    }

    fn array_length(&mut self, scope: &Scope<'_>, len: &ConstExpr) -> Result<i128, CheckError> {
        match self.eval(scope.file, None, len)? {
            Some(n) if n >= 0 => Ok(n),
            _ => Err(CheckError::ArrayLength {
                expr: len.text.clone(),
                file: self.file_path(scope),
                span: len.span.clone(),
            }),
        }
    }

    /// Evaluate every integer constant so importers can use them in array
    /// lengths. Constants that fail to evaluate are left out.
    fn record_constants(&mut self) {
        let mut names: Vec<String> = self.consts.keys().cloned().collect();
        names.sort();
        for name in names {
            match self.constant(&name) {
                Ok(Some(value)) => self.package.set_constant(&name, value),
                Ok(None) => {}
                Err(err) => debug!(constant = %name, error = %err, "constant not evaluated"),
            }
        }
    }

    /// Value of a package-level constant of this package.
    fn constant(&mut self, name: &str) -> Result<Option<i128>, CheckError> {
        if let Some(value) = self.values.get(name) {
            return Ok(*value);
        }
        let Some((file, value)) = self.consts.get(name).cloned() else {
            return Ok(None);
        };
        if self.const_stack.iter().any(|n| n == name) {
            return Ok(None);
        }

        self.const_stack.push(name.to_string());
        let result = self.eval(file, Some(value.iota), &value.expr);
        self.const_stack.pop();

        let result = result?;
        self.values.insert(name.to_string(), result);
        Ok(result)
    }

    /// Evaluate an untyped integer constant expression. `Ok(None)` means
    /// the expression is valid but not an integer constant this checker
    /// can compute.
    fn eval(
        &mut self,
        file: usize,
        iota: Option<i128>,
        expr: &ConstExpr,
    ) -> Result<Option<i128>, CheckError> {
        match &expr.kind {
            ConstKind::Int(n) => Ok(Some(*n)),
            ConstKind::Iota => Ok(iota),
            ConstKind::Name(name) => self.eval_name(file, name, &expr.span),
            ConstKind::Qualified { package, name } => {
                let scope = Scope {
                    file,
                    type_params: &[],
                };
                let imported = self.import_name(&scope, package, &expr.span)?;
                if !is_exported(name) {
                    return Err(CheckError::Unexported {
                        package: imported.path.clone(),
                        name: name.clone(),
                        file: self.file_path(&scope),
                        span: expr.span.clone(),
                    });
                }
                if imported.lookup(name).is_none() {
                    return Err(CheckError::MissingMember {
                        package: package.clone(),
                        name: name.clone(),
                        file: self.file_path(&scope),
                        span: expr.span.clone(),
                    });
                }
                Ok(imported.constant(name))
            }
            ConstKind::Unary { op, operand } => {
                let Some(x) = self.eval(file, iota, operand)? else {
                    return Ok(None);
                };
                Ok(match op.as_str() {
                    "+" => Some(x),
                    "-" => x.checked_neg(),
                    "^" => Some(!x),
                    _ => None,
                })
            }
            ConstKind::Binary { op, lhs, rhs } => {
                let x = self.eval(file, iota, lhs)?;
                let y = self.eval(file, iota, rhs)?;
                let (Some(x), Some(y)) = (x, y) else {
                    return Ok(None);
                };
                Ok(binary(op, x, y))
            }
            ConstKind::Other => Ok(None),
        }
    }

    fn eval_name(
        &mut self,
        file: usize,
        name: &str,
        span: &Span,
    ) -> Result<Option<i128>, CheckError> {
        if self.consts.contains_key(name) {
            return self.constant(name);
        }
        if self.package.lookup(name).is_some() {
            return Ok(None);
        }

        let dot_imports: Vec<String> = self.files[file]
            .imports
            .iter()
            .filter(|i| i.is_dot())
            .map(|i| i.path.clone())
            .collect();
        for path in dot_imports {
            let package = self.import(&path)?;
            if package.lookup(name).filter(|o| is_exported(&o.name)).is_some() {
                return Ok(package.constant(name));
            }
        }

        if matches!(name, "true" | "false" | "nil") || universe::lookup(name).is_some() {
            return Ok(None);
        }
        Err(CheckError::Undefined {
            name: name.to_string(),
            file: self.files[file].path.clone(),
            span: span.clone(),
        })
    }

    fn resolve_func(&mut self, scope: &Scope<'_>, func: &FuncExpr) -> Result<Signature, CheckError> {
        let mut params = self.resolve_params(scope, &func.params)?;
        if func.variadic {
            if let Some(last) = params.last_mut() {
                let elem = std::mem::replace(&mut last.ty, Type::Basic(String::new()));
                last.ty = Type::Slice(Box::new(elem));
            }
        }
        Ok(Signature {
            params,
            results: self.resolve_params(scope, &func.results)?,
            variadic: func.variadic,
        })
    }

    fn resolve_params(
        &mut self,
        scope: &Scope<'_>,
        params: &[ParamExpr],
    ) -> Result<Vec<Var>, CheckError> {
        params
            .iter()
            .map(|p| {
                Ok(Var {
                    name: p.name.clone(),
                    ty: self.resolve(scope, &p.ty)?,
                })
            })
            .collect()
    }

    fn resolve_fields(
        &mut self,
        scope: &Scope<'_>,
        fields: &[FieldExpr],
    ) -> Result<Vec<Field>, CheckError> {
        fields
            .iter()
            .map(|f| {
                Ok(Field {
                    name: f.name.clone(),
                    ty: self.resolve(scope, &f.ty)?,
                    tag: f.tag.clone(),
                })
            })
            .collect()
    }

    fn resolve_name(
        &mut self,
        scope: &Scope<'_>,
        name: &str,
        span: &Span,
    ) -> Result<Type, CheckError> {
        if scope.type_params.iter().any(|p| p == name) {
            return Ok(Type::TypeParam(name.to_string()));
        }

        match self.types.get(name).map(|(_, spec)| spec.alias) {
            Some(true) => return self.alias_target(name),
            Some(false) => {
                return Ok(Type::Named(Named {
                    package: Some(self.package.reference()),
                    name: name.to_string(),
                    args: Vec::new(),
                }))
            }
            None => {}
        }
        if self.package.lookup(name).is_some() {
            return Err(CheckError::NotAType {
                name: name.to_string(),
                file: self.file_path(scope),
                span: span.clone(),
            });
        }

        let dot_imports: Vec<String> = self.files[scope.file]
            .imports
            .iter()
            .filter(|i| i.is_dot())
            .map(|i| i.path.clone())
            .collect();
        for path in dot_imports {
            let package = self.import(&path)?;
            if let Some(object) = package.lookup(name).filter(|o| is_exported(&o.name)) {
                return self.object_type(scope, &package, object, span);
            }
        }

        universe::lookup(name).ok_or_else(|| CheckError::Undefined {
            name: name.to_string(),
            file: self.file_path(scope),
            span: span.clone(),
        })
    }

    fn resolve_qualified(
        &mut self,
        scope: &Scope<'_>,
        package_name: &str,
        name: &str,
        span: &Span,
    ) -> Result<Type, CheckError> {
        let package = self.import_name(scope, package_name, span)?;
        if !is_exported(name) {
            return Err(CheckError::Unexported {
                package: package.path.clone(),
                name: name.to_string(),
                file: self.file_path(scope),
                span: span.clone(),
            });
        }
        let object = package
            .lookup(name)
            .ok_or_else(|| CheckError::MissingMember {
                package: package_name.to_string(),
                name: name.to_string(),
                file: self.file_path(scope),
                span: span.clone(),
            })?;
        self.object_type(scope, &package, object, span)
    }

    fn object_type(
        &self,
        scope: &Scope<'_>,
        package: &Package,
        object: Object,
        span: &Span,
    ) -> Result<Type, CheckError> {
        match object.kind {
            ObjectKind::TypeName { .. } | ObjectKind::Opaque => Ok(Type::Named(Named {
                package: Some(package.reference()),
                name: object.name,
                args: Vec::new(),
            })),
            ObjectKind::Alias { target } => Ok(target),
            ObjectKind::Value(_) => Err(CheckError::NotAType {
                name: format!("{}.{}", package.name, object.name),
                file: self.file_path(scope),
                span: span.clone(),
            }),
        }
    }

    /// Bind an import name used in a file to its package, importing
    /// candidates until one declares the name.
    fn import_name(
        &mut self,
        scope: &Scope<'_>,
        name: &str,
        span: &Span,
    ) -> Result<Rc<Package>, CheckError> {
        if let Some(package) = self.scopes[scope.file].get(name) {
            return Ok(package.clone());
        }

        let imports = self.files[scope.file].imports.clone();
        if let Some(spec) = imports.iter().find(|i| i.alias() == Some(name)) {
            let package = self.import(&spec.path)?;
            self.scopes[scope.file].insert(name.to_string(), package.clone());
            return Ok(package);
        }

        // Unaliased imports are bound by the name their package declares;
        // try the likeliest path first.
        let mut candidates: Vec<&ImportSpec> =
            imports.iter().filter(|i| i.name.is_none()).collect();
        candidates.sort_by_key(|i| guess_name(&i.path) != name);

        let mut first_error = None;
        for spec in candidates {
            let package = match self.import(&spec.path) {
                Ok(package) => package,
                Err(err) => {
                    first_error.get_or_insert(err);
                    continue;
                }
            };
            self.scopes[scope.file].insert(package.name.clone(), package.clone());
            if package.name == name {
                return Ok(package);
            }
        }

        Err(first_error.unwrap_or_else(|| CheckError::UnknownPackage {
            name: name.to_string(),
            file: self.file_path(scope),
            span: span.clone(),
        }))
    }

    fn import(&mut self, path: &str) -> Result<Rc<Package>, CheckError> {
        self.importer
            .import(path)
            .map_err(|source| CheckError::Import {
                path: path.to_string(),
                source: Box::new(source),
            })
    }

    fn file_path(&self, scope: &Scope<'_>) -> String {
        self.files[scope.file].path.clone()
    }
}

/// Integer arithmetic on constants; `None` on overflow, division by zero or
/// an operator that does not yield an integer.
fn binary(op: &str, x: i128, y: i128) -> Option<i128> {
    match op {
        "+" => x.checked_add(y),
        "-" => x.checked_sub(y),
        "*" => x.checked_mul(y),
        "/" => x.checked_div(y),
        "%" => x.checked_rem(y),
        "&" => Some(x & y),
        "|" => Some(x | y),
        "^" => Some(x ^ y),
        "&^" => Some(x & !y),
        "<<" => u32::try_from(y)
            .ok()
            .and_then(|s| x.checked_shl(s))
            .filter(|v| *v >> y == x),
        ">>" => u32::try_from(y).ok().and_then(|s| x.checked_shr(s)),
        _ => None,
    }
}

/// The package name an import path most likely declares.
fn guess_name(path: &str) -> &str {
    let mut elems = path.rsplit('/');
    let last = elems.next().unwrap_or(path);
    let is_version = last.len() > 1
        && last.starts_with('v')
        && last[1..].chars().all(|c| c.is_ascii_digit());
    let last = if is_version {
        elems.next().unwrap_or(last)
    } else {
        last
    };
    last.strip_prefix("go-").unwrap_or(last)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::analysis::GoSyntax;
    use crate::error::ResolveError;
    use crate::types::{type_string, PackageSource};

    /// Checks in-memory sources on demand, keyed by import path.
    #[derive(Default)]
    struct MemoryImporter {
        sources: HashMap<String, Vec<(String, String)>>,
        checked: HashMap<String, Rc<Package>>,
        requested: Vec<String>,
    }

    impl MemoryImporter {
        fn with(mut self, path: &str, file: &str, src: &str) -> Self {
            self.sources
                .entry(path.to_string())
                .or_default()
                .push((file.to_string(), src.to_string()));
            self
        }
    }

    impl PackageSource for MemoryImporter {
        fn package(&self, path: &str) -> Option<Rc<Package>> {
            self.checked.get(path).cloned()
        }
    }

    impl Importer for MemoryImporter {
        fn import(&mut self, path: &str) -> Result<Rc<Package>, ResolveError> {
            self.requested.push(path.to_string());
            if let Some(pkg) = self.checked.get(path) {
                return Ok(pkg.clone());
            }
            let Some(sources) = self.sources.get(path).cloned() else {
                return Err(ResolveError::NotLocated {
                    path: path.to_string(),
                    attempts: Vec::new(),
                });
            };
            let files = parse_all(&sources);
            let pkg = Checker::new(self, path, None, files)
                .check()
                .map_err(|source| ResolveError::Check {
                    path: path.to_string(),
                    source,
                })?;
            let pkg = Rc::new(pkg);
            self.checked.insert(path.to_string(), pkg.clone());
            Ok(pkg)
        }
    }

    fn parse_all(sources: &[(String, String)]) -> Vec<SourceFile> {
        let syntax = GoSyntax::new();
        sources
            .iter()
            .map(|(name, src)| syntax.parse_file(Path::new(name), src.as_bytes()).unwrap())
            .collect()
    }

    fn check(importer: &mut MemoryImporter, files: &[(&str, &str)]) -> Result<Package, CheckError> {
        let owned: Vec<(String, String)> = files
            .iter()
            .map(|(n, s)| (n.to_string(), s.to_string()))
            .collect();
        Checker::new(importer, "example.com/target", None, parse_all(&owned)).check()
    }

    fn underlying_of(pkg: &Package, name: &str) -> Type {
        match pkg.lookup(name).map(|o| o.kind) {
            Some(ObjectKind::TypeName { underlying, .. }) => underlying,
            Some(ObjectKind::Alias { target }) => target,
            other => panic!("{} is not a type: {:?}", name, other),
        }
    }

    fn render(ty: &Type) -> String {
        type_string(ty, &mut |p| p.name.clone())
    }

    #[test]
    fn test_resolves_imported_types() {
        let mut importer = MemoryImporter::default().with(
            "example.com/models",
            "models.go",
            "package models\ntype User struct{ Name string }\n",
        );
        let pkg = check(
            &mut importer,
            &[(
                "store.go",
                "package store\nimport \"example.com/models\"\ntype Store interface {\n\tGet(id int) (*models.User, error)\n}\n",
            )],
        )
        .unwrap();

        let ty = underlying_of(&pkg, "Store");
        assert_eq!(
            render(&ty),
            "interface{ Get(id int) (*models.User, error) }"
        );
        assert_eq!(importer.requested, vec!["example.com/models"]);
    }

    #[test]
    fn test_unaliased_import_binds_declared_name() {
        let mut importer = MemoryImporter::default().with(
            "example.com/go-widgets/v2",
            "w.go",
            "package widgets\ntype Widget int\n",
        );
        let pkg = check(
            &mut importer,
            &[(
                "a.go",
                "package a\nimport \"example.com/go-widgets/v2\"\ntype W = widgets.Widget\n",
            )],
        )
        .unwrap();
        assert_eq!(render(&underlying_of(&pkg, "W")), "widgets.Widget");
    }

    #[test]
    fn test_alias_import_and_dot_import() {
        let mut importer = MemoryImporter::default()
            .with("example.com/x", "x.go", "package x\ntype X int\n")
            .with("example.com/y", "y.go", "package y\ntype Y string\n");
        let pkg = check(
            &mut importer,
            &[(
                "a.go",
                "package a\nimport (\n\tex \"example.com/x\"\n\t. \"example.com/y\"\n)\ntype Pair struct {\n\tA ex.X\n\tB Y\n}\n",
            )],
        )
        .unwrap();
        assert_eq!(render(&underlying_of(&pkg, "Pair")), "struct{ A x.X; B y.Y }");
    }

    #[test]
    fn test_mixed_package_names_fail() {
        let mut importer = MemoryImporter::default();
        let err = check(
            &mut importer,
            &[("a.go", "package a\n"), ("b.go", "package b\n")],
        )
        .unwrap_err();
        assert!(matches!(err, CheckError::MixedPackages { .. }));
    }

    #[test]
    fn test_redeclaration_fails() {
        let mut importer = MemoryImporter::default();
        let err = check(
            &mut importer,
            &[
                ("a.go", "package a\ntype T int\n"),
                ("b.go", "package a\nfunc T() {}\n"),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, CheckError::Redeclared { ref name, .. } if name == "T"));
    }

    #[test]
    fn test_init_and_blank_may_repeat() {
        let mut importer = MemoryImporter::default();
        let pkg = check(
            &mut importer,
            &[
                ("a.go", "package a\nfunc init() {}\nvar _ = 1\n"),
                ("b.go", "package a\nfunc init() {}\nvar _ = 2\n"),
            ],
        );
        assert!(pkg.is_ok());
    }

    #[test]
    fn test_undefined_and_unknown_package() {
        let mut importer = MemoryImporter::default();
        let err = check(&mut importer, &[("a.go", "package a\ntype T Missing\n")]).unwrap_err();
        assert!(matches!(err, CheckError::Undefined { ref name, .. } if name == "Missing"));

        let err = check(&mut importer, &[("a.go", "package a\ntype T nope.Thing\n")]).unwrap_err();
        assert!(matches!(err, CheckError::UnknownPackage { ref name, .. } if name == "nope"));
    }

    #[test]
    fn test_value_used_as_type() {
        let mut importer = MemoryImporter::default();
        let err = check(
            &mut importer,
            &[("a.go", "package a\nvar v int\ntype T []v\n")],
        )
        .unwrap_err();
        assert!(matches!(err, CheckError::NotAType { .. }));
    }

    #[test]
    fn test_unexported_member_fails() {
        let mut importer =
            MemoryImporter::default().with("example.com/x", "x.go", "package x\ntype hidden int\n");
        let err = check(
            &mut importer,
            &[("a.go", "package a\nimport \"example.com/x\"\ntype T x.hidden\n")],
        )
        .unwrap_err();
        assert!(matches!(err, CheckError::Unexported { .. }));
    }

    #[test]
    fn test_alias_cycle_is_recursive_type() {
        let mut importer = MemoryImporter::default();
        let err = check(
            &mut importer,
            &[("a.go", "package a\ntype A = B\ntype B = A\n")],
        )
        .unwrap_err();
        assert!(matches!(err, CheckError::RecursiveType { .. }));
    }

    #[test]
    fn test_variadic_parameter_is_slice() {
        let mut importer = MemoryImporter::default();
        let pkg = check(
            &mut importer,
            &[(
                "a.go",
                "package a\ntype I interface {\n\tLog(format string, args ...interface{})\n}\n",
            )],
        )
        .unwrap();
        let Type::Interface(iface) = underlying_of(&pkg, "I") else {
            panic!("expected interface");
        };
        let sig = &iface.methods().next().unwrap().sig;
        assert!(sig.variadic);
        assert_eq!(render(&sig.params[1].ty), "[]interface{}");
    }

    #[test]
    fn test_type_parameters_are_scoped() {
        let mut importer = MemoryImporter::default();
        let pkg = check(
            &mut importer,
            &[(
                "a.go",
                "package a\ntype List[T any] struct {\n\tItems []T\n}\ntype Ints = List[int]\n",
            )],
        )
        .unwrap();
        assert_eq!(render(&underlying_of(&pkg, "Ints")), "a.List[int]");

        let err = check(&mut importer, &[("b.go", "package a\ntype Bad []T\n")]).unwrap_err();
        assert!(matches!(err, CheckError::Undefined { .. }));
    }

    #[test]
    fn test_array_lengths_are_evaluated() {
        let mut importer = MemoryImporter::default().with(
            "example.com/digest",
            "digest.go",
            "package digest\nconst (\n\tBlockSize = 1 << (iota + 4)\n\tSize\n)\n",
        );
        let pkg = check(
            &mut importer,
            &[(
                "a.go",
                "package a\nimport \"example.com/digest\"\nconst Words = Width / 2\nconst Width = 0x10\ntype Hasher interface {\n\tSum() [digest.Size]byte\n\tBlock() [digest.BlockSize * Words]uint32\n\tPad() [-(-3)]byte\n}\n",
            )],
        )
        .unwrap();

        assert_eq!(
            render(&underlying_of(&pkg, "Hasher")),
            "interface{ Sum() [32]byte; Block() [128]uint32; Pad() [3]byte }"
        );
        assert_eq!(pkg.constant("Words"), Some(8));
        assert_eq!(importer.checked["example.com/digest"].constant("Size"), Some(32));
    }

    #[test]
    fn test_unevaluable_array_length_fails() {
        let mut importer = MemoryImporter::default();
        let cases = [
            "package a\nvar n = 3\ntype T struct{ F [n]int }\n",
            "package a\nconst Name = \"x\"\ntype T struct{ F [Name]int }\n",
            "package a\ntype T struct{ F [len(\"ab\")]int }\n",
            "package a\nconst Neg = -1\ntype T struct{ F [Neg]int }\n",
        ];
        for src in cases {
            let err = check(&mut importer, &[("a.go", src)]).unwrap_err();
            assert!(
                matches!(err, CheckError::ArrayLength { .. }),
                "{}: {:?}",
                src,
                err
            );
        }

        let err = check(
            &mut importer,
            &[("a.go", "package a\ntype T struct{ F [Missing]int }\n")],
        )
        .unwrap_err();
        assert!(matches!(err, CheckError::Undefined { ref name, .. } if name == "Missing"));
    }

    #[test]
    fn test_guess_name() {
        assert_eq!(guess_name("net/http"), "http");
        assert_eq!(guess_name("github.com/x/go-yaml/v3"), "yaml");
        assert_eq!(guess_name("fmt"), "fmt");
    }
}
