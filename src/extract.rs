//! Interface lookup and method-set completion.

use tracing::debug;

use crate::error::{CheckError, ExtractError};
use crate::types::{
    identical_signatures, underlying, Element, Interface, Method, ObjectKind, Package, PackageRef,
    PackageSource, Type,
};

/// A named interface with its complete method set.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceSymbol {
    pub name: String,
    /// Package declaring the interface.
    pub package: PackageRef,
    /// Explicit and embedded methods, in declaration order.
    pub methods: Vec<Method>,
}

/// Look up `name` in the package scope and complete its method set.
pub fn extract(
    source: &dyn PackageSource,
    package: &Package,
    name: &str,
) -> Result<InterfaceSymbol, ExtractError> {
    let object = package.lookup(name).ok_or_else(|| ExtractError::NotFound {
        name: name.to_string(),
    })?;
    let check = |source| ExtractError::Check {
        name: name.to_string(),
        source,
    };

    let (params, declared) = match object.kind {
        ObjectKind::TypeName { params, underlying } => (params, underlying),
        ObjectKind::Alias { target } => (Vec::new(), target),
        ObjectKind::Value(kind) => {
            return Err(ExtractError::NotInterface {
                name: name.to_string(),
                kind: kind.as_str().to_string(),
            })
        }
        ObjectKind::Opaque => {
            return Err(ExtractError::Unsupported {
                name: name.to_string(),
                reason: format!("declarations of package {} are unknown", package.path),
            })
        }
    };

    let iface = match underlying(source, &declared).map_err(check)? {
        Type::Interface(iface) => iface,
        other => {
            return Err(ExtractError::NotInterface {
                name: name.to_string(),
                kind: other.kind(),
            })
        }
    };
    if !params.is_empty() {
        return Err(ExtractError::Unsupported {
            name: name.to_string(),
            reason: "generic interfaces are not supported".to_string(),
        });
    }

    let mut completion = Completion {
        source,
        name,
        methods: Vec::new(),
        visiting: Vec::new(),
    };
    completion.add(&iface)?;
    debug!(interface = name, methods = completion.methods.len(), "completed interface");

    Ok(InterfaceSymbol {
        name: name.to_string(),
        package: package.reference(),
        methods: completion.methods,
    })
}

/// Every mockable interface of the package, in declaration order.
///
/// Type names that are not interfaces, generic interfaces and constraint
/// interfaces are skipped; any other failure is returned.
pub fn discover(
    source: &dyn PackageSource,
    package: &Package,
) -> Result<Vec<InterfaceSymbol>, ExtractError> {
    let mut found = Vec::new();
    for object in package.objects() {
        if !matches!(object.kind, ObjectKind::TypeName { .. }) {
            continue;
        }
        match extract(source, package, &object.name) {
            Ok(symbol) => found.push(symbol),
            Err(ExtractError::NotInterface { .. }) | Err(ExtractError::Unsupported { .. }) => {
                debug!(name = %object.name, "skipping non-mockable type");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(found)
}

/// Flattens embedded interfaces into one ordered method list.
struct Completion<'s> {
    source: &'s dyn PackageSource,
    name: &'s str,
    methods: Vec<Method>,
    /// Named interfaces currently being expanded.
    visiting: Vec<(Option<String>, String)>,
}

impl Completion<'_> {
    fn add(&mut self, iface: &Interface) -> Result<(), ExtractError> {
        for elem in &iface.elems {
            match elem {
                Element::Method(method) => self.push(method)?,
                Element::Embedded(ty) => self.embed(ty)?,
            }
        }
        Ok(())
    }

    fn embed(&mut self, ty: &Type) -> Result<(), ExtractError> {
        let key = match ty {
            Type::Named(named) => Some((
                named.package.as_ref().map(|p| p.path.clone()),
                named.name.clone(),
            )),
            _ => None,
        };
        if let Some(key) = &key {
            if self.visiting.contains(key) {
                return Err(self.check_error(CheckError::RecursiveType { name: key.1.clone() }));
            }
        }

        let resolved = underlying(self.source, ty).map_err(|e| self.check_error(e))?;
        let Type::Interface(inner) = resolved else {
            return Err(ExtractError::Unsupported {
                name: self.name.to_string(),
                reason: "constraint interfaces with type-set elements cannot be mocked"
                    .to_string(),
            });
        };

        if let Some(key) = key.clone() {
            self.visiting.push(key);
        }
        let result = self.add(&inner);
        if key.is_some() {
            self.visiting.pop();
        }
        result
    }

    fn push(&mut self, method: &Method) -> Result<(), ExtractError> {
        match self.methods.iter().find(|m| m.name == method.name) {
            None => {
                self.methods.push(method.clone());
                Ok(())
            }
            Some(existing) if identical_signatures(&existing.sig, &method.sig) => Ok(()),
            Some(_) => Err(self.check_error(CheckError::DuplicateMethod {
                name: method.name.clone(),
                interface: self.name.to_string(),
            })),
        }
    }

    fn check_error(&self, source: CheckError) -> ExtractError {
        ExtractError::Check {
            name: self.name.to_string(),
            source,
        }
    }
}
