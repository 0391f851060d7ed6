//! The environment the checker and extractor resolve packages through.

use std::rc::Rc;

use crate::error::{CheckError, ResolveError};

use super::package::ObjectKind;
use super::{universe, Element, Field, Interface, Method, Named, Package, Signature, Type, Var};

/// Read access to packages that have already been checked.
pub trait PackageSource {
    /// The checked package for an import path, if it has been loaded.
    fn package(&self, path: &str) -> Option<Rc<Package>>;
}

/// Symbol provider consulted by the checker for every imported package.
///
/// Implementations load, check and cache packages; an import path that is
/// currently being checked must be reported as an import cycle rather than
/// re-entered.
pub trait Importer: PackageSource {
    fn import(&mut self, path: &str) -> Result<Rc<Package>, ResolveError>;
}

/// Follow a chain of named types to the first non-named underlying type,
/// instantiating generic declarations with the named type's arguments.
pub fn underlying(source: &dyn PackageSource, ty: &Type) -> Result<Type, CheckError> {
    let mut seen: Vec<(Option<String>, String)> = Vec::new();
    let mut current = ty.clone();

    loop {
        let Type::Named(named) = &current else {
            return Ok(current);
        };
        let key = (named.package.as_ref().map(|p| p.path.clone()), named.name.clone());
        if seen.contains(&key) {
            return Err(CheckError::RecursiveType {
                name: named.name.clone(),
            });
        }
        seen.push(key);
        current = declared_underlying(source, named)?;
    }
}

fn declared_underlying(source: &dyn PackageSource, named: &Named) -> Result<Type, CheckError> {
    let Some(package_ref) = &named.package else {
        return universe::underlying(&named.name).ok_or_else(|| CheckError::UnknownType {
            package: "universe".to_string(),
            name: named.name.clone(),
        });
    };

    let package = source
        .package(&package_ref.path)
        .ok_or_else(|| CheckError::Unloaded(package_ref.path.clone()))?;
    let object = package
        .lookup(&named.name)
        .ok_or_else(|| CheckError::UnknownType {
            package: package_ref.path.clone(),
            name: named.name.clone(),
        })?;

    match object.kind {
        ObjectKind::TypeName { params, underlying } => {
            if named.args.is_empty() {
                Ok(underlying)
            } else {
                Ok(substitute(&underlying, &params, &named.args))
            }
        }
        ObjectKind::Alias { target } => Ok(target),
        ObjectKind::Opaque => Err(CheckError::Opaque {
            package: package_ref.path.clone(),
            name: named.name.clone(),
        }),
        ObjectKind::Value(_) => Err(CheckError::UnknownType {
            package: package_ref.path.clone(),
            name: named.name.clone(),
        }),
    }
}

/// Replace type parameters by their arguments. Parameters without a
/// matching argument are left in place.
pub fn substitute(ty: &Type, params: &[String], args: &[Type]) -> Type {
    let sub = |t: &Type| substitute(t, params, args);
    let boxed = |t: &Type| Box::new(substitute(t, params, args));

    match ty {
        Type::TypeParam(name) => params
            .iter()
            .position(|p| p == name)
            .and_then(|idx| args.get(idx))
            .cloned()
            .unwrap_or_else(|| ty.clone()),
        Type::Basic(_) => ty.clone(),
        Type::Named(named) => Type::Named(Named {
            package: named.package.clone(),
            name: named.name.clone(),
            args: named.args.iter().map(sub).collect(),
        }),
        Type::Pointer(elem) => Type::Pointer(boxed(elem)),
        Type::Slice(elem) => Type::Slice(boxed(elem)),
        Type::Array { len, elem } => Type::Array {
            len: len.clone(),
            elem: boxed(elem),
        },
        Type::Map { key, value } => Type::Map {
            key: boxed(key),
            value: boxed(value),
        },
        Type::Chan { dir, elem } => Type::Chan {
            dir: *dir,
            elem: boxed(elem),
        },
        Type::Signature(sig) => Type::Signature(substitute_signature(sig, params, args)),
        Type::Struct(fields) => Type::Struct(
            fields
                .iter()
                .map(|f| Field {
                    name: f.name.clone(),
                    ty: sub(&f.ty),
                    tag: f.tag.clone(),
                })
                .collect(),
        ),
        Type::Interface(iface) => Type::Interface(Interface {
            elems: iface
                .elems
                .iter()
                .map(|e| match e {
                    Element::Method(m) => Element::Method(Method {
                        name: m.name.clone(),
                        sig: substitute_signature(&m.sig, params, args),
                    }),
                    Element::Embedded(t) => Element::Embedded(sub(t)),
                })
                .collect(),
        }),
        Type::Union(terms) => Type::Union(terms.iter().map(sub).collect()),
        Type::Tilde(inner) => Type::Tilde(boxed(inner)),
    }
}

fn substitute_signature(sig: &Signature, params: &[String], args: &[Type]) -> Signature {
    let vars = |vars: &[Var]| {
        vars.iter()
            .map(|v| Var {
                name: v.name.clone(),
                ty: substitute(&v.ty, params, args),
            })
            .collect()
    };
    Signature {
        params: vars(&sig.params),
        results: vars(&sig.results),
        variadic: sig.variadic,
    }
}
