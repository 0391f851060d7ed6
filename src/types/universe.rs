//! Predeclared identifiers of the universe scope.

use super::{Element, Interface, Method, Named, Signature, Type, Var};

/// How a predeclared type name behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Predeclared {
    Basic,
    /// Declared types with a universe-level underlying type.
    Named,
}

static PREDECLARED: phf::Map<&'static str, Predeclared> = phf::phf_map! {
    "bool" => Predeclared::Basic,
    "byte" => Predeclared::Basic,
    "complex64" => Predeclared::Basic,
    "complex128" => Predeclared::Basic,
    "float32" => Predeclared::Basic,
    "float64" => Predeclared::Basic,
    "int" => Predeclared::Basic,
    "int8" => Predeclared::Basic,
    "int16" => Predeclared::Basic,
    "int32" => Predeclared::Basic,
    "int64" => Predeclared::Basic,
    "rune" => Predeclared::Basic,
    "string" => Predeclared::Basic,
    "uint" => Predeclared::Basic,
    "uint8" => Predeclared::Basic,
    "uint16" => Predeclared::Basic,
    "uint32" => Predeclared::Basic,
    "uint64" => Predeclared::Basic,
    "uintptr" => Predeclared::Basic,
    "error" => Predeclared::Named,
    "any" => Predeclared::Named,
    "comparable" => Predeclared::Named,
};

/// Resolve a predeclared type name.
pub fn lookup(name: &str) -> Option<Type> {
    match PREDECLARED.get(name)? {
        Predeclared::Basic => Some(Type::Basic(name.to_string())),
        Predeclared::Named => Some(Type::Named(Named {
            package: None,
            name: name.to_string(),
            args: Vec::new(),
        })),
    }
}

/// Underlying type of a predeclared named type.
pub fn underlying(name: &str) -> Option<Type> {
    match name {
        "error" => Some(Type::Interface(Interface {
            elems: vec![Element::Method(Method {
                name: "Error".to_string(),
                sig: Signature {
                    params: Vec::new(),
                    results: vec![Var {
                        name: None,
                        ty: Type::Basic("string".to_string()),
                    }],
                    variadic: false,
                },
            })],
        })),
        "any" => Some(Type::Interface(Interface::default())),
        // comparable has no method-set representation; it is a pure constraint.
        "comparable" => Some(Type::Interface(Interface {
            elems: vec![Element::Embedded(Type::Union(Vec::new()))],
        })),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_and_named_predeclared() {
        assert_eq!(lookup("int"), Some(Type::Basic("int".to_string())));
        assert!(matches!(lookup("error"), Some(Type::Named(n)) if n.package.is_none()));
        assert_eq!(lookup("Int"), None);
    }

    #[test]
    fn test_error_has_error_method() {
        let Some(Type::Interface(iface)) = underlying("error") else {
            panic!("error should be an interface");
        };
        let methods: Vec<_> = iface.methods().collect();
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].name, "Error");
    }
}
