//! Resolved Go type model.
//!
//! Types produced by the [`Checker`] refer to declared types by name
//! ([`Named`]) instead of embedding them, so the model stays finite for
//! recursive declarations. Underlying types are looked up on demand through
//! a [`PackageSource`].
//!
//! [`type_string`] renders a type the way Go's `types.TypeString` does,
//! calling a qualifier for every package a named type belongs to.

mod checker;
mod env;
mod package;
mod universe;

pub use checker::Checker;
pub use env::{substitute, underlying, Importer, PackageSource};
pub use package::{Object, ObjectKind, Package};

use std::fmt::Write;

use serde::Serialize;

pub use crate::analysis::ChanDir;

/// Identity of a package as seen from a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PackageRef {
    /// Import path (or directory for packages without one).
    pub path: String,
    /// Declared package name.
    pub name: String,
}

/// A reference to a declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Named {
    /// `None` for predeclared types such as `error`.
    pub package: Option<PackageRef>,
    pub name: String,
    /// Type arguments of an instantiated generic type.
    pub args: Vec<Type>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Basic(String),
    Named(Named),
    TypeParam(String),
    Pointer(Box<Type>),
    Slice(Box<Type>),
    Array { len: String, elem: Box<Type> },
    Map { key: Box<Type>, value: Box<Type> },
    Chan { dir: ChanDir, elem: Box<Type> },
    Signature(Signature),
    Struct(Vec<Field>),
    Interface(Interface),
    Union(Vec<Type>),
    Tilde(Box<Type>),
}

/// A parameter or result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Var {
    pub name: Option<String>,
    pub ty: Type,
}

/// A function signature. When `variadic` is set the last parameter's type
/// is the slice `[]T` standing for `...T`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub params: Vec<Var>,
    pub results: Vec<Var>,
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// `None` for embedded fields.
    pub name: Option<String>,
    pub ty: Type,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    pub name: String,
    pub sig: Signature,
}

/// An element of an interface body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    Method(Method),
    /// An embedded interface, or a type-set term in a constraint.
    Embedded(Type),
}

/// An interface before completion, elements in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Interface {
    pub elems: Vec<Element>,
}

impl Interface {
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.elems.iter().filter_map(|e| match e {
            Element::Method(m) => Some(m),
            Element::Embedded(_) => None,
        })
    }

    pub fn embeddeds(&self) -> impl Iterator<Item = &Type> {
        self.elems.iter().filter_map(|e| match e {
            Element::Embedded(t) => Some(t),
            Element::Method(_) => None,
        })
    }
}

impl Type {
    /// Short description of the type's shape, used in diagnostics.
    pub fn kind(&self) -> String {
        match self {
            Type::Basic(name) => name.clone(),
            Type::Named(named) => named.name.clone(),
            Type::TypeParam(_) => "type parameter".to_string(),
            Type::Pointer(_) => "pointer".to_string(),
            Type::Slice(_) => "slice".to_string(),
            Type::Array { .. } => "array".to_string(),
            Type::Map { .. } => "map".to_string(),
            Type::Chan { .. } => "chan".to_string(),
            Type::Signature(_) => "func".to_string(),
            Type::Struct(_) => "struct".to_string(),
            Type::Interface(_) => "interface".to_string(),
            Type::Union(_) | Type::Tilde(_) => "constraint".to_string(),
        }
    }
}

/// Type identity as Go defines it: parameter and result names of function
/// types never count, struct field names and tags do.
pub fn identical(a: &Type, b: &Type) -> bool {
    match (a, b) {
        (Type::Basic(x), Type::Basic(y)) | (Type::TypeParam(x), Type::TypeParam(y)) => x == y,
        (Type::Named(x), Type::Named(y)) => {
            x.package.as_ref().map(|p| &p.path) == y.package.as_ref().map(|p| &p.path)
                && x.name == y.name
                && all_identical(&x.args, &y.args)
        }
        (Type::Pointer(x), Type::Pointer(y))
        | (Type::Slice(x), Type::Slice(y))
        | (Type::Tilde(x), Type::Tilde(y)) => identical(x, y),
        (Type::Array { len: n, elem: x }, Type::Array { len: m, elem: y }) => {
            n == m && identical(x, y)
        }
        (Type::Map { key: k1, value: v1 }, Type::Map { key: k2, value: v2 }) => {
            identical(k1, k2) && identical(v1, v2)
        }
        (Type::Chan { dir: d1, elem: x }, Type::Chan { dir: d2, elem: y }) => {
            d1 == d2 && identical(x, y)
        }
        (Type::Signature(x), Type::Signature(y)) => identical_signatures(x, y),
        (Type::Struct(x), Type::Struct(y)) => {
            x.len() == y.len()
                && x.iter().zip(y).all(|(f, g)| {
                    f.name == g.name && f.tag == g.tag && identical(&f.ty, &g.ty)
                })
        }
        (Type::Interface(x), Type::Interface(y)) => {
            x.elems.len() == y.elems.len()
                && x.elems.iter().zip(&y.elems).all(|pair| match pair {
                    (Element::Method(m), Element::Method(n)) => {
                        m.name == n.name && identical_signatures(&m.sig, &n.sig)
                    }
                    (Element::Embedded(s), Element::Embedded(t)) => identical(s, t),
                    _ => false,
                })
        }
        (Type::Union(x), Type::Union(y)) => all_identical(x, y),
        _ => false,
    }
}

/// Signature identity; see [`identical`].
pub fn identical_signatures(a: &Signature, b: &Signature) -> bool {
    fn same(x: &[Var], y: &[Var]) -> bool {
        x.len() == y.len() && x.iter().zip(y).all(|(v, w)| identical(&v.ty, &w.ty))
    }
    a.variadic == b.variadic && same(&a.params, &b.params) && same(&a.results, &b.results)
}

fn all_identical(a: &[Type], b: &[Type]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| identical(x, y))
}

/// Decides how a package is written in a type string: an empty string
/// leaves the type unqualified.
pub type Qualifier<'q> = dyn FnMut(&PackageRef) -> String + 'q;

/// Render `ty` as Go source text.
pub fn type_string(ty: &Type, qualifier: &mut Qualifier<'_>) -> String {
    let mut out = String::new();
    write_type(&mut out, ty, qualifier);
    out
}

/// Render a signature without the leading `func` keyword.
pub fn signature_string(sig: &Signature, qualifier: &mut Qualifier<'_>) -> String {
    let mut out = String::new();
    write_signature(&mut out, sig, qualifier);
    out
}

fn write_type(out: &mut String, ty: &Type, q: &mut Qualifier<'_>) {
    match ty {
        Type::Basic(name) | Type::TypeParam(name) => out.push_str(name),
        Type::Named(named) => {
            if let Some(package) = &named.package {
                let prefix = q(package);
                if !prefix.is_empty() {
                    out.push_str(&prefix);
                    out.push('.');
                }
            }
            out.push_str(&named.name);
            if !named.args.is_empty() {
                out.push('[');
                write_list(out, &named.args, ", ", q);
                out.push(']');
            }
        }
        Type::Pointer(elem) => {
            out.push('*');
            write_type(out, elem, q);
        }
        Type::Slice(elem) => {
            out.push_str("[]");
            write_type(out, elem, q);
        }
        Type::Array { len, elem } => {
            let _ = write!(out, "[{}]", len);
            write_type(out, elem, q);
        }
        Type::Map { key, value } => {
            out.push_str("map[");
            write_type(out, key, q);
            out.push(']');
            write_type(out, value, q);
        }
        Type::Chan { dir, elem } => {
            let (prefix, parens) = match dir {
                ChanDir::Both => (
                    "chan ",
                    matches!(**elem, Type::Chan { dir: ChanDir::Recv, .. }),
                ),
                ChanDir::Send => ("chan<- ", false),
                ChanDir::Recv => ("<-chan ", false),
            };
            out.push_str(prefix);
            if parens {
                out.push('(');
            }
            write_type(out, elem, q);
            if parens {
                out.push(')');
            }
        }
        Type::Signature(sig) => {
            out.push_str("func");
            write_signature(out, sig, q);
        }
        Type::Struct(fields) => {
            out.push_str("struct{");
            for (i, field) in fields.iter().enumerate() {
                out.push_str(if i > 0 { "; " } else { " " });
                if let Some(name) = &field.name {
                    out.push_str(name);
                    out.push(' ');
                }
                write_type(out, &field.ty, q);
                if let Some(tag) = &field.tag {
                    out.push(' ');
                    out.push_str(tag);
                }
            }
            close_braces(out, fields.is_empty());
        }
        Type::Interface(iface) => {
            out.push_str("interface{");
            for (i, elem) in iface.elems.iter().enumerate() {
                out.push_str(if i > 0 { "; " } else { " " });
                match elem {
                    Element::Method(method) => {
                        out.push_str(&method.name);
                        write_signature(out, &method.sig, q);
                    }
                    Element::Embedded(ty) => write_type(out, ty, q),
                }
            }
            close_braces(out, iface.elems.is_empty());
        }
        Type::Union(terms) => write_list(out, terms, " | ", q),
        Type::Tilde(inner) => {
            out.push('~');
            write_type(out, inner, q);
        }
    }
}

/// One-line struct and interface bodies are padded the way gofmt prints them.
fn close_braces(out: &mut String, empty: bool) {
    out.push_str(if empty { "}" } else { " }" });
}

fn write_list(out: &mut String, types: &[Type], sep: &str, q: &mut Qualifier<'_>) {
    for (i, ty) in types.iter().enumerate() {
        if i > 0 {
            out.push_str(sep);
        }
        write_type(out, ty, q);
    }
}

fn write_tuple(out: &mut String, vars: &[Var], variadic: bool, q: &mut Qualifier<'_>) {
    out.push('(');
    for (i, var) in vars.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        if let Some(name) = &var.name {
            out.push_str(name);
            out.push(' ');
        }
        match (&var.ty, variadic && i + 1 == vars.len()) {
            (Type::Slice(elem), true) => {
                out.push_str("...");
                write_type(out, elem, q);
            }
            (ty, _) => write_type(out, ty, q),
        }
    }
    out.push(')');
}

fn write_signature(out: &mut String, sig: &Signature, q: &mut Qualifier<'_>) {
    write_tuple(out, &sig.params, sig.variadic, q);
    match sig.results.as_slice() {
        [] => {}
        [only] if only.name.is_none() => {
            out.push(' ');
            write_type(out, &only.ty, q);
        }
        results => {
            out.push(' ');
            write_tuple(out, results, false, q);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(name: &str) -> Type {
        Type::Basic(name.to_string())
    }

    fn named(path: &str, pkg: &str, name: &str) -> Type {
        Type::Named(Named {
            package: Some(PackageRef {
                path: path.to_string(),
                name: pkg.to_string(),
            }),
            name: name.to_string(),
            args: Vec::new(),
        })
    }

    fn by_name(p: &PackageRef) -> String {
        p.name.clone()
    }

    #[test]
    fn test_composite_types() {
        let ty = Type::Map {
            key: Box::new(basic("string")),
            value: Box::new(Type::Slice(Box::new(Type::Pointer(Box::new(named(
                "example.com/a",
                "a",
                "Int",
            )))))),
        };
        assert_eq!(type_string(&ty, &mut by_name), "map[string][]*a.Int");
    }

    #[test]
    fn test_qualifier_can_elide_package() {
        let ty = named("example.com/a", "a", "Int");
        assert_eq!(type_string(&ty, &mut |_| String::new()), "Int");
    }

    #[test]
    fn test_channel_directions() {
        let recv = Type::Chan {
            dir: ChanDir::Recv,
            elem: Box::new(basic("int")),
        };
        assert_eq!(type_string(&recv, &mut by_name), "<-chan int");

        let nested = Type::Chan {
            dir: ChanDir::Both,
            elem: Box::new(recv),
        };
        assert_eq!(type_string(&nested, &mut by_name), "chan (<-chan int)");

        let send = Type::Chan {
            dir: ChanDir::Send,
            elem: Box::new(basic("error")),
        };
        assert_eq!(type_string(&send, &mut by_name), "chan<- error");
    }

    #[test]
    fn test_func_type_with_variadic_and_results() {
        let sig = Signature {
            params: vec![
                Var {
                    name: None,
                    ty: basic("int"),
                },
                Var {
                    name: None,
                    ty: Type::Slice(Box::new(basic("string"))),
                },
            ],
            results: vec![
                Var {
                    name: None,
                    ty: basic("bool"),
                },
                Var {
                    name: None,
                    ty: basic("error"),
                },
            ],
            variadic: true,
        };
        assert_eq!(
            type_string(&Type::Signature(sig), &mut by_name),
            "func(int, ...string) (bool, error)"
        );
    }

    #[test]
    fn test_generic_instantiation() {
        let ty = Type::Named(Named {
            package: Some(PackageRef {
                path: "example.com/list".to_string(),
                name: "list".to_string(),
            }),
            name: "List".to_string(),
            args: vec![basic("int"), named("example.com/a", "a", "Int")],
        });
        assert_eq!(type_string(&ty, &mut by_name), "list.List[int, a.Int]");
    }

    #[test]
    fn test_struct_and_interface_literals() {
        let ty = Type::Struct(vec![
            Field {
                name: Some("Name".to_string()),
                ty: basic("string"),
                tag: None,
            },
            Field {
                name: None,
                ty: named("example.com/a", "a", "Base"),
                tag: None,
            },
        ]);
        assert_eq!(type_string(&ty, &mut by_name), "struct{ Name string; a.Base }");

        let iface = Type::Interface(Interface {
            elems: vec![Element::Method(Method {
                name: "Close".to_string(),
                sig: Signature {
                    params: Vec::new(),
                    results: vec![Var {
                        name: None,
                        ty: basic("error"),
                    }],
                    variadic: false,
                },
            })],
        });
        assert_eq!(type_string(&iface, &mut by_name), "interface{ Close() error }");
    }

    #[test]
    fn test_identity_ignores_parameter_names_only() {
        let func = |param: &str, result: Option<&str>| {
            Type::Signature(Signature {
                params: vec![Var {
                    name: Some(param.to_string()),
                    ty: basic("int"),
                }],
                results: vec![Var {
                    name: result.map(str::to_string),
                    ty: basic("error"),
                }],
                variadic: false,
            })
        };
        let nested = |inner: Type| Type::Slice(Box::new(inner));
        assert!(identical(&nested(func("x", None)), &nested(func("y", Some("err")))));

        let field = |name: &str, tag: Option<&str>| {
            Type::Struct(vec![Field {
                name: Some(name.to_string()),
                ty: func("x", None),
                tag: tag.map(str::to_string),
            }])
        };
        assert!(identical(&field("A", None), &field("A", None)));
        assert!(!identical(&field("A", None), &field("B", None)));
        assert!(!identical(&field("A", None), &field("A", Some("`json:\"a\"`"))));

        assert!(!identical(
            &named("example.com/a", "x", "T"),
            &named("example.com/b", "x", "T")
        ));
    }

    #[test]
    fn test_empty_literals_are_unpadded() {
        assert_eq!(type_string(&Type::Struct(Vec::new()), &mut by_name), "struct{}");
        assert_eq!(
            type_string(&Type::Interface(Interface::default()), &mut by_name),
            "interface{}"
        );
    }
}
