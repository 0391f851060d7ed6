//! Owned syntax tree for the parts of a Go file the generator needs.
//!
//! Only package-level declarations are kept. Function bodies, variable
//! initialisers and methods with receivers are dropped during lowering.
//! Constant initialisers are kept so array lengths can be evaluated.

use std::fmt;

/// Source location span with byte offsets and line/column positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// Start byte offset (0-indexed).
    pub start_byte: usize,
    /// End byte offset (0-indexed, exclusive).
    pub end_byte: usize,
    /// Start line (1-indexed).
    pub start_line: usize,
    /// Start column (1-indexed).
    pub start_col: usize,
}

impl Span {
    /// Create a span from a tree-sitter node.
    pub fn from_node(node: tree_sitter::Node) -> Self {
        let start = node.start_position();
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_line: start.row + 1, // tree-sitter is 0-indexed
            start_col: start.column + 1,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// One parsed `.go` file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// The file path (for error reporting).
    pub path: String,
    /// Declared package name.
    pub package: String,
    pub imports: Vec<ImportSpec>,
    /// Package-level declarations in source order.
    pub decls: Vec<Decl>,
}

/// An import declaration: `import alias "path"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Explicit name: an identifier, `.` or `_`.
    pub name: Option<String>,
    pub path: String,
    pub span: Span,
}

impl ImportSpec {
    /// The explicit alias, if it is a usable identifier (not `.` or `_`).
    pub fn alias(&self) -> Option<&str> {
        match self.name.as_deref() {
            Some(".") | Some("_") | None => None,
            Some(name) => Some(name),
        }
    }

    pub fn is_dot(&self) -> bool {
        self.name.as_deref() == Some(".")
    }
}

/// Kind of non-type package-level declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Func,
    Var,
    Const,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Func => "func",
            ValueKind::Var => "var",
            ValueKind::Const => "const",
        }
    }
}

/// A package-level declaration.
#[derive(Debug, Clone)]
pub enum Decl {
    Type(TypeSpec),
    Value {
        name: String,
        kind: ValueKind,
        span: Span,
        /// Initialiser of a constant, after implicit repetition.
        value: Option<ConstValue>,
    },
}

/// A constant's initialiser and the value of `iota` in its spec.
#[derive(Debug, Clone)]
pub struct ConstValue {
    pub expr: ConstExpr,
    pub iota: i128,
}

/// An expression in constant position: an array length or a constant
/// initialiser.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstExpr {
    /// Source text, for diagnostics.
    pub text: String,
    pub span: Span,
    pub kind: ConstKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstKind {
    Int(i128),
    Iota,
    Name(String),
    /// `pkg.Name`
    Qualified { package: String, name: String },
    Unary { op: String, operand: Box<ConstExpr> },
    Binary {
        op: String,
        lhs: Box<ConstExpr>,
        rhs: Box<ConstExpr>,
    },
    /// Anything that cannot denote an integer constant here.
    Other,
}

impl Decl {
    pub fn name(&self) -> &str {
        match self {
            Decl::Type(spec) => &spec.name,
            Decl::Value { name, .. } => name,
        }
    }

    pub fn span(&self) -> &Span {
        match self {
            Decl::Type(spec) => &spec.span,
            Decl::Value { span, .. } => span,
        }
    }
}

/// `type Name[T any] Expr` or `type Name = Expr`.
#[derive(Debug, Clone)]
pub struct TypeSpec {
    pub name: String,
    pub type_params: Vec<TypeParamDecl>,
    pub alias: bool,
    pub ty: TypeExpr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TypeParamDecl {
    pub name: String,
    pub constraint: TypeExpr,
}

/// Direction of a channel type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

/// A type expression as written in source.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// A bare identifier: `int`, `Config`, `T`.
    Name { name: String, span: Span },
    /// `pkg.Name`
    Qualified {
        package: String,
        name: String,
        span: Span,
    },
    /// `List[int]`, `pkg.Pair[K, V]`
    Generic {
        base: Box<TypeExpr>,
        args: Vec<TypeExpr>,
    },
    Pointer(Box<TypeExpr>),
    Slice(Box<TypeExpr>),
    Array { len: ConstExpr, elem: Box<TypeExpr> },
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
    },
    Chan { dir: ChanDir, elem: Box<TypeExpr> },
    Func(FuncExpr),
    Struct(Vec<FieldExpr>),
    Interface(Vec<InterfaceElem>),
    /// `A | B` in a constraint.
    Union(Vec<TypeExpr>),
    /// `~T` in a constraint.
    Tilde(Box<TypeExpr>),
}

/// A function signature as written. For variadic signatures the last
/// parameter holds the element type `T` of `...T`.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncExpr {
    pub params: Vec<ParamExpr>,
    pub results: Vec<ParamExpr>,
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamExpr {
    pub name: Option<String>,
    pub ty: TypeExpr,
}

/// A struct field; `name` is `None` for embedded fields.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldExpr {
    pub name: Option<String>,
    pub ty: TypeExpr,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InterfaceElem {
    Method { name: String, sig: FuncExpr },
    Embed(TypeExpr),
}
