//! Go source analysis built on tree-sitter.
//!
//! This module turns `.go` files into an owned syntax model:
//! - `syntax`: parsing and lowering of package clause, imports and
//!   package-level declarations
//! - `ast`: the lowered declarations and type expressions
//! - `constraints`: build-constraint evaluation deciding which files belong
//!   to a build
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────┐     ┌───────────────┐
//! │ .go files       │────▶│ GoSyntax     │────▶│ SourceFile    │
//! └─────────────────┘     │ (tree-sitter)│     │ (imports,     │
//!         │               └──────────────┘     │  type decls)  │
//!         ▼                                    └───────────────┘
//! ┌─────────────────┐                                  │
//! │ BuildContext    │                                  ▼
//! │ (file filter)   │                          types::Checker
//! └─────────────────┘
//! ```

mod ast;
mod constraints;
mod parsed;
mod syntax;

pub use ast::{
    ChanDir, ConstExpr, ConstKind, ConstValue, Decl, FieldExpr, FuncExpr, ImportSpec,
    InterfaceElem, ParamExpr, SourceFile, Span, TypeExpr, TypeParamDecl, TypeSpec, ValueKind,
};
pub use constraints::BuildContext;
pub use parsed::ParsedFile;
pub use syntax::GoSyntax;
