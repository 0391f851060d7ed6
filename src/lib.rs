//! Mocker - recording mock generator for Go interfaces.
//!
//! Given a Go package directory, mocker finds the requested interfaces,
//! resolves their complete method sets across imported packages, and emits
//! Go source for mock types that record every call and delegate to
//! per-method function fields.
//!
//! # Architecture
//!
//! The pipeline runs leaf-first:
//!
//! - `analysis`: tree-sitter Go parsing into an owned syntax model, plus
//!   build constraints
//! - `types`: the type model and the checker that builds package scopes
//! - `resolve`: import-path lookup, package cache and pre-built fallbacks
//! - `extract`: interface lookup and method-set completion
//! - `model`: renderable signatures, qualifiers and the import table
//! - `emit`: Go source rendering and validation
//! - `mocker`: the driver tying the stages together
//! - `config` / `cli`: YAML configuration and the command-line front end

pub mod analysis;
pub mod cli;
pub mod config;
pub mod emit;
pub mod error;
pub mod extract;
pub mod mocker;
pub mod model;
pub mod resolve;
pub mod types;

pub use config::{Config, OutputFormat};
pub use error::{CheckError, EmitError, ExtractError, MockError, ResolveError};
pub use extract::{discover, extract, InterfaceSymbol};
pub use mocker::{Mocker, Options};
pub use model::{ImportTable, OutputDocument, SignatureBuilder};
pub use resolve::{Resolver, SearchRoots};
