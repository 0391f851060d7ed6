//! Error types for every stage of mock generation.
//!
//! Each layer has its own enum; [`MockError`] wraps them with the stage that
//! produced the failure. Nothing in the pipeline retries or downgrades an
//! error to a warning.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::analysis::Span;

/// A single failed candidate directory while locating an import path.
#[derive(Debug, Clone)]
pub struct Attempt {
    /// The directory that was probed.
    pub dir: PathBuf,
    /// Why it was rejected.
    pub reason: String,
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.dir.display(), self.reason)
    }
}

fn format_attempts(attempts: &[Attempt]) -> String {
    attempts
        .iter()
        .map(|a| format!("\n\t{}", a))
        .collect::<String>()
}

/// Source text that tree-sitter could not parse cleanly.
#[derive(Error, Debug, Clone)]
#[error("{file}:{line}:{column}: {message}")]
pub struct SyntaxError {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl SyntaxError {
    pub fn at(file: &str, span: &Span, message: impl Into<String>) -> Self {
        Self {
            file: file.to_string(),
            line: span.start_line,
            column: span.start_col,
            message: message.into(),
        }
    }
}

/// Failures while locating, parsing or checking a package.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("failed to find package {path:?} in vendor, module, GOPATH, or GOROOT:{}", format_attempts(.attempts))]
    NotLocated { path: String, attempts: Vec<Attempt> },

    #[error("failed to parse {0}")]
    Parse(#[source] SyntaxError),

    #[error("failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to check package {path:?}")]
    Check {
        path: String,
        #[source]
        source: CheckError,
    },

    #[error("failed to import package {path:?}: {check}; fallback: {fallback}")]
    Fallback {
        path: String,
        check: Box<ResolveError>,
        fallback: String,
    },
}

/// Failures raised by the type checker for one package.
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("no buildable Go source files")]
    NoGoFiles,

    #[error("found packages {first} ({first_file}) and {second} ({second_file})")]
    MixedPackages {
        first: String,
        first_file: String,
        second: String,
        second_file: String,
    },

    #[error("{file}:{span}: {name} redeclared in this block")]
    Redeclared { name: String, file: String, span: Span },

    #[error("{file}:{span}: undefined: {name}")]
    Undefined { name: String, file: String, span: Span },

    #[error("{file}:{span}: {name} is not a type")]
    NotAType { name: String, file: String, span: Span },

    #[error("{file}:{span}: undefined package name: {name}")]
    UnknownPackage { name: String, file: String, span: Span },

    #[error("{file}:{span}: undefined: {package}.{name}")]
    MissingMember {
        package: String,
        name: String,
        file: String,
        span: Span,
    },

    #[error("{file}:{span}: name {name} not exported by package {package}")]
    Unexported {
        package: String,
        name: String,
        file: String,
        span: Span,
    },

    #[error("could not import {path:?}")]
    Import {
        path: String,
        #[source]
        source: Box<ResolveError>,
    },

    #[error("import cycle not allowed: {}", .chain.join(" -> "))]
    ImportCycle { chain: Vec<String> },

    #[error("invalid recursive type {name}")]
    RecursiveType { name: String },

    #[error("duplicate method {name} in interface {interface}")]
    DuplicateMethod { name: String, interface: String },

    #[error("cannot resolve methods of {name}: package {package} is only known by name")]
    Opaque { package: String, name: String },

    #[error("package {package} has no type {name}")]
    UnknownType { package: String, name: String },

    #[error("{file}:{span}: array length {expr} must be a non-negative integer constant")]
    ArrayLength { expr: String, file: String, span: Span },

    #[error("package {0} has not been loaded")]
    Unloaded(String),
}

/// Failures while extracting an interface from a checked package.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("failed to find interface: {name}")]
    NotFound { name: String },

    #[error("{name} ({kind}) is not an interface")]
    NotInterface { name: String, kind: String },

    #[error("{name} cannot be mocked: {reason}")]
    Unsupported { name: String, reason: String },

    #[error("failed to resolve interface {name}")]
    Check {
        name: String,
        #[source]
        source: CheckError,
    },
}

/// Failures while rendering the output document.
#[derive(Error, Debug)]
pub enum EmitError {
    #[error("failed to execute template: {0}")]
    Template(String),

    #[error("failed to format file: {0}")]
    Formatting(String),
}

impl From<fmt::Error> for EmitError {
    fn from(err: fmt::Error) -> Self {
        EmitError::Template(err.to_string())
    }
}

/// Failures while loading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unknown output format {0:?} (expected go or json)")]
    Format(String),
}

/// Top-level error of one generation run, tagged with the failing stage.
#[derive(Error, Debug)]
pub enum MockError {
    #[error("failed to read source directory {}", .path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no non-test package found in {}", .0.display())]
    NoPackage(PathBuf),

    #[error("failed to get pkg info")]
    Resolve(#[from] ResolveError),

    #[error("failed to mock interface")]
    Extract(#[from] ExtractError),

    #[error("failed to render mocks")]
    Emit(#[from] EmitError),

    #[error("failed to encode output document")]
    Json(#[from] serde_json::Error),
}
