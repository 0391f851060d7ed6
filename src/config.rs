//! Configuration file for mocker.
//!
//! A config file sets defaults for every generation option; flags given on
//! the command line take precedence over it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ConfigError;
use crate::resolve::SearchRoots;

/// Config file names looked up in the current directory.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["mocker.yaml", ".mocker.yaml"];

/// Default mock type name prefix.
pub const DEFAULT_PREFIX: &str = "Mock";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Output file; stdout when unset.
    #[serde(default)]
    pub out: Option<PathBuf>,
    /// Package clause of the generated file; inferred when unset.
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
    /// Import path rendered unqualified and never imported.
    #[serde(default)]
    pub self_package: Option<String>,
    /// GOPATH entries; `$GOPATH` when empty.
    #[serde(default)]
    pub gopath: Vec<PathBuf>,
    /// `$GOROOT` when unset.
    #[serde(default)]
    pub goroot: Option<PathBuf>,
    /// "go" (default) or "json"
    #[serde(default)]
    pub format: Option<String>,
    /// Interfaces to mock when none are named on the command line.
    #[serde(default)]
    pub interfaces: Vec<String>,
}

impl Config {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Find a config file in `dir`.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        DEFAULT_CONFIG_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Layer `other` on top of this config; set values in `other` win.
    pub fn merge(mut self, other: Config) -> Self {
        self.out = other.out.or(self.out);
        self.package = other.package.or(self.package);
        self.prefix = other.prefix.or(self.prefix);
        self.suffix = other.suffix.or(self.suffix);
        self.self_package = other.self_package.or(self.self_package);
        if !other.gopath.is_empty() {
            self.gopath = other.gopath;
        }
        self.goroot = other.goroot.or(self.goroot);
        self.format = other.format.or(self.format);
        if !other.interfaces.is_empty() {
            self.interfaces = other.interfaces;
        }
        self
    }

    /// Returns the mock name prefix (defaults to "Mock").
    pub fn prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or(DEFAULT_PREFIX)
    }

    pub fn suffix(&self) -> &str {
        self.suffix.as_deref().unwrap_or("")
    }

    /// Returns the output format (defaults to Go source).
    pub fn format(&self) -> Result<OutputFormat, ConfigError> {
        match &self.format {
            Some(format) => format.parse(),
            None => Ok(OutputFormat::Go),
        }
    }

    /// Search roots with the environment filling in what is not configured.
    pub fn search_roots(&self) -> SearchRoots {
        let mut roots = SearchRoots::from_env();
        if !self.gopath.is_empty() {
            roots.gopath = self.gopath.clone();
        }
        if let Some(goroot) = &self.goroot {
            roots.goroot = Some(goroot.clone());
        }
        roots
    }
}

/// What the generator writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Go source of the mocks.
    Go,
    /// The resolved output document as JSON.
    Json,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "go" => Ok(OutputFormat::Go),
            "json" => Ok(OutputFormat::Json),
            other => Err(ConfigError::Format(other.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Go => write!(f, "go"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
