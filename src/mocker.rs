//! The generation driver.
//!
//! A [`Mocker`] owns one [`Resolver`] for the whole run and walks the
//! pipeline in order, stopping at the first failure:
//!
//! ```text
//! source dir ─▶ package ─▶ extract ─▶ SignatureBuilder ─▶ ImportTable ─▶ emit
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::analysis::{BuildContext, GoSyntax, SourceFile};
use crate::config::{Config, OutputFormat};
use crate::emit;
use crate::error::MockError;
use crate::extract::{self, InterfaceSymbol};
use crate::model::{ImportTable, OutputDocument, SignatureBuilder};
use crate::resolve::{Resolver, SearchRoots};
use crate::types::Package;

/// Everything one generation run needs.
#[derive(Debug, Clone)]
pub struct Options {
    /// Directory of the package declaring the interfaces.
    pub src: PathBuf,
    /// Package clause of the output; the source package's name when unset.
    pub package: Option<String>,
    /// Interfaces to mock; every interface of the package when empty.
    pub interfaces: Vec<String>,
    pub prefix: String,
    pub suffix: String,
    /// Import path rendered unqualified and never imported.
    pub self_package: Option<String>,
    pub roots: SearchRoots,
    pub build: BuildContext,
}

impl Options {
    /// Options for `src` with default naming and environment search roots.
    pub fn new(src: impl Into<PathBuf>) -> Self {
        Self {
            src: src.into(),
            package: None,
            interfaces: Vec::new(),
            prefix: crate::config::DEFAULT_PREFIX.to_string(),
            suffix: String::new(),
            self_package: None,
            roots: SearchRoots::from_env(),
            build: BuildContext::host(),
        }
    }

    /// Options for `src` as described by a merged config.
    pub fn from_config(src: impl Into<PathBuf>, config: &Config) -> Self {
        Self {
            src: src.into(),
            package: config.package.clone(),
            interfaces: config.interfaces.clone(),
            prefix: config.prefix().to_string(),
            suffix: config.suffix().to_string(),
            self_package: config.self_package.clone(),
            roots: config.search_roots(),
            build: BuildContext::host(),
        }
    }
}

/// One generation run.
pub struct Mocker {
    options: Options,
    resolver: Resolver,
    syntax: GoSyntax,
}

impl Mocker {
    pub fn new(options: Options) -> Self {
        let resolver = Resolver::new(&options.src, options.roots.clone(), options.build.clone());
        Self {
            options,
            resolver,
            syntax: GoSyntax::new(),
        }
    }

    /// Resolve every requested interface into the document the emitter
    /// renders.
    pub fn document(&mut self) -> Result<OutputDocument, MockError> {
        let src = self.resolver.src().to_path_buf();
        let files = self.source_files(&src)?;
        let name = infer_package(&files).ok_or_else(|| MockError::NoPackage(src.clone()))?;
        let files: Vec<SourceFile> = files.into_iter().filter(|f| f.package == name).collect();
        debug!(package = %name, files = files.len(), "inferred source package");

        let package = self.resolver.load_target(&src, files)?;
        let symbols = self.symbols(&package)?;

        let recipient = self.options.package.clone().unwrap_or_else(|| name.clone());
        let mut table = ImportTable::from_specs(&package.imports);
        let builder = SignatureBuilder::new(&recipient, &table)
            .self_package(self.options.self_package.as_deref());

        let mut interfaces = Vec::with_capacity(symbols.len());
        let mut imports = Vec::new();
        for symbol in &symbols {
            let built = builder.interface(symbol, &self.options.prefix, &self.options.suffix);
            debug!(
                interface = %symbol.name,
                mock = %built.value.mock,
                imports = built.imports.len(),
                "built mock model"
            );
            imports.extend(built.imports);
            interfaces.push(built.value);
        }
        table.merge(imports);

        Ok(OutputDocument {
            package: recipient,
            interfaces,
            imports: table.finalize(),
        })
    }

    /// Generate the mock file as Go source.
    pub fn generate(&mut self) -> Result<String, MockError> {
        let doc = self.document()?;
        Ok(emit::emit(&doc, &self.syntax)?)
    }

    /// Generate output in the requested format.
    pub fn render(&mut self, format: OutputFormat) -> Result<String, MockError> {
        match format {
            OutputFormat::Go => self.generate(),
            OutputFormat::Json => {
                let doc = self.document()?;
                let mut json = serde_json::to_string_pretty(&doc)?;
                json.push('\n');
                Ok(json)
            }
        }
    }

    fn source_files(&self, src: &Path) -> Result<Vec<SourceFile>, MockError> {
        match fs::metadata(src) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(MockError::Source {
                    path: src.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "not a directory"),
                })
            }
            Err(source) => {
                return Err(MockError::Source {
                    path: src.to_path_buf(),
                    source,
                })
            }
        }
        Ok(self.resolver.scan(src)?)
    }

    fn symbols(&self, package: &Package) -> Result<Vec<InterfaceSymbol>, MockError> {
        if self.options.interfaces.is_empty() {
            let found = extract::discover(&self.resolver, package)?;
            debug!(count = found.len(), "discovered interfaces");
            return Ok(found);
        }
        let mut symbols = Vec::with_capacity(self.options.interfaces.len());
        for name in &self.options.interfaces {
            symbols.push(extract::extract(&self.resolver, package, name)?);
        }
        Ok(symbols)
    }
}

/// Name of the first package in file order that is not a test package.
fn infer_package(files: &[SourceFile]) -> Option<String> {
    files
        .iter()
        .map(|f| f.package.as_str())
        .find(|name| !name.contains("_test"))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, package: &str) -> SourceFile {
        SourceFile {
            path: name.to_string(),
            package: package.to_string(),
            imports: Vec::new(),
            decls: Vec::new(),
        }
    }

    fn write(dir: &Path, name: &str, src: &str) {
        fs::write(dir.join(name), src).unwrap();
    }

    fn options(dir: &Path) -> Options {
        Options {
            roots: SearchRoots::default(),
            ..Options::new(dir)
        }
    }

    #[test]
    fn test_infer_package_skips_test_packages() {
        let files = vec![file("a.go", "store_test"), file("b.go", "store")];
        assert_eq!(infer_package(&files), Some("store".to_string()));
        assert_eq!(infer_package(&[file("a.go", "x_test")]), None);
    }

    #[test]
    fn test_missing_source_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut mocker = Mocker::new(options(&dir.path().join("missing")));
        assert!(matches!(mocker.document(), Err(MockError::Source { .. })));
    }

    #[test]
    fn test_empty_dir_has_no_package() {
        let dir = tempfile::tempdir().unwrap();
        let mut mocker = Mocker::new(options(dir.path()));
        assert!(matches!(mocker.document(), Err(MockError::NoPackage(_))));
    }

    #[test]
    fn test_files_of_other_packages_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.go", "package store\ntype Store interface{ Get(key string) string }\n");
        write(dir.path(), "gen.go", "package main\nfunc main() {}\n");
        let mut mocker = Mocker::new(options(dir.path()));
        let doc = mocker.document().unwrap();
        assert_eq!(doc.package, "store");
        assert_eq!(doc.interfaces.len(), 1);
        assert_eq!(doc.interfaces[0].mock, "MockStore");
    }

    #[test]
    fn test_requested_order_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "a.go",
            "package store\ntype A interface{ A() }\ntype B interface{ B() }\n",
        );
        let mut opts = options(dir.path());
        opts.interfaces = vec!["B".to_string(), "A".to_string()];
        let doc = Mocker::new(opts).document().unwrap();
        let names: Vec<_> = doc.interfaces.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn test_pkg_override_qualifies_interface() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.go", "package store\ntype Store interface{ Close() error }\n");
        let mut opts = options(dir.path());
        opts.package = Some("mocks".to_string());
        let doc = Mocker::new(opts).document().unwrap();
        assert_eq!(doc.package, "mocks");
        assert_eq!(doc.interfaces[0].qualified, "store.Store");
        assert_eq!(doc.imports.len(), 1);
    }

    #[test]
    fn test_unknown_interface_fails_the_run() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.go", "package store\ntype Store interface{ Close() error }\n");
        let mut opts = options(dir.path());
        opts.interfaces = vec!["Store".to_string(), "Missing".to_string()];
        let err = Mocker::new(opts).generate().unwrap_err();
        assert!(matches!(err, MockError::Extract(_)));
    }
}
