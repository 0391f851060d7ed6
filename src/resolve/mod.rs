//! Import-path resolution and the per-run package cache.
//!
//! The [`Resolver`] is the [`Importer`] handed to the checker. For each
//! import path it:
//! 1. Locates a directory among the candidate roots (vendor trees, the
//!    enclosing module, `GOPATH`, `GOROOT`)
//! 2. Reads and parses every buildable non-test `.go` file there
//! 3. Type checks the file set, importing dependencies through itself
//! 4. Falls back to pre-built packages when checking fails
//!
//! Results are cached by directory for the lifetime of the resolver.

mod fallback;

pub use fallback::{is_std_path, FallbackProvider};

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::analysis::{BuildContext, GoSyntax, SourceFile};
use crate::error::{Attempt, CheckError, ResolveError};
use crate::types::{Checker, Importer, Package, PackageSource};

lazy_static! {
    static ref MODULE_LINE: Regex = Regex::new(r#"^\s*module\s+"?([^"\s]+)"?"#).unwrap();
}

/// Roots searched after vendor directories and the enclosing module.
#[derive(Debug, Clone, Default)]
pub struct SearchRoots {
    /// `GOPATH` entries, each searched as `<entry>/src/<path>`.
    pub gopath: Vec<PathBuf>,
    /// `GOROOT`, searched as `<goroot>/src/<path>`.
    pub goroot: Option<PathBuf>,
}

impl SearchRoots {
    /// Read `GOPATH` (defaulting to `$HOME/go`) and `GOROOT` from the
    /// environment.
    pub fn from_env() -> Self {
        let gopath = match std::env::var_os("GOPATH") {
            Some(value) if !value.is_empty() => std::env::split_paths(&value).collect(),
            _ => std::env::var_os("HOME")
                .map(|home| vec![PathBuf::from(home).join("go")])
                .unwrap_or_default(),
        };
        let goroot = std::env::var_os("GOROOT")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self { gopath, goroot }
    }
}

/// The Go module enclosing the source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    /// Directory holding `go.mod`.
    pub root: PathBuf,
    /// Declared module path.
    pub path: String,
}

impl Module {
    /// Find the nearest `go.mod` at or above `dir`.
    pub fn find(dir: &Path) -> Option<Self> {
        dir.ancestors().find_map(|candidate| {
            let content = fs::read_to_string(candidate.join("go.mod")).ok()?;
            let path = content
                .lines()
                .find_map(|line| MODULE_LINE.captures(line))
                .map(|caps| caps[1].to_string())?;
            Some(Self {
                root: candidate.to_path_buf(),
                path,
            })
        })
    }

    /// Directory of `import_path` if it lies inside this module.
    fn dir_of(&self, import_path: &str) -> Option<PathBuf> {
        if import_path == self.path {
            return Some(self.root.clone());
        }
        let rest = import_path.strip_prefix(&self.path)?.strip_prefix('/')?;
        Some(self.root.join(rest))
    }
}

/// How an import path was satisfied.
#[derive(Debug)]
pub enum Resolved {
    /// Parsed and checked from source.
    Fresh(Rc<Package>),
    /// Source checking failed or no source exists; a pre-built package was
    /// used instead.
    Fallback {
        package: Rc<Package>,
        cause: Box<ResolveError>,
    },
}

impl Resolved {
    pub fn package(&self) -> &Rc<Package> {
        match self {
            Resolved::Fresh(package) | Resolved::Fallback { package, .. } => package,
        }
    }

    pub fn into_package(self) -> Rc<Package> {
        match self {
            Resolved::Fresh(package) | Resolved::Fallback { package, .. } => package,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    Dir(PathBuf),
    Fallback(String),
}

/// Loads, checks and caches packages for one generation run.
pub struct Resolver {
    /// Absolute source directory of the target package.
    src: PathBuf,
    module: Option<Module>,
    roots: SearchRoots,
    /// Vendor directories in search order.
    vendor_dirs: Vec<PathBuf>,
    build: BuildContext,
    syntax: GoSyntax,
    cache: HashMap<CacheKey, Rc<Package>>,
    /// Every loaded package by its import path.
    by_path: HashMap<String, Rc<Package>>,
    /// Directories currently being checked, with their import paths.
    in_progress: Vec<(PathBuf, String)>,
    fallback: FallbackProvider,
}

impl Resolver {
    pub fn new(src: &Path, roots: SearchRoots, build: BuildContext) -> Self {
        let src = absolute(src);
        let module = Module::find(&src);
        let vendor_dirs = vendor_dirs(&src, module.as_ref(), &roots);
        debug!(
            src = %src.display(),
            module = module.as_ref().map(|m| m.path.as_str()).unwrap_or(""),
            "created resolver"
        );
        Self {
            src,
            module,
            roots,
            vendor_dirs,
            build,
            syntax: GoSyntax::new(),
            cache: HashMap::new(),
            by_path: HashMap::new(),
            in_progress: Vec::new(),
            fallback: FallbackProvider::new(),
        }
    }

    pub fn src(&self) -> &Path {
        &self.src
    }

    pub fn module(&self) -> Option<&Module> {
        self.module.as_ref()
    }

    /// Parse every buildable non-test `.go` file directly inside `dir`, in
    /// file-name order.
    pub fn scan(&self, dir: &Path) -> Result<Vec<SourceFile>, ResolveError> {
        let mut files = Vec::new();

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| ResolveError::Io {
                path: dir.to_path_buf(),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if !name.ends_with(".go") || name.ends_with("_test.go") {
                continue;
            }

            let source = fs::read(entry.path()).map_err(|source| ResolveError::Io {
                path: entry.path().to_path_buf(),
                source,
            })?;
            if !self.build.includes(&name, &String::from_utf8_lossy(&source)) {
                debug!(file = %entry.path().display(), "excluded by build constraints");
                continue;
            }

            let file = self
                .syntax
                .parse_file(entry.path(), &source)
                .map_err(ResolveError::Parse)?;
            files.push(file);
        }

        Ok(files)
    }

    /// Check already-parsed files of the target package.
    pub fn load_target(
        &mut self,
        dir: &Path,
        files: Vec<SourceFile>,
    ) -> Result<Rc<Package>, ResolveError> {
        let dir = absolute(dir);
        if let Some(package) = self.cache.get(&CacheKey::Dir(dir.clone())) {
            return Ok(package.clone());
        }
        let path = self.import_path_of(&dir);
        self.check_files(&path, dir, files)
    }

    /// Import path of a directory: module-relative, `GOPATH`-relative, or
    /// the directory itself.
    pub fn import_path_of(&self, dir: &Path) -> String {
        if let Some(module) = &self.module {
            if let Ok(rel) = dir.strip_prefix(&module.root) {
                return join_import(&module.path, rel);
            }
        }
        for entry in &self.roots.gopath {
            if let Ok(rel) = dir.strip_prefix(entry.join("src")) {
                if rel.as_os_str().is_empty() {
                    continue;
                }
                return join_import("", rel);
            }
        }
        dir.to_string_lossy().to_string()
    }

    /// Resolve an import path to a checked package.
    pub fn resolve(&mut self, path: &str) -> Result<Resolved, ResolveError> {
        if path == "C" || path == "unsafe" {
            return Ok(Resolved::Fresh(self.builtin(path)));
        }

        let (path, located) = if path.is_empty() || path.starts_with('.') {
            let dir = clean(&self.src.join(path));
            (dir.to_string_lossy().to_string(), self.locate_dir(&dir))
        } else if Path::new(path).is_absolute() {
            (path.to_string(), self.locate_dir(Path::new(path)))
        } else {
            (path.to_string(), self.locate(path))
        };

        let dir = match located {
            Ok(dir) => dir,
            Err(attempts) => {
                let err = ResolveError::NotLocated {
                    path: path.clone(),
                    attempts,
                };
                if is_std_path(&path) {
                    return self.fall_back(&path, err);
                }
                return Err(err);
            }
        };

        if let Some(package) = self.cache.get(&CacheKey::Dir(dir.clone())) {
            debug!(path = %path, "package cache hit");
            return Ok(Resolved::Fresh(package.clone()));
        }
        if let Some(pos) = self.in_progress.iter().position(|(d, _)| *d == dir) {
            let mut chain: Vec<String> = self.in_progress[pos..]
                .iter()
                .map(|(_, p)| p.clone())
                .collect();
            chain.push(path.clone());
            return Err(ResolveError::Check {
                path,
                source: CheckError::ImportCycle { chain },
            });
        }

        let files = self.scan(&dir)?;
        match self.check_files(&path, dir, files) {
            Ok(package) => Ok(Resolved::Fresh(package)),
            Err(err @ ResolveError::Check { .. }) => self.fall_back(&path, err),
            Err(err) => Err(err),
        }
    }

    fn check_files(
        &mut self,
        path: &str,
        dir: PathBuf,
        files: Vec<SourceFile>,
    ) -> Result<Rc<Package>, ResolveError> {
        self.in_progress.push((dir.clone(), path.to_string()));
        let checked = Checker::new(self, path, Some(dir.clone()), files).check();
        self.in_progress.pop();

        let package = Rc::new(checked.map_err(|source| ResolveError::Check {
            path: path.to_string(),
            source,
        })?);
        debug!(path = %path, dir = %dir.display(), "loaded package from source");
        self.cache.insert(CacheKey::Dir(dir), package.clone());
        self.by_path.insert(path.to_string(), package.clone());
        Ok(package)
    }

    fn fall_back(&mut self, path: &str, cause: ResolveError) -> Result<Resolved, ResolveError> {
        let key = CacheKey::Fallback(path.to_string());
        let package = match self.cache.get(&key) {
            Some(package) => package.clone(),
            None => {
                let package = match self.fallback.source(path) {
                    Some((file, source)) => self.check_fallback(path, file, source),
                    None if is_std_path(path) => Ok(Package::opaque(path, fallback::last_elem(path))),
                    None => Err("no pre-built package available".to_string()),
                };
                let package = match package {
                    Ok(package) => Rc::new(package),
                    Err(fallback) => {
                        return Err(ResolveError::Fallback {
                            path: path.to_string(),
                            check: Box::new(cause),
                            fallback,
                        })
                    }
                };
                self.cache.insert(key, package.clone());
                self.by_path.insert(path.to_string(), package.clone());
                package
            }
        };

        warn!(path = %path, cause = %cause, "using pre-built package");
        Ok(Resolved::Fallback {
            package,
            cause: Box::new(cause),
        })
    }

    fn check_fallback(&mut self, path: &str, file: &str, source: &str) -> Result<Package, String> {
        let file = self
            .syntax
            .parse_file(Path::new(file), source.as_bytes())
            .map_err(|e| e.to_string())?;
        Checker::new(self, path, None, vec![file])
            .check()
            .map_err(|e| e.to_string())
    }

    /// Packages with no Go source of their own.
    fn builtin(&mut self, path: &str) -> Rc<Package> {
        let key = CacheKey::Fallback(path.to_string());
        if let Some(package) = self.cache.get(&key) {
            return package.clone();
        }
        let package = Rc::new(Package::opaque(path, path));
        self.cache.insert(key, package.clone());
        self.by_path.insert(path.to_string(), package.clone());
        package
    }

    /// Candidate directories for an import path, in priority order.
    fn candidates(&self, path: &str) -> Vec<PathBuf> {
        let mut candidates: Vec<PathBuf> = self.vendor_dirs.iter().map(|v| v.join(path)).collect();
        if let Some(dir) = self.module.as_ref().and_then(|m| m.dir_of(path)) {
            candidates.push(dir);
        }
        candidates.extend(self.roots.gopath.iter().map(|g| g.join("src").join(path)));
        if let Some(goroot) = &self.roots.goroot {
            candidates.push(goroot.join("src").join(path));
        }
        candidates
    }

    fn locate(&self, path: &str) -> Result<PathBuf, Vec<Attempt>> {
        let mut attempts = Vec::new();
        for candidate in self.candidates(path) {
            match self.locate_dir(&candidate) {
                Ok(dir) => return Ok(dir),
                Err(mut failed) => attempts.append(&mut failed),
            }
        }
        Err(attempts)
    }

    fn locate_dir(&self, dir: &Path) -> Result<PathBuf, Vec<Attempt>> {
        let dir = absolute(dir);
        match fs::metadata(&dir) {
            Ok(meta) if meta.is_dir() => Ok(dir),
            Ok(_) => Err(vec![Attempt {
                dir,
                reason: "not a directory".to_string(),
            }]),
            Err(e) => Err(vec![Attempt {
                dir,
                reason: e.to_string(),
            }]),
        }
    }
}

impl PackageSource for Resolver {
    fn package(&self, path: &str) -> Option<Rc<Package>> {
        self.by_path.get(path).cloned()
    }
}

impl Importer for Resolver {
    fn import(&mut self, path: &str) -> Result<Rc<Package>, ResolveError> {
        self.resolve(path).map(Resolved::into_package)
    }
}

/// Vendor directories from `src` upwards, stopping at the module root or
/// the `GOPATH` `src` directory that contains it.
fn vendor_dirs(src: &Path, module: Option<&Module>, roots: &SearchRoots) -> Vec<PathBuf> {
    let stop = module.map(|m| m.root.clone()).or_else(|| {
        roots
            .gopath
            .iter()
            .map(|g| g.join("src"))
            .find(|s| src.starts_with(s))
    });

    let Some(stop) = stop else {
        return vec![src.join("vendor")];
    };
    let mut dirs = Vec::new();
    for dir in src.ancestors() {
        if !dir.starts_with(&stop) || (dir == stop && module.is_none()) {
            break;
        }
        dirs.push(dir.join("vendor"));
    }
    if dirs.is_empty() {
        dirs.push(src.join("vendor"));
    }
    dirs
}

fn join_import(prefix: &str, rel: &Path) -> String {
    let rel: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    match (prefix.is_empty(), rel.is_empty()) {
        (true, _) => rel.join("/"),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{}/{}", prefix, rel.join("/")),
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return clean(path);
    }
    match std::env::current_dir() {
        Ok(cwd) => clean(&cwd.join(path)),
        Err(_) => clean(path),
    }
}

/// Lexically normalise a path, resolving `.` and `..`.
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn resolver(src: &Path, gopath: &Path) -> Resolver {
        let roots = SearchRoots {
            gopath: vec![gopath.to_path_buf()],
            goroot: None,
        };
        Resolver::new(src, roots, BuildContext::new("linux", "amd64"))
    }

    #[test]
    fn test_vendor_wins_over_gopath() {
        let tmp = TempDir::new().unwrap();
        let gopath = tmp.path().join("gopath");
        let src = gopath.join("src/example.com/app");
        write(&src, "app.go", "package app\n");
        write(&src, "vendor/example.com/dep/dep.go", "package dep\ntype FromVendor int\n");
        write(&gopath, "src/example.com/dep/dep.go", "package dep\ntype FromGopath int\n");

        let mut resolver = resolver(&src, &gopath);
        let package = resolver.import("example.com/dep").unwrap();
        assert!(package.lookup("FromVendor").is_some());
        assert!(package.lookup("FromGopath").is_none());
    }

    #[test]
    fn test_module_path_resolves_inside_module() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("proj");
        write(&root, "go.mod", "module example.com/proj\n\ngo 1.21\n");
        write(&root, "api/api.go", "package api\ntype Request struct{}\n");
        write(&root, "svc/svc.go", "package svc\n");

        let mut resolver = resolver(&root.join("svc"), &tmp.path().join("empty"));
        assert_eq!(resolver.module().unwrap().path, "example.com/proj");
        let package = resolver.import("example.com/proj/api").unwrap();
        assert_eq!(package.name, "api");
        assert_eq!(
            resolver.import_path_of(&root.join("svc")),
            "example.com/proj/svc"
        );
    }

    #[test]
    fn test_missing_package_lists_attempts() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(&src).unwrap();

        let mut resolver = resolver(&src, &tmp.path().join("gopath"));
        let err = resolver.import("example.com/missing").unwrap_err();
        let ResolveError::NotLocated { attempts, .. } = &err else {
            panic!("unexpected error: {}", err);
        };
        assert_eq!(attempts.len(), 2);
        assert!(err.to_string().contains("vendor"));
    }

    #[test]
    fn test_cache_shares_packages() {
        let tmp = TempDir::new().unwrap();
        let gopath = tmp.path().join("gopath");
        write(&gopath, "src/example.com/dep/dep.go", "package dep\ntype T int\n");
        let src = tmp.path().join("src");
        fs::create_dir_all(&src).unwrap();

        let mut resolver = resolver(&src, &gopath);
        let first = resolver.import("example.com/dep").unwrap();
        let second = resolver.import("example.com/dep").unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_parse_error_names_file() {
        let tmp = TempDir::new().unwrap();
        let gopath = tmp.path().join("gopath");
        write(&gopath, "src/example.com/bad/bad.go", "package bad\ntype T struct {\n");
        let src = tmp.path().join("src");
        fs::create_dir_all(&src).unwrap();

        let mut resolver = resolver(&src, &gopath);
        let err = resolver.import("example.com/bad").unwrap_err();
        let ResolveError::Parse(syntax) = err else {
            panic!("expected parse error");
        };
        assert!(syntax.file.ends_with("bad.go"));
    }

    #[test]
    fn test_import_cycle_is_reported() {
        let tmp = TempDir::new().unwrap();
        let gopath = tmp.path().join("gopath");
        write(
            &gopath,
            "src/example.com/a/a.go",
            "package a\nimport \"example.com/b\"\ntype A b.B\n",
        );
        write(
            &gopath,
            "src/example.com/b/b.go",
            "package b\nimport \"example.com/a\"\ntype B a.A\n",
        );
        let src = tmp.path().join("src");
        fs::create_dir_all(&src).unwrap();

        let mut resolver = resolver(&src, &gopath);
        let err = resolver.import("example.com/a").unwrap_err();
        assert!(format!("{:?}", err).contains("ImportCycle"));
    }

    #[test]
    fn test_std_fallback_without_goroot() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(&src).unwrap();

        let mut resolver = resolver(&src, &tmp.path().join("gopath"));
        let resolved = resolver.resolve("io").unwrap();
        assert!(matches!(resolved, Resolved::Fallback { .. }));
        assert!(resolved.package().lookup("Reader").is_some());

        let opaque = resolver.resolve("image/color").unwrap();
        assert!(opaque.package().is_opaque());
        assert_eq!(opaque.package().name, "color");
    }

    #[test]
    fn test_stub_constants_are_evaluated() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(&src).unwrap();

        let mut resolver = resolver(&src, &tmp.path().join("gopath"));
        let sha256 = resolver.import("crypto/sha256").unwrap();
        assert_eq!(sha256.constant("Size"), Some(32));
        let log = resolver.import("log").unwrap();
        assert_eq!(log.constant("LstdFlags"), Some(3));
        let time = resolver.import("time").unwrap();
        assert_eq!(time.constant("Hour"), Some(3_600_000_000_000));
        assert_eq!(time.constant("RFC3339"), None);
    }

    #[test]
    fn test_test_files_and_constrained_files_skipped() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("pkg");
        write(&dir, "a.go", "package p\ntype A int\n");
        write(&dir, "a_test.go", "package p_test\n");
        write(&dir, "a_windows.go", "package p\ntype W int\n");
        write(&dir, "gen.go", "//go:build ignore\n\npackage main\n");

        let resolver = resolver(&dir, &tmp.path().join("gopath"));
        let files = resolver.scan(&dir).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("a.go"));
    }

    #[test]
    fn test_clean() {
        assert_eq!(clean(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
    }
}
