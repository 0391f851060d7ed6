//! Pre-built packages used when source checking fails.
//!
//! Declarations for commonly referenced standard-library packages are
//! bundled as Go stub files and checked like any other package. Other
//! standard-library paths resolve to opaque packages that answer every
//! exported name, which is enough to qualify types in signatures.

/// Bundled stub sources by import path: (file name, source).
static STUBS: phf::Map<&'static str, (&'static str, &'static str)> = phf::phf_map! {
    "bufio" => ("bufio.go", include_str!("stubs/bufio.go")),
    "bytes" => ("bytes.go", include_str!("stubs/bytes.go")),
    "context" => ("context.go", include_str!("stubs/context.go")),
    "crypto/sha256" => ("sha256.go", include_str!("stubs/sha256.go")),
    "database/sql" => ("sql.go", include_str!("stubs/sql.go")),
    "encoding/json" => ("json.go", include_str!("stubs/json.go")),
    "errors" => ("errors.go", include_str!("stubs/errors.go")),
    "fmt" => ("fmt.go", include_str!("stubs/fmt.go")),
    "io" => ("io.go", include_str!("stubs/io.go")),
    "io/fs" => ("fs.go", include_str!("stubs/fs.go")),
    "log" => ("log.go", include_str!("stubs/log.go")),
    "net" => ("net.go", include_str!("stubs/net.go")),
    "net/http" => ("http.go", include_str!("stubs/http.go")),
    "net/url" => ("url.go", include_str!("stubs/url.go")),
    "os" => ("os.go", include_str!("stubs/os.go")),
    "sort" => ("sort.go", include_str!("stubs/sort.go")),
    "strings" => ("strings.go", include_str!("stubs/strings.go")),
    "sync" => ("sync.go", include_str!("stubs/sync.go")),
    "time" => ("time.go", include_str!("stubs/time.go")),
};

/// Provider of pre-built packages.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackProvider;

impl FallbackProvider {
    pub fn new() -> Self {
        Self
    }

    /// Stub source for an import path, if one is bundled.
    pub fn source(&self, path: &str) -> Option<(&'static str, &'static str)> {
        STUBS.get(path).copied()
    }

    /// Import paths with bundled stubs.
    pub fn paths(&self) -> impl Iterator<Item = &'static str> {
        STUBS.keys().copied()
    }
}

/// Standard-library paths have no dot in their first element.
pub fn is_std_path(path: &str) -> bool {
    !path.is_empty()
        && !path.starts_with('.')
        && !path.starts_with('/')
        && !path.split('/').next().unwrap_or("").contains('.')
}

/// Last element of an import path, the conventional package name.
pub(crate) fn last_elem(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::analysis::GoSyntax;

    #[test]
    fn test_is_std_path() {
        assert!(is_std_path("net/http"));
        assert!(is_std_path("fmt"));
        assert!(!is_std_path("github.com/pkg/errors"));
        assert!(!is_std_path("./local"));
        assert!(!is_std_path("/abs/dir"));
    }

    #[test]
    fn test_every_stub_parses_with_matching_package_name() {
        let syntax = GoSyntax::new();
        let provider = FallbackProvider::new();
        for path in provider.paths() {
            let (file, source) = provider.source(path).unwrap();
            let parsed = syntax
                .parse_file(Path::new(file), source.as_bytes())
                .unwrap_or_else(|e| panic!("stub for {} does not parse: {}", path, e));
            assert_eq!(parsed.package, last_elem(path), "stub for {}", path);
        }
    }
}
