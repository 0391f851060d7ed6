//! Build-constraint filtering for Go source files.
//!
//! Supports:
//! - `_GOOS`, `_GOARCH` and `_GOOS_GOARCH` file name suffixes
//! - `//go:build <expr>` lines
//! - legacy `// +build` lines (only when no `//go:build` line is present)

use regex::Regex;

lazy_static::lazy_static! {
    static ref GO_BUILD: Regex = Regex::new(r"^//go:build\s+(.+?)\s*$").unwrap();
    static ref PLUS_BUILD: Regex = Regex::new(r"^//\s*\+build\s+(.+?)\s*$").unwrap();
    static ref RELEASE_TAG: Regex = Regex::new(r"^go1\.\d+$").unwrap();
}

static KNOWN_OS: phf::Set<&'static str> = phf::phf_set! {
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "js",
    "linux", "nacl", "netbsd", "openbsd", "plan9", "solaris", "wasip1", "windows", "zos",
};

static KNOWN_ARCH: phf::Set<&'static str> = phf::phf_set! {
    "386", "amd64", "amd64p32", "arm", "armbe", "arm64", "arm64be", "loong64", "mips",
    "mipsle", "mips64", "mips64le", "mips64p32", "mips64p32le", "ppc", "ppc64", "ppc64le",
    "riscv", "riscv64", "s390", "s390x", "sparc", "sparc64", "wasm",
};

static UNIX_OS: phf::Set<&'static str> = phf::phf_set! {
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "linux",
    "netbsd", "openbsd", "solaris",
};

/// The platform files are selected for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    pub goos: String,
    pub goarch: String,
}

impl BuildContext {
    pub fn new(goos: &str, goarch: &str) -> Self {
        Self {
            goos: goos.to_string(),
            goarch: goarch.to_string(),
        }
    }

    /// The context of the machine running the generator.
    pub fn host() -> Self {
        let goos = match std::env::consts::OS {
            "macos" => "darwin",
            other => other,
        };
        let goarch = match std::env::consts::ARCH {
            "x86_64" => "amd64",
            "x86" => "386",
            "aarch64" => "arm64",
            "powerpc" => "ppc",
            "powerpc64" => "ppc64",
            "loongarch64" => "loong64",
            "wasm32" => "wasm",
            other => other,
        };
        Self::new(goos, goarch)
    }

    /// Whether a file should be read, judged by its name and header.
    pub fn includes(&self, file_name: &str, source: &str) -> bool {
        self.matches_file_name(file_name) && self.matches_header(source)
    }

    /// Apply the `_GOOS_GOARCH` file name convention.
    pub fn matches_file_name(&self, file_name: &str) -> bool {
        let stem = file_name.strip_suffix(".go").unwrap_or(file_name);
        let stem = stem.strip_suffix("_test").unwrap_or(stem);
        // The part before the first underscore never carries a constraint.
        let Some(idx) = stem.find('_') else {
            return true;
        };
        let parts: Vec<&str> = stem[idx..].split('_').collect();
        let n = parts.len();

        if n >= 2 && KNOWN_OS.contains(parts[n - 2]) && KNOWN_ARCH.contains(parts[n - 1]) {
            return self.tag(parts[n - 2]) && self.tag(parts[n - 1]);
        }
        if KNOWN_OS.contains(parts[n - 1]) || KNOWN_ARCH.contains(parts[n - 1]) {
            return self.tag(parts[n - 1]);
        }
        true
    }

    /// Evaluate the constraint lines in the file header.
    ///
    /// Unparseable expressions exclude the file.
    pub fn matches_header(&self, source: &str) -> bool {
        let mut plus_lines = Vec::new();

        for line in header_lines(source) {
            if let Some(caps) = GO_BUILD.captures(line) {
                return match Expr::parse(&caps[1]) {
                    Some(expr) => expr.eval(&|t| self.tag(t)),
                    None => false,
                };
            }
            if let Some(caps) = PLUS_BUILD.captures(line) {
                plus_lines.push(caps[1].to_string());
            }
        }

        plus_lines.iter().all(|line| self.eval_plus_line(line))
    }

    /// `// +build a,b c` means (a AND b) OR c.
    fn eval_plus_line(&self, line: &str) -> bool {
        line.split_whitespace().any(|term| {
            term.split(',').all(|atom| match atom.strip_prefix('!') {
                Some(tag) => !self.tag(tag),
                None => self.tag(atom),
            })
        })
    }

    /// Whether a single build tag is satisfied.
    pub fn tag(&self, tag: &str) -> bool {
        if tag == self.goos || tag == self.goarch {
            return true;
        }
        match tag {
            "gc" => true,
            "unix" => UNIX_OS.contains(self.goos.as_str()),
            "linux" => self.goos == "android",
            "solaris" => self.goos == "illumos",
            "darwin" => self.goos == "ios",
            _ => RELEASE_TAG.is_match(tag),
        }
    }
}

impl Default for BuildContext {
    fn default() -> Self {
        Self::host()
    }
}

/// Comment and blank lines before the package clause.
fn header_lines(source: &str) -> impl Iterator<Item = &str> {
    let mut in_block = false;
    source
        .lines()
        .map(str::trim)
        .take_while(move |line| {
            if in_block {
                if line.contains("*/") {
                    in_block = false;
                }
                return true;
            }
            if line.starts_with("/*") {
                in_block = !line.contains("*/");
                return true;
            }
            line.is_empty() || line.starts_with("//")
        })
}

/// A parsed `//go:build` expression.
#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Tag(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    fn parse(input: &str) -> Option<Expr> {
        let tokens = tokenize(input)?;
        let mut parser = ExprParser { tokens, pos: 0 };
        let expr = parser.or()?;
        if parser.pos != parser.tokens.len() {
            return None;
        }
        Some(expr)
    }

    fn eval(&self, tag: &dyn Fn(&str) -> bool) -> bool {
        match self {
            Expr::Tag(name) => tag(name),
            Expr::Not(inner) => !inner.eval(tag),
            Expr::And(a, b) => a.eval(tag) && b.eval(tag),
            Expr::Or(a, b) => a.eval(tag) || b.eval(tag),
        }
    }
}

fn tokenize(input: &str) -> Option<Vec<String>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' => i += 1,
            '(' | ')' | '!' => {
                tokens.push(c.to_string());
                i += 1;
            }
            '&' | '|' => {
                if chars.get(i + 1) != Some(&c) {
                    return None;
                }
                tokens.push(format!("{}{}", c, c));
                i += 2;
            }
            c if c.is_alphanumeric() || c == '_' || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.') {
                    i += 1;
                }
                tokens.push(chars[start..i].iter().collect());
            }
            _ => return None,
        }
    }
    Some(tokens)
}

struct ExprParser {
    tokens: Vec<String>,
    pos: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn or(&mut self) -> Option<Expr> {
        let mut left = self.and()?;
        while self.peek() == Some("||") {
            self.pos += 1;
            left = Expr::Or(Box::new(left), Box::new(self.and()?));
        }
        Some(left)
    }

    fn and(&mut self) -> Option<Expr> {
        let mut left = self.not()?;
        while self.peek() == Some("&&") {
            self.pos += 1;
            left = Expr::And(Box::new(left), Box::new(self.not()?));
        }
        Some(left)
    }

    fn not(&mut self) -> Option<Expr> {
        match self.peek()? {
            "!" => {
                self.pos += 1;
                Some(Expr::Not(Box::new(self.not()?)))
            }
            "(" => {
                self.pos += 1;
                let inner = self.or()?;
                if self.peek() != Some(")") {
                    return None;
                }
                self.pos += 1;
                Some(inner)
            }
            "&&" | "||" | ")" => None,
            tag => {
                let tag = tag.to_string();
                self.pos += 1;
                Some(Expr::Tag(tag))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux() -> BuildContext {
        BuildContext::new("linux", "amd64")
    }

    #[test]
    fn test_file_name_suffixes() {
        let ctx = linux();
        assert!(ctx.matches_file_name("iface.go"));
        assert!(ctx.matches_file_name("linux.go"));
        assert!(ctx.matches_file_name("poll_linux.go"));
        assert!(ctx.matches_file_name("poll_linux_amd64.go"));
        assert!(ctx.matches_file_name("poll_amd64.go"));
        assert!(!ctx.matches_file_name("poll_windows.go"));
        assert!(!ctx.matches_file_name("poll_linux_arm64.go"));
        assert!(!ctx.matches_file_name("poll_darwin_test.go"));
        assert!(ctx.matches_file_name("my_helper.go"));
    }

    #[test]
    fn test_go_build_expressions() {
        let ctx = linux();
        assert!(ctx.matches_header("//go:build linux\n\npackage x\n"));
        assert!(ctx.matches_header("//go:build unix && !windows\n\npackage x\n"));
        assert!(ctx.matches_header("//go:build (darwin || linux) && go1.18\n\npackage x\n"));
        assert!(!ctx.matches_header("//go:build ignore\n\npackage main\n"));
        assert!(!ctx.matches_header("//go:build windows\n\npackage x\n"));
        assert!(!ctx.matches_header("//go:build linux &&\n\npackage x\n"));
    }

    #[test]
    fn test_plus_build_lines() {
        let ctx = linux();
        assert!(ctx.matches_header("// +build linux darwin\n\npackage x\n"));
        assert!(ctx.matches_header("// +build linux,amd64\n\npackage x\n"));
        assert!(!ctx.matches_header("// +build linux,!amd64\n\npackage x\n"));
        assert!(!ctx.matches_header("// +build linux\n// +build cgo\n\npackage x\n"));
    }

    #[test]
    fn test_go_build_wins_over_plus_build() {
        let ctx = linux();
        let source = "//go:build linux\n// +build windows\n\npackage x\n";
        assert!(ctx.matches_header(source));
    }

    #[test]
    fn test_constraints_after_package_clause_are_ignored() {
        let ctx = linux();
        let source = "// Package x does things.\npackage x\n\n//go:build ignore\n";
        assert!(ctx.matches_header(source));
    }
}
