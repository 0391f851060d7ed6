//! Command-line interface for mocker.

use anyhow::Context;
use clap::Parser;
use colored::*;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

use crate::config::Config;
use crate::mocker::{Mocker, Options};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 2;

/// Generate recording mock implementations of Go interfaces.
///
/// Every mock records each call under a mutex and delegates to a
/// configurable function field; calls are inspected through `<Method>Calls()`
/// and cleared with `Reset()`.
#[derive(Parser, Debug)]
#[command(name = "mocker")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to find interfaces
    pub src: PathBuf,

    /// Interfaces to mock (default: every interface in the package)
    pub interfaces: Vec<String>,

    /// File to write mocks to (default: stdout)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Name of package for mocks (default: inferred)
    #[arg(long)]
    pub pkg: Option<String>,

    /// Prefix for mocks [default: Mock]
    #[arg(long)]
    pub prefix: Option<String>,

    /// Suffix for mocks
    #[arg(long)]
    pub suffix: Option<String>,

    /// Import path whose types are rendered unqualified and never imported
    #[arg(long = "self-pkg")]
    pub self_pkg: Option<String>,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// GOPATH entries to search (default: $GOPATH)
    #[arg(long)]
    pub gopath: Vec<PathBuf>,

    /// GOROOT to search (default: $GOROOT)
    #[arg(long)]
    pub goroot: Option<PathBuf>,

    /// Output format: go or json
    #[arg(short, long)]
    pub format: Option<String>,
}

impl Cli {
    /// The flags that were given, as a config layered over the file.
    fn overrides(&self) -> Config {
        Config {
            out: self.out.clone(),
            package: self.pkg.clone(),
            prefix: self.prefix.clone(),
            suffix: self.suffix.clone(),
            self_package: self.self_pkg.clone(),
            gopath: self.gopath.clone(),
            goroot: self.goroot.clone(),
            format: self.format.clone(),
            interfaces: self.interfaces.clone(),
        }
    }
}

/// Install the stderr log subscriber, filtered by `RUST_LOG`.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

/// Load the explicit or discovered config file and apply the flags.
pub fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => {
            let cwd = std::env::current_dir().context("cannot read current directory")?;
            Config::discover(&cwd)
        }
    };

    let file = match path {
        Some(path) => {
            debug!(config = %path.display(), "loading config");
            Config::parse_file(&path)?
        }
        None => Config::default(),
    };
    Ok(file.merge(cli.overrides()))
}

/// Run one generation. Output is written only when every stage succeeded.
pub fn run(cli: &Cli) -> anyhow::Result<i32> {
    let config = load_config(cli)?;
    let format = config.format()?;

    let mut mocker = Mocker::new(Options::from_config(&cli.src, &config));
    let output = mocker
        .render(format)
        .with_context(|| format!("mocker: failed to mock {}", cli.src.display()))?;

    match &config.out {
        Some(path) => {
            fs::write(path, output)
                .with_context(|| format!("failed to write {}", path.display()))?;
            debug!(out = %path.display(), "wrote mocks");
        }
        None => print!("{}", output),
    }
    Ok(EXIT_SUCCESS)
}

/// Print an error and its causes to stderr.
pub fn report_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);
    for cause in err.chain().skip(1) {
        eprintln!("  {} {}", "caused by:".dimmed(), cause);
    }
}
