//! Integration tests for the command-line front end.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use mocker::cli::{self, Cli, EXIT_SUCCESS};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn gopath_src() -> PathBuf {
    testdata_path().join("gopath/src/github.com/travisjeffery/mocker/test")
}

fn parse(args: &[&str]) -> Cli {
    let gopath = testdata_path().join("gopath");
    let src = gopath_src();
    let mut argv = vec![
        "mocker".to_string(),
        "--gopath".to_string(),
        gopath.to_string_lossy().to_string(),
        src.to_string_lossy().to_string(),
    ];
    argv.extend(args.iter().map(|s| s.to_string()));
    Cli::try_parse_from(argv).expect("valid arguments")
}

#[test]
fn test_writes_out_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("mock_iface.go");

    let cli = parse(&["--out", out.to_str().unwrap(), "Iface"]);
    assert_eq!(cli::run(&cli).expect("run succeeds"), EXIT_SUCCESS);

    let src = fs::read_to_string(&out).expect("output written");
    assert!(src.contains("type MockIface struct {"));
}

#[test]
fn test_failed_run_writes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("mock_iface.go");

    let cli = parse(&["--out", out.to_str().unwrap(), "Iface", "Missing"]);
    let err = cli::run(&cli).unwrap_err();

    assert!(!out.exists());
    let chain: Vec<String> = err.chain().map(|e| e.to_string()).collect();
    assert!(chain.iter().any(|e| e == "failed to find interface: Missing"));
}

#[test]
fn test_config_file_supplies_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("fake.go");
    let config = testdata_path().join("mocker.yaml");

    let cli = parse(&["--config", config.to_str().unwrap(), "--out", out.to_str().unwrap()]);
    cli::run(&cli).expect("run succeeds");

    let src = fs::read_to_string(&out).expect("output written");
    assert!(src.contains("var _ Iface = &FakeIface{}"));
}

#[test]
fn test_json_format_flag() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("doc.json");

    let cli = parse(&["--format", "json", "--out", out.to_str().unwrap(), "Iface"]);
    cli::run(&cli).expect("run succeeds");

    let doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).expect("output written")).expect("json");
    assert_eq!(doc["interfaces"][0]["mock"], "MockIface");
}

#[test]
fn test_unknown_format_is_rejected() {
    let cli = parse(&["--format", "yaml", "Iface"]);
    let err = cli::run(&cli).unwrap_err();
    assert!(err.to_string().contains("unknown output format"));
}
