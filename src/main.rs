//! Mocker CLI entry point.

use clap::Parser;
use mocker::cli::{self, Cli, EXIT_ERROR};

fn main() {
    cli::init_logging();
    let cli = Cli::parse();

    let exit_code = match cli::run(&cli) {
        Ok(code) => code,
        Err(e) => {
            cli::report_error(&e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
