//! tscheck CLI entry point.

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use tscheck_cli::cli::Cli;
use tscheck_cli::commands;

fn main() {
    // Load .env.local if it exists (for TSCHECK_TSC etc.)
    let _ = dotenvy::from_filename(".env.local");

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match commands::execute(&cli) {
        Ok(status) => std::process::exit(status),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(commands::EXIT_FAILURE);
        }
    }
}
