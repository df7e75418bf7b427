//! defval CLI
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: A default or validation pass failed
//! - 3: Invalid input, arguments, or rule document
//! - 4: File not found or inaccessible
//! - 5: Schema validation failed
//! - 10: Internal error

use anyhow::Context;
use clap::Parser;
use defval_cli::{run_cli, DefvalCli, LogFormat};
use tracing::Level;
use tracing_subscriber::EnvFilter;

fn init_tracing(cli: &DefvalCli) -> anyhow::Result<()> {
    // -q/-v win over RUST_LOG; without them RUST_LOG applies, else warn
    let filter = match cli.log_level() {
        Some(level) => EnvFilter::default().add_directive(level.into()),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::default().add_directive(Level::WARN.into())),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match cli.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    }
    .map_err(|e| anyhow::anyhow!(e))
    .context("failed to initialize logging")
}

fn main() {
    let cli = DefvalCli::parse();

    if let Err(e) = init_tracing(&cli) {
        eprintln!("Warning: {:#}", e);
    }

    let exit_code = run_cli(cli);
    std::process::exit(exit_code.into());
}
