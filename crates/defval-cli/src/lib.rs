//! Command-line front end for defval
//!
//! Loads rule and data documents (JSON, YAML or TOML), gates them through an
//! external schema validator, and runs the default and validation passes of
//! [`defval_core`].
//!
//! ## CLI Usage
//!
//! ```bash
//! # Inject defaults, validate, and write the result
//! defval apply --rules rules.yaml --data manifest.yaml --output manifest.out.yaml
//!
//! # Validate only, machine-readable report
//! defval validate --rules rules.yaml --data manifest.yaml --format json
//!
//! # Show declared helpers
//! defval helpers --rules rules.yaml
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod loader;
pub mod schema_gate;

pub use cli::{DefvalCli, DefvalCommands, ExitCode, LogFormat, OutputFormat};
pub use config::DefvalConfig;
pub use error::{CliError, Result};
pub use schema_gate::SchemaGate;

/// Run the CLI and map failures to an exit code
///
/// ```rust,no_run
/// use clap::Parser;
/// use defval_cli::{run_cli, DefvalCli};
///
/// let cli = DefvalCli::parse();
/// let exit_code = run_cli(cli);
/// std::process::exit(exit_code.into());
/// ```
pub fn run_cli(cli: DefvalCli) -> ExitCode {
    match cli::run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from_error(&e)
        }
    }
}
