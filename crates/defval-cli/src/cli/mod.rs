//! CLI module for defval
//!
//! Commands for injecting defaults into documents, validating their
//! content, and inspecting the helpers a rule document declares.

pub mod commands;
pub mod output;

pub use commands::{Context, DefvalCli, DefvalCommands, LogFormat};
pub use output::{HelperListing, OutputFormat, RunOutput};

use defval_core::DefvalError;

use crate::config::DefvalConfig;
use crate::error::CliError;

/// Exit codes for CLI operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful execution, all passes succeeded
    Success = 0,
    /// A default or validation pass failed
    ValidationError = 1,
    /// Invalid input, arguments, or rule document
    InvalidInput = 3,
    /// File not found or inaccessible
    FileError = 4,
    /// Schema validation failed or the validator could not run
    SchemaError = 5,
    /// Internal error
    InternalError = 10,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl ExitCode {
    /// Determine the exit code for an error that ended a command
    pub fn from_error(error: &CliError) -> Self {
        match error {
            CliError::InvalidInput(_) | CliError::ParseError(_) => ExitCode::InvalidInput,
            CliError::FileError(_) => ExitCode::FileError,
            CliError::SchemaError(_) => ExitCode::SchemaError,
            CliError::Defval(DefvalError::Registry(_)) => ExitCode::InvalidInput,
            CliError::Defval(_) => ExitCode::ValidationError,
            CliError::SerializationError(_) | CliError::InternalError(_) => {
                ExitCode::InternalError
            }
        }
    }
}

/// Run the CLI with the given arguments and return the exit code
pub fn run(cli: DefvalCli) -> Result<ExitCode, CliError> {
    run_with_env(cli, |name| std::env::var(name).ok())
}

/// Run the CLI, reading `DEFVAL_*` variables through `lookup`
pub fn run_with_env<F>(cli: DefvalCli, lookup: F) -> Result<ExitCode, CliError>
where
    F: Fn(&str) -> Option<String>,
{
    let config = DefvalConfig::load_with(cli.config.as_deref(), lookup)?;
    let ctx = Context::new(config, cli.quiet);

    match cli.command {
        DefvalCommands::Apply {
            rules,
            data,
            output,
            format,
        } => commands::execute_apply(&ctx, &rules, &data, output.as_deref(), format),
        DefvalCommands::Defaults {
            rules,
            data,
            output,
            format,
        } => commands::execute_defaults(&ctx, &rules, &data, output.as_deref(), format),
        DefvalCommands::Validate {
            rules,
            data,
            format,
        } => commands::execute_validate(&ctx, &rules, &data, format),
        DefvalCommands::Helpers { rules, format } => {
            commands::execute_helpers(&ctx, &rules, format)
        }
        DefvalCommands::CheckSchema { schema, document } => {
            commands::execute_check_schema(&ctx, &schema, &document)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use defval_core::RegistryError;

    #[test]
    fn test_exit_code_conversion() {
        assert_eq!(i32::from(ExitCode::Success), 0);
        assert_eq!(i32::from(ExitCode::ValidationError), 1);
        assert_eq!(i32::from(ExitCode::SchemaError), 5);
        assert_eq!(i32::from(ExitCode::InternalError), 10);
    }

    #[test]
    fn test_exit_code_from_error() {
        assert_eq!(
            ExitCode::from_error(&CliError::file_error("gone")),
            ExitCode::FileError
        );
        assert_eq!(
            ExitCode::from_error(&CliError::schema_error("rejected")),
            ExitCode::SchemaError
        );
        assert_eq!(
            ExitCode::from_error(&CliError::parse_error("bad yaml")),
            ExitCode::InvalidInput
        );

        let registry = CliError::from(DefvalError::from(RegistryError::DuplicateRef {
            section: "helpers/validator".to_string(),
            reference: "abs".to_string(),
        }));
        assert_eq!(ExitCode::from_error(&registry), ExitCode::InvalidInput);

        let batch = CliError::from(DefvalError::BatchDefault { findings: vec![] });
        assert_eq!(ExitCode::from_error(&batch), ExitCode::ValidationError);
    }
}
