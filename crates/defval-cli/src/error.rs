//! Error types for the defval command-line front end
//!
//! Wraps engine errors together with the I/O, parsing and subprocess
//! failures that only exist at the edge of the system.

use defval_core::{DefvalError, TreeError};
use thiserror::Error;

/// Main error type for CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid input data or arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// File access or I/O error
    #[error("File error: {0}")]
    FileError(String),

    /// Document parsing error
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Schema validator rejected a document or could not run
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// Serialization error while rendering output
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Engine failure
    #[error(transparent)]
    Defval(#[from] DefvalError),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl CliError {
    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        CliError::InvalidInput(msg.into())
    }

    /// Create a file error
    pub fn file_error(msg: impl Into<String>) -> Self {
        CliError::FileError(msg.into())
    }

    /// Create a parse error
    pub fn parse_error(msg: impl Into<String>) -> Self {
        CliError::ParseError(msg.into())
    }

    /// Create a schema error
    pub fn schema_error(msg: impl Into<String>) -> Self {
        CliError::SchemaError(msg.into())
    }

    /// Check if this is a user-facing error (vs internal)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            CliError::InvalidInput(_)
                | CliError::FileError(_)
                | CliError::ParseError(_)
                | CliError::SchemaError(_)
                | CliError::Defval(_)
        )
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::FileError(err.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::ParseError(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        CliError::ParseError(format!("YAML error: {}", err))
    }
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        CliError::ParseError(format!("TOML error: {}", err))
    }
}

impl From<TreeError> for CliError {
    fn from(err: TreeError) -> Self {
        CliError::ParseError(err.to_string())
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
