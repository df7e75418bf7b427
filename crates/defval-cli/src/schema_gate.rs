//! Schema validation through an external validator program
//!
//! The validator is run as `<program> <args...> <schema> <document>`. Its
//! standard output is discarded and its diagnostics go straight to our
//! standard error. The call blocks until the program exits; there is no
//! timeout.

use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};

use defval_core::RuleDocument;

use crate::config::SchemaGateConfig;
use crate::error::{CliError, Result};
use crate::loader;

/// Runs the configured schema validator
#[derive(Debug, Clone)]
pub struct SchemaGate {
    config: SchemaGateConfig,
}

impl SchemaGate {
    pub fn new(config: SchemaGateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SchemaGateConfig {
        &self.config
    }

    /// Validate `document` against `schema`
    ///
    /// Both files must be readable before the validator is started. A
    /// non-zero exit status, termination by signal, or a failure to start
    /// the program is a [`CliError::SchemaError`].
    pub fn validate(&self, schema: &Path, document: &Path) -> Result<()> {
        ensure_readable(schema, "schema")?;
        ensure_readable(document, "document")?;

        let (program, args) = self
            .config
            .validator_command
            .split_first()
            .ok_or_else(|| CliError::invalid_input("schema validator command is empty"))?;

        let command_line = format!(
            "{} {} {}",
            self.config.validator_command.join(" "),
            schema.display(),
            document.display()
        );
        tracing::debug!(command = %command_line, "running schema validator");

        let status = Command::new(program)
            .args(args)
            .arg(schema)
            .arg(document)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| {
                CliError::schema_error(format!("unable to run '{}': {}", command_line, e))
            })?;

        if status.success() {
            tracing::info!(document = %document.display(), "document passed schema validation");
            return Ok(());
        }

        match status.code() {
            Some(code) => Err(CliError::schema_error(format!(
                "'{}' failed schema validation against '{}' (exit status {})",
                document.display(),
                schema.display(),
                code
            ))),
            None => Err(CliError::schema_error(format!(
                "schema validator terminated abnormally while checking '{}'",
                document.display()
            ))),
        }
    }

    /// Schema-validate and load a rule document
    pub fn bootstrap(&self, rules_path: &Path) -> Result<RuleDocument> {
        match (&self.config.rule_schema, self.config.enabled) {
            (Some(schema), true) => self.validate(schema, rules_path)?,
            _ => tracing::debug!(
                rules = %rules_path.display(),
                "no rule schema configured; skipping schema validation"
            ),
        }
        loader::load_rules(rules_path)
    }

    /// Schema-validate a data document
    pub fn validate_manifest(&self, path: &Path) -> Result<()> {
        match (&self.config.manifest_schema, self.config.enabled) {
            (Some(schema), true) => self.validate(schema, path),
            _ => {
                tracing::debug!(
                    manifest = %path.display(),
                    "no manifest schema configured; skipping schema validation"
                );
                Ok(())
            }
        }
    }
}

fn ensure_readable(path: &Path, what: &str) -> Result<()> {
    File::open(path).map(drop).map_err(|e| {
        CliError::file_error(format!(
            "{} file '{}' is not readable: {}",
            what,
            path.display(),
            e
        ))
    })
}
