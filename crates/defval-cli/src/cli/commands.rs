//! CLI command definitions for defval
//!
//! Clap-based commands for injecting defaults, validating content, listing
//! declared helpers, and running the schema validator directly.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::Level;

use defval_core::{DefvalEngine, DefvalError, HelperRegistry, PluginCatalog, RuleDocument};

use super::output::{HelperListing, OutputFormat, RunOutput};
use super::ExitCode;
use crate::config::DefvalConfig;
use crate::error::{CliError, Result};
use crate::loader;
use crate::schema_gate::SchemaGate;

/// Rule-driven default injection and content validation
#[derive(Parser, Debug)]
#[command(name = "defval")]
#[command(about = "Inject defaults into documents and validate their content", long_about = None)]
#[command(version)]
pub struct DefvalCli {
    /// Output verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML configuration file [env: DEFVAL_CONFIG]
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log line format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: DefvalCommands,
}

impl DefvalCli {
    /// Log level requested by `-q`/`-v`, if either was given
    ///
    /// `None` leaves the level to `RUST_LOG`.
    pub fn log_level(&self) -> Option<Level> {
        match (self.quiet, self.verbose) {
            (true, _) => Some(Level::ERROR),
            (false, 0) => None,
            (false, 1) => Some(Level::INFO),
            (false, 2) => Some(Level::DEBUG),
            (false, _) => Some(Level::TRACE),
        }
    }
}

/// Log output formats
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum DefvalCommands {
    /// Inject defaults, then validate the defaulted document
    ///
    /// Validation is skipped when the default pass fails.
    Apply {
        /// Rule document
        #[arg(short, long)]
        rules: PathBuf,

        /// Data document to default and validate
        #[arg(short, long)]
        data: PathBuf,

        /// Write the defaulted document here; the input is left unchanged
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format for the run report
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Inject defaults only
    Defaults {
        /// Rule document
        #[arg(short, long)]
        rules: PathBuf,

        /// Data document to default
        #[arg(short, long)]
        data: PathBuf,

        /// Write the defaulted document here; the input is left unchanged
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format for the run report
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Validate document content without injecting defaults
    Validate {
        /// Rule document
        #[arg(short, long)]
        rules: PathBuf,

        /// Data document to validate
        #[arg(short, long)]
        data: PathBuf,

        /// Output format for the run report
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// List the helpers a rule document declares
    Helpers {
        /// Rule document
        #[arg(short, long)]
        rules: PathBuf,

        /// Output format
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Run the configured schema validator on one document
    CheckSchema {
        /// Schema file
        #[arg(short, long)]
        schema: PathBuf,

        /// Document to check
        #[arg(short, long)]
        document: PathBuf,
    },
}

/// Settings shared by every command
#[derive(Debug)]
pub struct Context {
    pub config: DefvalConfig,
    pub quiet: bool,
}

impl Context {
    pub fn new(config: DefvalConfig, quiet: bool) -> Self {
        Self { config, quiet }
    }

    fn engine(&self) -> DefvalEngine {
        DefvalEngine::new(PluginCatalog::with_builtins()).with_sections(
            self.config.sections.default_setters.as_str(),
            self.config.sections.validators.as_str(),
        )
    }

    fn gate(&self) -> SchemaGate {
        SchemaGate::new(self.config.schema.clone())
    }

    fn load_rules(&self, path: &Path) -> Result<RuleDocument> {
        Ok(self.gate().bootstrap(path)?.with_element_names(
            self.config.sections.default_element.as_str(),
            self.config.sections.validate_element.as_str(),
        ))
    }

    fn load_data(&self, path: &Path) -> Result<defval_core::Tree> {
        self.gate().validate_manifest(path)?;
        loader::load_tree(path)
    }

    fn format(&self, requested: Option<OutputFormat>) -> OutputFormat {
        requested.unwrap_or(self.config.output.format)
    }

    fn emit(&self, output: &RunOutput, format: Option<OutputFormat>) -> Result<()> {
        if self.quiet {
            return Ok(());
        }
        output.render(self.format(format))
    }
}

/// Execute the apply command
pub fn execute_apply(
    ctx: &Context,
    rules: &Path,
    data: &Path,
    output: Option<&Path>,
    format: Option<OutputFormat>,
) -> Result<ExitCode> {
    let rules = ctx.load_rules(rules)?;
    let mut tree = ctx.load_data(data)?;

    match ctx.engine().apply(&mut tree, &rules) {
        Ok(report) => {
            if let Some(path) = output {
                loader::save_tree(path, &tree)?;
            }
            ctx.emit(&RunOutput::from_report(&report), format)?;
            Ok(ExitCode::Success)
        }
        Err(error) => batch_failure(ctx, error, format),
    }
}

/// Execute the defaults command
pub fn execute_defaults(
    ctx: &Context,
    rules: &Path,
    data: &Path,
    output: Option<&Path>,
    format: Option<OutputFormat>,
) -> Result<ExitCode> {
    let rules = ctx.load_rules(rules)?;
    let mut tree = ctx.load_data(data)?;

    match ctx.engine().inject_defaults(&mut tree, &rules) {
        Ok(summary) => {
            if let Some(path) = output {
                loader::save_tree(path, &tree)?;
            }
            ctx.emit(&RunOutput::from_defaults(&summary), format)?;
            Ok(ExitCode::Success)
        }
        Err(error) => batch_failure(ctx, error, format),
    }
}

/// Execute the validate command
pub fn execute_validate(
    ctx: &Context,
    rules: &Path,
    data: &Path,
    format: Option<OutputFormat>,
) -> Result<ExitCode> {
    let rules = ctx.load_rules(rules)?;
    let tree = ctx.load_data(data)?;

    match ctx.engine().validate_content(&tree, &rules) {
        Ok(summary) => {
            ctx.emit(&RunOutput::from_validation(&summary), format)?;
            Ok(ExitCode::Success)
        }
        Err(error) => batch_failure(ctx, error, format),
    }
}

/// Helper declarations of both sections of a rule document
pub fn helper_listings(ctx: &Context, rules: &Path) -> Result<Vec<HelperListing>> {
    let rules = ctx.load_rules(rules)?;
    let engine = ctx.engine();

    let mut listings = Vec::new();
    for section in [engine.default_setter_section(), engine.validator_section()] {
        let registry = HelperRegistry::build(&rules, section, engine.catalog())
            .map_err(DefvalError::from)?;
        listings.push(HelperListing {
            section: section.to_string(),
            helpers: registry.bindings().to_vec(),
        });
    }
    Ok(listings)
}

/// Execute the helpers command
pub fn execute_helpers(
    ctx: &Context,
    rules: &Path,
    format: Option<OutputFormat>,
) -> Result<ExitCode> {
    let listings = helper_listings(ctx, rules)?;
    if !ctx.quiet {
        HelperListing::render_all(&listings, ctx.format(format))?;
    }
    Ok(ExitCode::Success)
}

/// Execute the check-schema command
pub fn execute_check_schema(ctx: &Context, schema: &Path, document: &Path) -> Result<ExitCode> {
    ctx.gate().validate(schema, document)?;
    if !ctx.quiet {
        println!("'{}' is valid against '{}'", document.display(), schema.display());
    }
    Ok(ExitCode::Success)
}

/// Report a failed pass; structural errors propagate unchanged
fn batch_failure(
    ctx: &Context,
    error: DefvalError,
    format: Option<OutputFormat>,
) -> Result<ExitCode> {
    if error.is_structural() {
        return Err(CliError::from(error));
    }
    for finding in error.findings() {
        tracing::debug!(
            pass = %finding.pass,
            kind = %finding.kind,
            nodepath = %finding.nodepath,
            "{}",
            finding.message
        );
    }
    ctx.emit(&RunOutput::from_error(&error), format)?;
    Ok(ExitCode::ValidationError)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> DefvalCli {
        let mut argv = vec!["defval"];
        argv.extend_from_slice(args);
        argv.extend_from_slice(&["helpers", "-r", "rules.yaml"]);
        DefvalCli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_log_level_flags() {
        assert_eq!(parse(&[]).log_level(), None);
        assert_eq!(parse(&["-q"]).log_level(), Some(Level::ERROR));
        assert_eq!(parse(&["-v"]).log_level(), Some(Level::INFO));
        assert_eq!(parse(&["-vv"]).log_level(), Some(Level::DEBUG));
        assert_eq!(parse(&["-vvvv"]).log_level(), Some(Level::TRACE));
        assert_eq!(parse(&["-q", "-v"]).log_level(), Some(Level::ERROR));
    }
}
