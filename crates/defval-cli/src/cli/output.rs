//! Output formatting for the defval CLI
//!
//! Run reports and helper listings render as JSON, YAML, or a colored
//! human-readable table.

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

use defval_core::{
    DefvalError, Finding, FindingKind, HelperBinding, InjectionSummary, RunReport,
    ValidationSummary,
};

use crate::error::{CliError, Result};

/// Output format options for CLI results
#[derive(
    Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable table format with colors
    #[default]
    Table,
    /// JSON format for machine processing
    Json,
    /// YAML format
    Yaml,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Result of a defaults and/or validation run, ready for rendering
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    /// Whether every pass that ran succeeded
    pub success: bool,
    /// Summary message
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<InjectionSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationSummary>,
    /// Recorded failures
    pub findings: Vec<Finding>,
    pub generated_at: DateTime<Utc>,
}

impl RunOutput {
    /// Output for a run where both passes succeeded
    pub fn from_report(report: &RunReport) -> Self {
        Self {
            success: true,
            summary: format!(
                "Defaults applied ({} node(s) created); {} validation check(s) passed",
                report.defaults.created.len(),
                report.validation.checks()
            ),
            defaults: Some(report.defaults.clone()),
            validation: Some(report.validation.clone()),
            findings: Vec::new(),
            generated_at: report.generated_at,
        }
    }

    /// Output for a successful default pass
    pub fn from_defaults(summary: &InjectionSummary) -> Self {
        Self {
            success: true,
            summary: format!(
                "Defaults applied: {} of {} rule(s), {} node(s) created",
                summary.rules_applied,
                summary.rules_total,
                summary.created.len()
            ),
            defaults: Some(summary.clone()),
            validation: None,
            findings: Vec::new(),
            generated_at: Utc::now(),
        }
    }

    /// Output for a successful validation pass
    pub fn from_validation(summary: &ValidationSummary) -> Self {
        Self {
            success: true,
            summary: format!("Content is valid: {} check(s) passed", summary.checks()),
            defaults: None,
            validation: Some(summary.clone()),
            findings: Vec::new(),
            generated_at: Utc::now(),
        }
    }

    /// Output for a failed pass
    pub fn from_error(error: &DefvalError) -> Self {
        Self {
            success: false,
            summary: error.to_string(),
            defaults: None,
            validation: None,
            findings: error.findings().to_vec(),
            generated_at: Utc::now(),
        }
    }

    /// Render output in the specified format
    pub fn render(&self, format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Json => render_json(self),
            OutputFormat::Yaml => render_yaml(self),
            OutputFormat::Table => self.render_table(),
        }
    }

    fn render_table(&self) -> Result<()> {
        let mut stdout = io::stdout();

        writeln!(stdout).ok();
        writeln!(stdout, "{}", "Defval Results".cyan().bold()).ok();
        writeln!(stdout, "{}", "=".repeat(60)).ok();
        writeln!(stdout).ok();

        let status = if self.success { "+".green() } else { "x".red() };
        writeln!(stdout, "{} {}", status, self.summary).ok();
        writeln!(stdout).ok();

        if let Some(defaults) = &self.defaults {
            writeln!(stdout, "{}", "Defaults:".cyan().bold()).ok();
            writeln!(
                stdout,
                "  rules: {}  applied: {}  skipped: {}",
                defaults.rules_total, defaults.rules_applied, defaults.rules_skipped
            )
            .ok();
            for path in &defaults.created {
                writeln!(stdout, "  {} {}", "+".green(), path.cyan()).ok();
            }
            writeln!(stdout).ok();
        }

        if let Some(validation) = &self.validation {
            writeln!(stdout, "{}", "Validation:".cyan().bold()).ok();
            for (name, pass) in [
                ("singles", &validation.singles),
                ("group", &validation.group),
                ("exclude", &validation.exclude),
            ] {
                writeln!(
                    stdout,
                    "  {:<8} rules: {:<4} checks: {:<5} failures: {}",
                    name,
                    pass.rules,
                    pass.checks,
                    if pass.passed() {
                        "0".green()
                    } else {
                        pass.failures.to_string().red()
                    }
                )
                .ok();
            }
            if validation.ignored_rules > 0 {
                writeln!(
                    stdout,
                    "  {} {} rule(s) without a selector ignored",
                    "!".yellow(),
                    validation.ignored_rules
                )
                .ok();
            }
            writeln!(stdout).ok();
        }

        if !self.findings.is_empty() {
            writeln!(stdout, "{}", "Findings:".cyan().bold()).ok();
            writeln!(stdout, "{}", "-".repeat(60)).ok();
            for finding in &self.findings {
                render_finding(&mut stdout, finding);
            }
        }

        stdout.flush().ok();
        Ok(())
    }
}

fn render_finding(stdout: &mut io::Stdout, finding: &Finding) {
    let label = match finding.kind {
        FindingKind::InvalidContent => finding.kind.to_string().red().bold(),
        FindingKind::MissingNode | FindingKind::MissingParent => {
            finding.kind.to_string().yellow().bold()
        }
        _ => finding.kind.to_string().magenta().bold(),
    };

    writeln!(stdout).ok();
    writeln!(
        stdout,
        "{} [{}] {} {}",
        "x".red(),
        finding.pass.to_string().dimmed(),
        label,
        finding.message
    )
    .ok();
    writeln!(stdout, "  {} {}", "Path:".dimmed(), finding.nodepath.cyan()).ok();
    if let Some(helper) = &finding.helper {
        writeln!(stdout, "  {} {}", "Helper:".dimmed(), helper).ok();
    }
    if let Some(value) = &finding.value {
        writeln!(stdout, "  {} {:?}", "Value:".dimmed(), value).ok();
    }
}

/// Helper declarations of one rule document section
#[derive(Debug, Clone, Serialize)]
pub struct HelperListing {
    pub section: String,
    pub helpers: Vec<HelperBinding>,
}

impl HelperListing {
    pub fn render_all(listings: &[HelperListing], format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Json => render_json(&listings),
            OutputFormat::Yaml => render_yaml(&listings),
            OutputFormat::Table => {
                let mut stdout = io::stdout();
                for listing in listings {
                    writeln!(stdout).ok();
                    writeln!(stdout, "{}", listing.section.cyan().bold()).ok();
                    writeln!(stdout, "{}", "-".repeat(60)).ok();
                    if listing.helpers.is_empty() {
                        writeln!(stdout, "  {}", "(none)".dimmed()).ok();
                    }
                    for binding in &listing.helpers {
                        writeln!(
                            stdout,
                            "  {:<16} {}.{}{}",
                            binding.reference.green(),
                            binding.class_id,
                            binding.method,
                            if binding.invert { " (inverted)" } else { "" }
                        )
                        .ok();
                    }
                }
                stdout.flush().ok();
                Ok(())
            }
        }
    }
}

fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::SerializationError(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

fn render_yaml<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let yaml = serde_yaml::to_string(value)
        .map_err(|e| CliError::SerializationError(e.to_string()))?;
    println!("{}", yaml);
    Ok(())
}
