//! Runs the default and validation passes in order

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::defaults::{DefaultInjector, InjectionSummary};
use crate::error::Result;
use crate::helper::PluginCatalog;
use crate::registry::{DEFAULT_SETTER_SECTION, VALIDATOR_SECTION};
use crate::rules::RuleDocument;
use crate::tree::Tree;
use crate::validate::{ContentValidator, ValidationSummary};

/// Report of a successful run of both passes
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub defaults: InjectionSummary,
    pub validation: ValidationSummary,
    pub generated_at: DateTime<Utc>,
}

/// Defaults-then-validation engine
#[derive(Debug)]
pub struct DefvalEngine {
    catalog: PluginCatalog,
    default_setter_section: String,
    validator_section: String,
}

impl Default for DefvalEngine {
    fn default() -> Self {
        Self::new(PluginCatalog::with_builtins())
    }
}

impl DefvalEngine {
    pub fn new(catalog: PluginCatalog) -> Self {
        Self {
            catalog,
            default_setter_section: DEFAULT_SETTER_SECTION.to_string(),
            validator_section: VALIDATOR_SECTION.to_string(),
        }
    }

    /// Override the rule document sections holding helper declarations
    pub fn with_sections(
        mut self,
        default_setters: impl Into<String>,
        validators: impl Into<String>,
    ) -> Self {
        self.default_setter_section = default_setters.into();
        self.validator_section = validators.into();
        self
    }

    pub fn catalog(&self) -> &PluginCatalog {
        &self.catalog
    }

    pub fn default_setter_section(&self) -> &str {
        &self.default_setter_section
    }

    pub fn validator_section(&self) -> &str {
        &self.validator_section
    }

    /// Inject defaults, then validate the defaulted tree
    ///
    /// Validation does not run when the default pass fails.
    pub fn apply(&self, data: &mut Tree, rules: &RuleDocument) -> Result<RunReport> {
        let defaults = self.inject_defaults(data, rules)?;
        let validation = self.validate_content(data, rules)?;
        Ok(RunReport {
            defaults,
            validation,
            generated_at: Utc::now(),
        })
    }

    pub fn inject_defaults(&self, data: &mut Tree, rules: &RuleDocument) -> Result<InjectionSummary> {
        DefaultInjector::new(&self.catalog)
            .with_section(self.default_setter_section.as_str())
            .inject(data, rules)
    }

    pub fn validate_content(&self, data: &Tree, rules: &RuleDocument) -> Result<ValidationSummary> {
        ContentValidator::new(&self.catalog)
            .with_section(self.validator_section.as_str())
            .validate(data, rules)
    }
}
