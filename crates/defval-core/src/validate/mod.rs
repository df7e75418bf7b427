//! Content validation pass
//!
//! `validate` rules come in three flavors, selected by attribute:
//!
//! - `nodepath=`: point validation of the nodes at one nodepath, with a
//!   policy for missing nodes ([`singles`]);
//! - `group=`: one validator over the nodes at several nodepaths, absence
//!   allowed ([`group`]);
//! - `exclude=`: one validator over every node of the tree except the listed
//!   canonical paths ([`exclude`]).
//!
//! The sub-passes run in that order. Each one aggregates its failures
//! without stopping, and the pass fails at the end if any sub-pass did.

pub mod exclude;
pub mod group;
pub mod singles;

use serde::Serialize;

use crate::error::{DefvalError, HelperError, Result};
use crate::findings::{Finding, FindingKind, Pass};
use crate::helper::PluginCatalog;
use crate::invoke::{self, Verdict};
use crate::registry::{HelperRegistry, VALIDATOR_SECTION};
use crate::rules::{ExcludeRule, GroupRule, RuleDocument, SinglesRule, ValidateRule};
use crate::tree::{NodeRef, Tree};

/// Counters for one sub-pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    /// Rules processed
    pub rules: usize,
    /// Validator calls made
    pub checks: usize,
    /// Failures recorded
    pub failures: usize,
}

impl PassSummary {
    pub fn passed(&self) -> bool {
        self.failures == 0
    }
}

/// What a validation pass did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub singles: PassSummary,
    pub group: PassSummary,
    pub exclude: PassSummary,
    /// `validate` nodes carrying no selector attribute
    pub ignored_rules: usize,
}

impl ValidationSummary {
    /// Total validator calls across sub-passes
    pub fn checks(&self) -> usize {
        self.singles.checks + self.group.checks + self.exclude.checks
    }

    /// Sub-passes that recorded failures
    pub fn failed_passes(&self) -> Vec<Pass> {
        [
            (Pass::Singles, &self.singles),
            (Pass::Group, &self.group),
            (Pass::Exclude, &self.exclude),
        ]
        .into_iter()
        .filter(|(_, summary)| !summary.passed())
        .map(|(pass, _)| pass)
        .collect()
    }
}

/// Checks node contents against `validate` rules
#[derive(Debug)]
pub struct ContentValidator<'c> {
    catalog: &'c PluginCatalog,
    section: String,
}

impl<'c> ContentValidator<'c> {
    pub fn new(catalog: &'c PluginCatalog) -> Self {
        Self {
            catalog,
            section: VALIDATOR_SECTION.to_string(),
        }
    }

    /// Read validator declarations from a different section
    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = section.into();
        self
    }

    /// Validate `data` against the rules; the tree is never modified
    ///
    /// Fails immediately if the validator registry cannot be built.
    /// Otherwise all three sub-passes run, and any failure surfaces as
    /// [`DefvalError::BatchValidation`] naming the sub-passes that failed.
    pub fn validate(&self, data: &Tree, rules: &RuleDocument) -> Result<ValidationSummary> {
        let registry = HelperRegistry::build(rules, &self.section, self.catalog)?;

        let mut singles_rules: Vec<SinglesRule> = Vec::new();
        let mut group_rules: Vec<GroupRule> = Vec::new();
        let mut exclude_rules: Vec<ExcludeRule> = Vec::new();
        let mut summary = ValidationSummary::default();

        for node in rules.validate_nodes() {
            match ValidateRule::classify(node) {
                Some(ValidateRule::Singles(rule)) => singles_rules.push(rule),
                Some(ValidateRule::Group(rule)) => group_rules.push(rule),
                Some(ValidateRule::Exclude(rule)) => exclude_rules.push(rule),
                None => {
                    tracing::warn!(
                        rule = %node.path(),
                        "validate rule has no nodepath, group or exclude attribute; ignoring"
                    );
                    summary.ignored_rules += 1;
                }
            }
        }

        let mut findings = Vec::new();

        summary.singles = singles::run(
            data,
            &singles_rules,
            Checker::new(Pass::Singles, &registry, &mut findings),
        );
        summary.group = group::run(
            data,
            &group_rules,
            Checker::new(Pass::Group, &registry, &mut findings),
        );
        summary.exclude = exclude::run(
            data,
            &exclude_rules,
            Checker::new(Pass::Exclude, &registry, &mut findings),
        );

        tracing::info!(
            checks = summary.checks(),
            failures = findings.len(),
            "validation pass finished"
        );

        let failed = summary.failed_passes();
        if failed.is_empty() {
            Ok(summary)
        } else {
            Err(DefvalError::BatchValidation { failed, findings })
        }
    }
}

/// Runs validators for one sub-pass and records what fails
pub struct Checker<'a> {
    pass: Pass,
    registry: &'a HelperRegistry,
    findings: &'a mut Vec<Finding>,
    summary: PassSummary,
}

impl<'a> Checker<'a> {
    pub fn new(pass: Pass, registry: &'a HelperRegistry, findings: &'a mut Vec<Finding>) -> Self {
        Self {
            pass,
            registry,
            findings,
            summary: PassSummary::default(),
        }
    }

    /// Run `reference` against `node`; returns whether the content is valid
    ///
    /// A missing helper, a failing helper and rejected content are all
    /// recorded as findings.
    pub fn check(&mut self, reference: &str, node: NodeRef<'_>) -> bool {
        self.summary.checks += 1;
        tracing::debug!(pass = %self.pass, reference, node = %node.path(), "calling validator");

        let helper = match invoke::resolve(reference, self.registry) {
            Ok(helper) => helper,
            Err(err) => {
                self.record(
                    Finding::new(self.pass, FindingKind::MissingHelper, node.path(), err.to_string())
                        .with_helper(reference),
                );
                return false;
            }
        };

        match invoke::call_validator(&helper, node) {
            Verdict::Valid => true,
            Verdict::Invalid => {
                self.record(
                    Finding::new(
                        self.pass,
                        FindingKind::InvalidContent,
                        node.path(),
                        format!("content \"{}\" did not validate", node.value()),
                    )
                    .with_helper(reference)
                    .with_value(node.value()),
                );
                false
            }
            Verdict::Errored(err) => {
                self.record(helper_failure(self.pass, reference, node, &err));
                false
            }
        }
    }

    /// Record a failure not tied to a validator call
    pub fn record(&mut self, finding: Finding) {
        tracing::warn!("{}", finding);
        self.summary.failures += 1;
        self.findings.push(finding);
    }

    /// Count a processed rule
    pub fn rule_seen(&mut self) {
        self.summary.rules += 1;
    }

    pub fn pass(&self) -> Pass {
        self.pass
    }

    pub fn finish(self) -> PassSummary {
        self.summary
    }
}

fn helper_failure(pass: Pass, reference: &str, node: NodeRef<'_>, err: &HelperError) -> Finding {
    Finding::new(
        pass,
        FindingKind::HelperFailed,
        node.path(),
        format!(
            "error validating content \"{}\" using validator {}: {}",
            node.value(),
            reference,
            err
        ),
    )
    .with_helper(reference)
    .with_value(node.value())
}
