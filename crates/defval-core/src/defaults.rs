//! Default injection pass
//!
//! Walks the `default` rules in declaration order and adds every node that
//! is absent under each matching parent. The pass is additive: existing
//! nodes are never overwritten, so running it twice changes nothing the
//! second time.

use serde::Serialize;

use crate::error::{DefvalError, HelperError, Result, TreeError};
use crate::findings::{Finding, FindingKind, Pass};
use crate::helper::PluginCatalog;
use crate::invoke;
use crate::registry::{HelperRegistry, DEFAULT_SETTER_SECTION};
use crate::rules::{DefaultRule, MissingParentPolicy, RuleDocument, ValueSource};
use crate::tree::{NodeId, Tree};

/// What a successful default pass did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InjectionSummary {
    /// `default` rules read from the rule document
    pub rules_total: usize,
    /// Rules that created at least one node
    pub rules_applied: usize,
    /// Rules skipped by `skip_if_no_exist` or `missing_parent = skip`
    pub rules_skipped: usize,
    /// Canonical paths of created nodes, in creation order
    pub created: Vec<String>,
}

/// Applies `default` rules to a data tree
#[derive(Debug)]
pub struct DefaultInjector<'c> {
    catalog: &'c PluginCatalog,
    section: String,
}

impl<'c> DefaultInjector<'c> {
    pub fn new(catalog: &'c PluginCatalog) -> Self {
        Self {
            catalog,
            section: DEFAULT_SETTER_SECTION.to_string(),
        }
    }

    /// Read default-setter declarations from a different section
    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = section.into();
        self
    }

    /// Inject defaults into `data`
    ///
    /// Fails immediately if the default-setter registry cannot be built.
    /// Per-rule failures are collected and returned together as
    /// [`DefvalError::BatchDefault`] once every rule has been tried; nodes
    /// created by the other rules stay in the tree.
    pub fn inject(&self, data: &mut Tree, rules: &RuleDocument) -> Result<InjectionSummary> {
        let registry = HelperRegistry::build(rules, &self.section, self.catalog)?;
        let mut summary = InjectionSummary::default();
        let mut findings = Vec::new();

        for node in rules.default_nodes() {
            summary.rules_total += 1;
            match DefaultRule::from_node(node) {
                Ok(rule) => apply_rule(data, &rule, &registry, &mut summary, &mut findings),
                Err(malformed) => {
                    tracing::warn!(rule = %malformed.path, "{}", malformed.message);
                    findings.push(Finding::malformed(Pass::Defaults, &malformed));
                }
            }
        }

        tracing::info!(
            rules = summary.rules_total,
            applied = summary.rules_applied,
            skipped = summary.rules_skipped,
            created = summary.created.len(),
            failures = findings.len(),
            "default pass finished"
        );

        if findings.is_empty() {
            Ok(summary)
        } else {
            Err(DefvalError::BatchDefault { findings })
        }
    }
}

fn apply_rule(
    data: &mut Tree,
    rule: &DefaultRule,
    registry: &HelperRegistry,
    summary: &mut InjectionSummary,
    findings: &mut Vec<Finding>,
) {
    if let Some(guard) = &rule.skip_if_no_exist {
        if data.find(guard).is_empty() {
            tracing::debug!(nodepath = %rule.nodepath, guard = %guard, "guard node absent; skipping rule");
            summary.rules_skipped += 1;
            return;
        }
    }

    let (parent_path, child) = rule.split();
    let mut parents = data.find(parent_path);

    if parents.is_empty() {
        match &rule.missing_parent {
            MissingParentPolicy::Error => {
                let finding = Finding::new(
                    Pass::Defaults,
                    FindingKind::MissingParent,
                    &rule.nodepath,
                    format!("parent node '{}' not found", parent_path),
                );
                tracing::warn!("{}", finding);
                findings.push(finding);
                return;
            }
            MissingParentPolicy::Skip => {
                tracing::debug!(nodepath = %rule.nodepath, "parent absent; skipping rule");
                summary.rules_skipped += 1;
                return;
            }
            MissingParentPolicy::Unrecognized(policy) => {
                let finding = Finding::new(
                    Pass::Defaults,
                    FindingKind::MalformedRule,
                    &rule.nodepath,
                    format!("invalid \"missing_parent\" attribute '{}'", policy),
                );
                tracing::warn!("{}", finding);
                findings.push(finding);
                return;
            }
            MissingParentPolicy::Create => match data.ensure_path(parent_path) {
                Ok(parent) => {
                    tracing::debug!(parent = %data.path(parent), "created missing parent chain");
                    parents.push(parent);
                }
                Err(err) => {
                    let kind = match err {
                        TreeError::NonDeterministicPath { .. } => FindingKind::NonDeterministicPath,
                        TreeError::MissingRoot { .. } => FindingKind::MissingParent,
                        _ => FindingKind::MalformedRule,
                    };
                    let finding =
                        Finding::new(Pass::Defaults, kind, &rule.nodepath, err.to_string());
                    tracing::warn!("{}", finding);
                    findings.push(finding);
                    return;
                }
            },
        }
    }

    let mut applied = false;
    for parent in parents {
        if !data.find_under(parent, child).is_empty() {
            tracing::debug!(
                parent = %data.path(parent),
                child,
                "node already present; not overwriting"
            );
            continue;
        }

        let value = match compute_value(data, parent, rule, registry) {
            Ok(value) => value,
            Err(finding) => {
                tracing::warn!("{}", finding);
                findings.push(finding);
                continue;
            }
        };

        match data.add_node(parent, child, value, rule.kind) {
            Ok(id) => {
                let path = data.path(id);
                tracing::debug!(path = %path, kind = %rule.kind, "added default node");
                summary.created.push(path);
                applied = true;
            }
            Err(err) => {
                let finding = Finding::new(
                    Pass::Defaults,
                    FindingKind::MalformedRule,
                    &rule.nodepath,
                    format!("cannot add node: {}", err),
                );
                tracing::warn!("{}", finding);
                findings.push(finding);
            }
        }
    }

    if applied {
        summary.rules_applied += 1;
    }
}

fn compute_value(
    data: &Tree,
    parent: NodeId,
    rule: &DefaultRule,
    registry: &HelperRegistry,
) -> std::result::Result<String, Finding> {
    let reference = match &rule.source {
        ValueSource::Literal(value) => return Ok(value.clone()),
        ValueSource::Helper(reference) => reference,
    };

    invoke::resolve(reference, registry)
        .and_then(|helper| invoke::call_default_setter(&helper, data.node(parent)))
        .map_err(|err| {
            let kind = match err {
                HelperError::Missing { .. } => FindingKind::MissingHelper,
                _ => FindingKind::HelperFailed,
            };
            Finding::new(
                Pass::Defaults,
                kind,
                &rule.nodepath,
                format!("default-setter for parent '{}': {}", data.path(parent), err),
            )
            .with_helper(reference.as_str())
        })
}
