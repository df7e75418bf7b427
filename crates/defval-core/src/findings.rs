//! Per-rule and per-node failure records
//!
//! Neither pass stops at the first problem. Every failure is captured as a
//! [`Finding`] tagged with the pass that produced it, and the pass decides at
//! the end whether the collected findings turn into a batch error.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::rules::MalformedRule;

/// The pass or sub-pass a finding belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    /// Default injection
    Defaults,
    /// `validate nodepath=` rules
    Singles,
    /// `validate group=` rules
    Group,
    /// `validate exclude=` rules
    Exclude,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pass::Defaults => write!(f, "defaults"),
            Pass::Singles => write!(f, "singles"),
            Pass::Group => write!(f, "group"),
            Pass::Exclude => write!(f, "exclude"),
        }
    }
}

/// What went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// A rule's parent node is absent and the policy does not excuse it
    MissingParent,
    /// A rule's target node is absent under a present parent
    MissingNode,
    /// Ancestor creation hit an ambiguous level
    NonDeterministicPath,
    /// The rule itself is malformed
    MalformedRule,
    /// The referenced helper is not bound
    MissingHelper,
    /// The helper method failed or returned an unusable value
    HelperFailed,
    /// A validator rejected the node's content
    InvalidContent,
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FindingKind::MissingParent => write!(f, "missing_parent"),
            FindingKind::MissingNode => write!(f, "missing_node"),
            FindingKind::NonDeterministicPath => write!(f, "non_deterministic_path"),
            FindingKind::MalformedRule => write!(f, "malformed_rule"),
            FindingKind::MissingHelper => write!(f, "missing_helper"),
            FindingKind::HelperFailed => write!(f, "helper_failed"),
            FindingKind::InvalidContent => write!(f, "invalid_content"),
        }
    }
}

/// A single recorded failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Pass that produced the finding
    pub pass: Pass,
    /// Failure category
    pub kind: FindingKind,
    /// Rule nodepath, or canonical node path for per-node findings
    pub nodepath: String,
    /// Human-readable description
    pub message: String,
    /// Helper ref involved, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub helper: Option<String>,
    /// Node content involved, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Finding {
    pub fn new(
        pass: Pass,
        kind: FindingKind,
        nodepath: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            pass,
            kind,
            nodepath: nodepath.into(),
            message: message.into(),
            helper: None,
            value: None,
        }
    }

    /// Record a rule that could not be read from the rule document
    pub fn malformed(pass: Pass, rule: &MalformedRule) -> Self {
        Self::new(
            pass,
            FindingKind::MalformedRule,
            rule.nodepath.clone().unwrap_or_else(|| rule.path.clone()),
            rule.message.clone(),
        )
    }

    pub fn with_helper(mut self, reference: impl Into<String>) -> Self {
        self.helper = Some(reference.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} at '{}': {}",
            self.pass, self.kind, self.nodepath, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finding_display() {
        let finding = Finding::new(
            Pass::Group,
            FindingKind::InvalidContent,
            "/distro/name",
            "content \"x\" did not validate",
        )
        .with_helper("is_bool");
        let display = finding.to_string();
        assert!(display.contains("[group]"));
        assert!(display.contains("invalid_content"));
        assert!(display.contains("/distro/name"));
        assert_eq!(finding.helper.as_deref(), Some("is_bool"));
    }

    #[test]
    fn test_finding_serializes_without_empty_options() {
        let finding = Finding::new(Pass::Defaults, FindingKind::MissingParent, "a/b", "missing");
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["pass"], "defaults");
        assert_eq!(json["kind"], "missing_parent");
        assert!(json.get("helper").is_none());
    }

    #[test]
    fn test_pass_ordering_matches_execution_order() {
        assert!(Pass::Defaults < Pass::Singles);
        assert!(Pass::Singles < Pass::Group);
        assert!(Pass::Group < Pass::Exclude);
    }
}
