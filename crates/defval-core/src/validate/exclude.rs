//! `validate exclude=` rules

use super::{Checker, PassSummary};
use crate::rules::ExcludeRule;
use crate::tree::Tree;

/// Run each rule's validator over every node not excluded by canonical path
///
/// Exclusion is exact string equality with the node's canonical path, so an
/// excluded element does not shield its descendants. Each rule walks the
/// whole tree once.
pub fn run(data: &Tree, rules: &[ExcludeRule], mut checker: Checker<'_>) -> PassSummary {
    for rule in rules {
        checker.rule_seen();
        tracing::debug!(reference = %rule.validator_ref, "processing unexcluded nodes");

        for node in data.walk() {
            let path = node.path();
            if rule.excluded_nodepaths.iter().any(|excluded| *excluded == path) {
                tracing::debug!(path = %path, "excluded from validation");
                continue;
            }
            checker.check(&rule.validator_ref, node);
        }
    }

    checker.finish()
}
