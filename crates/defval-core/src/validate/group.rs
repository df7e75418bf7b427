//! `validate group=` rules

use super::{Checker, PassSummary};
use crate::rules::GroupRule;
use crate::tree::Tree;

/// Run each rule's validator over the nodes at all of its nodepaths
///
/// A nodepath matching nothing is fine.
pub fn run(data: &Tree, rules: &[GroupRule], mut checker: Checker<'_>) -> PassSummary {
    for rule in rules {
        checker.rule_seen();
        tracing::debug!(reference = %rule.validator_ref, "processing group");

        for nodepath in &rule.nodepaths {
            let nodes = data.find(nodepath);
            if nodes.is_empty() {
                tracing::debug!(nodepath = %nodepath, "no matching nodes");
                continue;
            }
            for node in nodes {
                checker.check(&rule.validator_ref, data.node(node));
            }
        }
    }

    checker.finish()
}
