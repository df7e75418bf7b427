//! `validate nodepath=` rules

use super::{Checker, PassSummary};
use crate::findings::{Finding, FindingKind};
use crate::rules::{MissingPolicy, SinglesRule};
use crate::tree::Tree;

/// Validate each rule's nodes with every listed validator
///
/// Every parent matching the rule's parent path must hold at least one
/// matching child unless `missing = ok`. An absent parent is excused by
/// both `ok` and `ok_if_no_parent`.
pub fn run(data: &Tree, rules: &[SinglesRule], mut checker: Checker<'_>) -> PassSummary {
    for rule in rules {
        checker.rule_seen();
        tracing::debug!(nodepath = %rule.nodepath, "validating node(s)");

        if let Some(guard) = &rule.skip_if_no_exist {
            if data.find(guard).is_empty() {
                tracing::debug!(nodepath = %rule.nodepath, guard = %guard, "guard node absent; skipping rule");
                continue;
            }
        }

        let (parent_path, child) = rule.split();
        let parents = data.find(parent_path);

        if parents.is_empty() {
            match &rule.missing {
                MissingPolicy::Error => checker.record(Finding::new(
                    checker.pass(),
                    FindingKind::MissingParent,
                    &rule.nodepath,
                    format!("parent for node at nodepath {} does not exist", rule.nodepath),
                )),
                MissingPolicy::Ok | MissingPolicy::OkIfNoParent => {
                    tracing::debug!(nodepath = %rule.nodepath, "parent absent; allowed by policy");
                }
                MissingPolicy::Unrecognized(policy) => checker.record(Finding::new(
                    checker.pass(),
                    FindingKind::MalformedRule,
                    &rule.nodepath,
                    format!("invalid \"missing\" attribute '{}'", policy),
                )),
            }
            continue;
        }

        for parent in parents {
            let nodes = data.find_under(parent, child);
            if nodes.is_empty() {
                if rule.missing != MissingPolicy::Ok {
                    checker.record(Finding::new(
                        checker.pass(),
                        FindingKind::MissingNode,
                        &rule.nodepath,
                        format!(
                            "node with nodepath {} does not exist under {}",
                            rule.nodepath,
                            data.path(parent)
                        ),
                    ));
                }
                continue;
            }

            for node in nodes {
                for reference in &rule.validator_refs {
                    checker.check(reference, data.node(node));
                }
            }
        }
    }

    checker.finish()
}

#[cfg(test)]
mod tests {
    use super::super::tests::{catalog, data, rules};
    use super::super::ContentValidator;
    use crate::error::DefvalError;
    use crate::findings::{FindingKind, Pass};
    use crate::tree::Tree;
    use serde_json::json;

    fn singles_findings(validate: serde_json::Value) -> Vec<FindingKind> {
        let catalog = catalog();
        match ContentValidator::new(&catalog).validate(&data(), &rules(validate)) {
            Ok(_) => Vec::new(),
            Err(DefvalError::BatchValidation { findings, .. }) => {
                assert!(findings.iter().all(|f| f.pass == Pass::Singles));
                findings.into_iter().map(|f| f.kind).collect()
            }
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_every_ref_runs_on_every_node() {
        let catalog = catalog();
        let data = Tree::from_value(&json!({ "distro": { "img_params": { "pkg": ["a", "b"] } } }))
            .unwrap();
        let summary = ContentValidator::new(&catalog)
            .validate(
                &data,
                &rules(json!({ "@nodepath": "distro/img_params/pkg", "#text": "always, not_numeric" })),
            )
            .unwrap();
        assert_eq!(summary.singles.rules, 1);
        assert_eq!(summary.singles.checks, 4);
    }

    #[test]
    fn test_failures_do_not_stop_the_pass() {
        let kinds = singles_findings(json!([
            { "@nodepath": "distro/img_params/pkg", "#text": "nonempty, numeric" },
            { "@nodepath": "distro/img_params/size", "#text": "boom, unbound" }
        ]));
        assert_eq!(
            kinds,
            vec![
                FindingKind::InvalidContent,
                FindingKind::InvalidContent,
                FindingKind::HelperFailed,
                FindingKind::MissingHelper,
            ]
        );
    }

    #[test]
    fn test_missing_parent_policies() {
        let kinds = singles_findings(json!([
            { "@nodepath": "distro/nowhere/x", "#text": "always" },
            { "@nodepath": "distro/nowhere/x", "@missing": "ok", "#text": "always" },
            { "@nodepath": "distro/nowhere/x", "@missing": "ok_if_no_parent", "#text": "always" },
            { "@nodepath": "distro/nowhere/x", "@missing": "perhaps", "#text": "always" }
        ]));
        assert_eq!(kinds, vec![FindingKind::MissingParent, FindingKind::MalformedRule]);
    }

    #[test]
    fn test_ok_if_no_parent_is_strict_when_parent_present() {
        let kinds = singles_findings(json!([
            { "@nodepath": "distro/img_params/absent", "@missing": "ok_if_no_parent", "#text": "always" },
            { "@nodepath": "distro/img_params/absent", "@missing": "ok", "#text": "always" },
            { "@nodepath": "distro/img_params/absent", "#text": "always" }
        ]));
        assert_eq!(kinds, vec![FindingKind::MissingNode, FindingKind::MissingNode]);
    }

    #[test]
    fn test_attribute_targets_and_guard() {
        let kinds = singles_findings(json!([
            { "@nodepath": "distro/name", "#text": "nonempty" },
            { "@nodepath": "distro/img_params/absent", "@skip_if_no_exist": "distro/other", "#text": "always" }
        ]));
        assert!(kinds.is_empty());
    }
}
