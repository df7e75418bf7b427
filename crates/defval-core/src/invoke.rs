//! Helper invocation protocol
//!
//! Uniform resolution and calling of helpers for both passes. Validators
//! fail closed: a helper error or a result without a boolean reading counts
//! as invalid content.

use std::sync::Arc;

use crate::error::HelperError;
use crate::helper::{Helper, HelperValue};
use crate::registry::HelperRegistry;
use crate::tree::NodeRef;

/// A helper ref resolved against a registry
#[derive(Clone)]
pub struct ResolvedHelper {
    pub reference: String,
    pub plugin: Arc<dyn Helper>,
    pub method: String,
    pub invert: bool,
}

impl std::fmt::Debug for ResolvedHelper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedHelper")
            .field("reference", &self.reference)
            .field("class_id", &self.plugin.class_id())
            .field("method", &self.method)
            .field("invert", &self.invert)
            .finish()
    }
}

/// Outcome of a validator call
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Valid,
    Invalid,
    /// The helper failed or returned something without a boolean reading
    Errored(HelperError),
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid)
    }
}

/// Resolve `reference` to its plugin, method and invert flag
///
/// A ref with no binding, or bound to a plugin lacking the method, is
/// reported as [`HelperError::Missing`].
pub fn resolve(reference: &str, registry: &HelperRegistry) -> Result<ResolvedHelper, HelperError> {
    let missing = || HelperError::Missing {
        reference: reference.to_string(),
    };

    let binding = registry.binding(reference).ok_or_else(missing)?;
    let plugin = registry.instance(reference).ok_or_else(missing)?;
    if !plugin.has_method(&binding.method) {
        tracing::debug!(
            reference,
            class_id = %binding.class_id,
            method = %binding.method,
            "helper module lacks the bound method"
        );
        return Err(missing());
    }

    Ok(ResolvedHelper {
        reference: reference.to_string(),
        plugin,
        method: binding.method.clone(),
        invert: registry.invert_for(reference),
    })
}

/// Compute a default value from `parent`
///
/// Booleans render as `true`/`false`; everything else in its natural text
/// form.
pub fn call_default_setter(
    helper: &ResolvedHelper,
    parent: NodeRef<'_>,
) -> Result<String, HelperError> {
    let value = helper.plugin.call(&helper.method, parent)?;
    Ok(value.to_string())
}

/// Run a validator against `node`, applying the invert flag
pub fn call_validator(helper: &ResolvedHelper, node: NodeRef<'_>) -> Verdict {
    let outcome = helper
        .plugin
        .call(&helper.method, node)
        .and_then(|value| boolean_reading(&value));

    match outcome {
        Ok(valid) if valid != helper.invert => Verdict::Valid,
        Ok(_) => Verdict::Invalid,
        Err(err) => {
            tracing::warn!(
                reference = %helper.reference,
                node = %node.path(),
                error = %err,
                "validator failed; treating content as invalid"
            );
            Verdict::Errored(err)
        }
    }
}

fn boolean_reading(value: &HelperValue) -> Result<bool, HelperError> {
    value
        .as_bool()
        .ok_or_else(|| HelperError::failed(format!("validator returned non-boolean value '{}'", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::{FnHelper, PluginCatalog};
    use crate::registry::VALIDATOR_SECTION;
    use crate::rules::RuleDocument;
    use crate::tree::Tree;
    use serde_json::json;

    fn registry() -> HelperRegistry {
        let catalog = PluginCatalog::new().with_helper("checks", || {
            FnHelper::new("checks")
                .with_method("yes", |_| Ok(true.into()))
                .with_method("no", |_| Ok(false.into()))
                .with_method("text", |_| Ok("maybe".into()))
                .with_method("boom", |_| Err(HelperError::failed("boom")))
        });
        let doc = RuleDocument::from_value(&json!({
            "defval": { "helpers": { "validator": [
                { "@ref": "yes", "@module": "checks.py", "@method": "yes" },
                { "@ref": "not_yes", "@module": "checks.py", "@method": "yes", "@invert": "true" },
                { "@ref": "not_no", "@module": "checks.py", "@method": "no", "@invert": "1" },
                { "@ref": "text", "@module": "checks.py", "@method": "text" },
                { "@ref": "not_boom", "@module": "checks.py", "@method": "boom", "@invert": "true" },
                { "@ref": "ghost", "@module": "checks.py", "@method": "ghost" }
            ] } }
        }))
        .unwrap();
        HelperRegistry::build(&doc, VALIDATOR_SECTION, &catalog).unwrap()
    }

    fn verdict(reference: &str) -> Verdict {
        let registry = registry();
        let tree = Tree::with_root("root");
        let helper = resolve(reference, &registry).unwrap();
        call_validator(&helper, tree.node(tree.root_element().unwrap()))
    }

    #[test]
    fn test_invert_semantics() {
        assert_eq!(verdict("yes"), Verdict::Valid);
        assert_eq!(verdict("not_yes"), Verdict::Invalid);
        assert_eq!(verdict("not_no"), Verdict::Valid);
    }

    #[test]
    fn test_errors_fail_closed_regardless_of_invert() {
        assert!(matches!(verdict("text"), Verdict::Errored(_)));
        assert!(matches!(verdict("not_boom"), Verdict::Errored(_)));
        assert!(!verdict("not_boom").is_valid());
    }

    #[test]
    fn test_missing_helper() {
        let registry = registry();
        assert!(matches!(
            resolve("unbound", &registry),
            Err(HelperError::Missing { .. })
        ));
        assert!(matches!(
            resolve("ghost", &registry),
            Err(HelperError::Missing { .. })
        ));
    }

    #[test]
    fn test_default_setter_renders_lowercase_booleans() {
        let registry = registry();
        let tree = Tree::with_root("root");
        let helper = resolve("yes", &registry).unwrap();
        let value = call_default_setter(&helper, tree.node(Tree::DOCUMENT)).unwrap();
        assert_eq!(value, "true");
        assert!(!resolve("yes", &registry).unwrap().invert);
    }
}
