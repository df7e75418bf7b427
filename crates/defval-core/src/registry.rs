//! Helper registry
//!
//! Maps symbolic helper refs declared in one section of the rule document to
//! plugin instances. A registry is built fresh for each pass and discarded
//! afterwards.
//!
//! Refs naming the same plugin module share one instance: the first
//! declaration of a class identifier calls the catalog factory, later ones
//! reuse the cached instance.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::RegistryError;
use crate::helper::{Helper, PluginCatalog};
use crate::rules::{attr, RuleDocument};
use crate::tree::NodeRef;

/// Section holding default-setter declarations
pub const DEFAULT_SETTER_SECTION: &str = "helpers/deflt_setter";

/// Section holding validator declarations
pub const VALIDATOR_SECTION: &str = "helpers/validator";

/// Invert value assumed when a declaration does not set one
pub const DEFAULT_INVERT: bool = false;

/// Recognized module-file suffixes, stripped to form the class identifier
pub const MODULE_SUFFIXES: &[&str] = &[".py", ".rs"];

/// One helper declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HelperBinding {
    /// Symbolic ref used by rules
    #[serde(rename = "ref")]
    pub reference: String,
    /// Module specifier as declared
    pub module: String,
    /// Class identifier derived from the module specifier
    pub class_id: String,
    pub method: String,
    pub invert: bool,
}

/// Registry of helper bindings and shared plugin instances
pub struct HelperRegistry {
    section: String,
    bindings: Vec<HelperBinding>,
    by_ref: HashMap<String, usize>,
    instances: HashMap<String, Arc<dyn Helper>>,
    inverts: Option<HashMap<String, bool>>,
}

impl fmt::Debug for HelperRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HelperRegistry")
            .field("section", &self.section)
            .field("refs", &self.refs())
            .field("instances", &self.instances.len())
            .field("has_inverts", &self.has_inverts())
            .finish()
    }
}

impl HelperRegistry {
    /// Create a registry with no bindings
    pub fn empty(section: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            bindings: Vec::new(),
            by_ref: HashMap::new(),
            instances: HashMap::new(),
            inverts: None,
        }
    }

    /// Build a registry from the declarations under `section`
    ///
    /// An absent section yields an empty registry. Any structural defect in
    /// a declaration aborts the whole build.
    pub fn build(
        rules: &RuleDocument,
        section: &str,
        catalog: &PluginCatalog,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::empty(section);
        let mut inverts = HashMap::new();

        for declaration in rules.section(section) {
            let binding = read_binding(declaration)?;

            if registry.by_ref.contains_key(&binding.reference) {
                return Err(RegistryError::DuplicateRef {
                    section: section.to_string(),
                    reference: binding.reference,
                });
            }

            if !registry.instances.contains_key(&binding.class_id) {
                let instance =
                    catalog
                        .instantiate(&binding.class_id)
                        .map_err(|reason| RegistryError::Load {
                            class_id: binding.class_id.clone(),
                            reason,
                        })?;
                tracing::debug!(
                    class_id = %binding.class_id,
                    section,
                    "instantiated helper module"
                );
                registry
                    .instances
                    .insert(binding.class_id.clone(), instance);
            }

            inverts.insert(binding.reference.clone(), binding.invert);
            registry
                .by_ref
                .insert(binding.reference.clone(), registry.bindings.len());
            registry.bindings.push(binding);
        }

        if inverts.values().any(|invert| *invert != DEFAULT_INVERT) {
            registry.inverts = Some(inverts);
        }

        tracing::debug!(
            section,
            refs = registry.len(),
            instances = registry.instance_count(),
            "built helper registry"
        );
        Ok(registry)
    }

    /// Section this registry was built from
    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn binding(&self, reference: &str) -> Option<&HelperBinding> {
        self.by_ref.get(reference).map(|index| &self.bindings[*index])
    }

    /// Shared plugin instance bound to `reference`
    pub fn instance(&self, reference: &str) -> Option<Arc<dyn Helper>> {
        let binding = self.binding(reference)?;
        self.instances.get(&binding.class_id).cloned()
    }

    /// Invert flag for `reference`; false when no invert map exists
    pub fn invert_for(&self, reference: &str) -> bool {
        self.inverts
            .as_ref()
            .and_then(|inverts| inverts.get(reference))
            .copied()
            .unwrap_or(DEFAULT_INVERT)
    }

    /// Whether an invert map was kept
    pub fn has_inverts(&self) -> bool {
        self.inverts.is_some()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bound refs in declaration order
    pub fn refs(&self) -> Vec<&str> {
        self.bindings.iter().map(|b| b.reference.as_str()).collect()
    }

    /// Number of distinct plugin instances
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Bindings in declaration order
    pub fn bindings(&self) -> &[HelperBinding] {
        &self.bindings
    }
}

fn read_binding(node: NodeRef<'_>) -> Result<HelperBinding, RegistryError> {
    let require = |name: &str| {
        node.attribute(name)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| RegistryError::MissingAttribute {
                path: node.path(),
                attribute: name.to_string(),
            })
    };

    let reference = require(attr::REF)?.to_string();
    let module = require(attr::MODULE)?.to_string();
    let method = require(attr::METHOD)?.to_string();

    let class_id = class_id_for(&module).ok_or_else(|| RegistryError::InvalidModuleName {
        reference: reference.clone(),
        specifier: module.clone(),
    })?;

    let invert = match node.attribute(attr::INVERT) {
        Some(text) => parse_invert(text).ok_or_else(|| RegistryError::InvalidInvert {
            reference: reference.clone(),
            value: text.to_string(),
        })?,
        None => DEFAULT_INVERT,
    };

    Ok(HelperBinding {
        reference,
        module,
        class_id,
        method,
        invert,
    })
}

/// Derive the class identifier from a module specifier
///
/// Returns `None` when the specifier lacks a recognized suffix or is only a
/// suffix.
pub fn class_id_for(specifier: &str) -> Option<String> {
    MODULE_SUFFIXES
        .iter()
        .find_map(|suffix| specifier.strip_suffix(suffix))
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
}

fn parse_invert(text: &str) -> Option<bool> {
    match text.trim() {
        "1" => Some(true),
        "0" => Some(false),
        t if t.eq_ignore_ascii_case("true") => Some(true),
        t if t.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::FnHelper;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn rules(validators: Value) -> RuleDocument {
        RuleDocument::from_value(&json!({
            "defval": { "helpers": { "validator": validators } }
        }))
        .unwrap()
    }

    fn counting_catalog(calls: Arc<AtomicUsize>) -> PluginCatalog {
        PluginCatalog::new().with_helper("checks", move || {
            calls.fetch_add(1, Ordering::SeqCst);
            FnHelper::new("checks")
        })
    }

    #[test]
    fn test_class_id_for() {
        assert_eq!(class_id_for("checks.py").as_deref(), Some("checks"));
        assert_eq!(class_id_for("checks.rs").as_deref(), Some("checks"));
        assert_eq!(class_id_for("checks"), None);
        assert_eq!(class_id_for(".py"), None);
    }

    #[test]
    fn test_absent_section_is_empty() {
        let doc = RuleDocument::from_value(&json!({ "defval": {} })).unwrap();
        let registry = HelperRegistry::build(&doc, VALIDATOR_SECTION, &PluginCatalog::new()).unwrap();
        assert!(registry.is_empty());
        assert!(!registry.has_inverts());
    }

    #[test]
    fn test_refs_share_one_instance() {
        let calls = Arc::new(AtomicUsize::new(0));
        let doc = rules(json!([
            { "@ref": "a", "@module": "checks.py", "@method": "m1" },
            { "@ref": "b", "@module": "checks.rs", "@method": "m2" }
        ]));
        let registry =
            HelperRegistry::build(&doc, VALIDATOR_SECTION, &counting_catalog(calls.clone())).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.instance_count(), 1);
        let a = registry.instance("a").unwrap();
        let b = registry.instance("b").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.refs(), vec!["a", "b"]);
    }

    #[test]
    fn test_duplicate_ref_rejected() {
        let doc = rules(json!([
            { "@ref": "a", "@module": "checks.py", "@method": "m1" },
            { "@ref": "a", "@module": "checks.py", "@method": "m2" }
        ]));
        let calls = Arc::new(AtomicUsize::new(0));
        let err = HelperRegistry::build(&doc, VALIDATOR_SECTION, &counting_catalog(calls))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateRef { ref reference, .. } if reference == "a"));
    }

    #[test]
    fn test_invalid_module_and_load_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let catalog = counting_catalog(calls);

        let doc = rules(json!({ "@ref": "a", "@module": "checks.txt", "@method": "m" }));
        assert!(matches!(
            HelperRegistry::build(&doc, VALIDATOR_SECTION, &catalog),
            Err(RegistryError::InvalidModuleName { .. })
        ));

        let doc = rules(json!({ "@ref": "a", "@module": "unknown.py", "@method": "m" }));
        assert!(matches!(
            HelperRegistry::build(&doc, VALIDATOR_SECTION, &catalog),
            Err(RegistryError::Load { ref class_id, .. }) if class_id == "unknown"
        ));

        let doc = rules(json!({ "@ref": "a", "@module": "checks.py" }));
        assert!(matches!(
            HelperRegistry::build(&doc, VALIDATOR_SECTION, &catalog),
            Err(RegistryError::MissingAttribute { ref attribute, .. }) if attribute == "method"
        ));
    }

    #[test]
    fn test_factory_failure_aborts_build() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut catalog = counting_catalog(calls.clone());
        catalog.register_factory("broken", || Err("license file missing".to_string()));

        let doc = rules(json!([
            { "@ref": "a", "@module": "checks.py", "@method": "m" },
            { "@ref": "b", "@module": "broken.py", "@method": "m" },
            { "@ref": "c", "@module": "checks.py", "@method": "m" }
        ]));
        let err = HelperRegistry::build(&doc, VALIDATOR_SECTION, &catalog).unwrap_err();
        match err {
            RegistryError::Load { class_id, reason } => {
                assert_eq!(class_id, "broken");
                assert_eq!(reason, "license file missing");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_invert_map_dropped_when_all_default() {
        let calls = Arc::new(AtomicUsize::new(0));
        let catalog = counting_catalog(calls);

        let doc = rules(json!([
            { "@ref": "a", "@module": "checks.py", "@method": "m", "@invert": "False" },
            { "@ref": "b", "@module": "checks.py", "@method": "m" }
        ]));
        let registry = HelperRegistry::build(&doc, VALIDATOR_SECTION, &catalog).unwrap();
        assert!(!registry.has_inverts());
        assert!(!registry.invert_for("a"));

        let doc = rules(json!([
            { "@ref": "a", "@module": "checks.py", "@method": "m", "@invert": "true" },
            { "@ref": "b", "@module": "checks.py", "@method": "m" }
        ]));
        let registry = HelperRegistry::build(&doc, VALIDATOR_SECTION, &catalog).unwrap();
        assert!(registry.has_inverts());
        assert!(registry.invert_for("a"));
        assert!(!registry.invert_for("b"));
        assert!(!registry.invert_for("unbound"));
    }

    #[test]
    fn test_invalid_invert_value() {
        let calls = Arc::new(AtomicUsize::new(0));
        let doc = rules(json!({ "@ref": "a", "@module": "checks.py", "@method": "m", "@invert": "sometimes" }));
        assert!(matches!(
            HelperRegistry::build(&doc, VALIDATOR_SECTION, &counting_catalog(calls)),
            Err(RegistryError::InvalidInvert { .. })
        ));
    }
}
