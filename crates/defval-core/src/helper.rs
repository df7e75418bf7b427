//! Plugin capability contract and the startup plugin catalog
//!
//! A helper is a plugin instance exposing named methods that take one node.
//! Default-setters return a value for a new node; validators return a
//! boolean-like verdict. Plugins are never loaded from code at runtime:
//! a [`PluginCatalog`] maps class identifiers to factories, and the helper
//! registry instantiates each class at most once per build.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::HelperError;
use crate::tree::NodeRef;

/// Value returned by a helper method
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HelperValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl HelperValue {
    /// Interpret the value as a validity verdict
    ///
    /// Booleans map directly, `"true"`/`"false"` text is parsed, integers are
    /// true when non-zero. Anything else has no boolean reading.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HelperValue::Bool(b) => Some(*b),
            HelperValue::Integer(i) => Some(*i != 0),
            HelperValue::Text(text) => match text.trim() {
                t if t.eq_ignore_ascii_case("true") => Some(true),
                t if t.eq_ignore_ascii_case("false") => Some(false),
                _ => None,
            },
            HelperValue::Float(_) => None,
        }
    }
}

/// Booleans render in lowercase to match document conventions
impl fmt::Display for HelperValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HelperValue::Bool(true) => write!(f, "true"),
            HelperValue::Bool(false) => write!(f, "false"),
            HelperValue::Integer(i) => write!(f, "{}", i),
            HelperValue::Float(x) => write!(f, "{}", x),
            HelperValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for HelperValue {
    fn from(value: bool) -> Self {
        HelperValue::Bool(value)
    }
}

impl From<i64> for HelperValue {
    fn from(value: i64) -> Self {
        HelperValue::Integer(value)
    }
}

impl From<f64> for HelperValue {
    fn from(value: f64) -> Self {
        HelperValue::Float(value)
    }
}

impl From<String> for HelperValue {
    fn from(value: String) -> Self {
        HelperValue::Text(value)
    }
}

impl From<&str> for HelperValue {
    fn from(value: &str) -> Self {
        HelperValue::Text(value.to_string())
    }
}

/// Trait implemented by every plugin module
///
/// Implementations must be deterministic with respect to the node they are
/// given and must not assume they are called in any particular order.
pub trait Helper: Send + Sync {
    /// Class identifier this instance was created for
    fn class_id(&self) -> &str;

    /// Whether `method` can be called on this instance
    fn has_method(&self, method: &str) -> bool;

    /// Call `method` with a single node argument
    fn call(&self, method: &str, node: NodeRef<'_>) -> Result<HelperValue, HelperError>;
}

type HelperMethod = Box<dyn Fn(NodeRef<'_>) -> Result<HelperValue, HelperError> + Send + Sync>;

/// Helper assembled from closures, one per method
pub struct FnHelper {
    class_id: String,
    methods: BTreeMap<String, HelperMethod>,
}

impl FnHelper {
    pub fn new(class_id: impl Into<String>) -> Self {
        Self {
            class_id: class_id.into(),
            methods: BTreeMap::new(),
        }
    }

    /// Add a method (builder pattern)
    pub fn with_method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(NodeRef<'_>) -> Result<HelperValue, HelperError> + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Box::new(method));
        self
    }
}

impl fmt::Debug for FnHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHelper")
            .field("class_id", &self.class_id)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Helper for FnHelper {
    fn class_id(&self) -> &str {
        &self.class_id
    }

    fn has_method(&self, method: &str) -> bool {
        self.methods.contains_key(method)
    }

    fn call(&self, method: &str, node: NodeRef<'_>) -> Result<HelperValue, HelperError> {
        let func = self
            .methods
            .get(method)
            .ok_or_else(|| HelperError::UnknownMethod {
                class_id: self.class_id.clone(),
                method: method.to_string(),
            })?;
        func(node)
    }
}

/// Factory producing a fresh plugin instance
pub type HelperFactory = Box<dyn Fn() -> Result<Arc<dyn Helper>, String> + Send + Sync>;

/// Lookup table of plugin factories keyed by class identifier
#[derive(Default)]
pub struct PluginCatalog {
    factories: BTreeMap<String, HelperFactory>,
}

impl fmt::Debug for PluginCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginCatalog")
            .field("classes", &self.class_ids())
            .finish()
    }
}

impl PluginCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog holding the built-in plugin modules
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        crate::builtin::register(&mut catalog);
        catalog
    }

    /// Register an infallible factory (builder pattern)
    pub fn with_helper<F, H>(mut self, class_id: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: Helper + 'static,
    {
        self.register_helper(class_id, factory);
        self
    }

    /// Register an infallible factory
    pub fn register_helper<F, H>(&mut self, class_id: impl Into<String>, factory: F)
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: Helper + 'static,
    {
        self.register_factory(class_id, move || {
            let helper: Arc<dyn Helper> = Arc::new(factory());
            Ok(helper)
        });
    }

    /// Register a factory that may fail to produce an instance
    pub fn register_factory<F>(&mut self, class_id: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Arc<dyn Helper>, String> + Send + Sync + 'static,
    {
        self.factories.insert(class_id.into(), Box::new(factory));
    }

    /// Whether a class identifier is registered
    pub fn contains(&self, class_id: &str) -> bool {
        self.factories.contains_key(class_id)
    }

    /// Registered class identifiers in sorted order
    pub fn class_ids(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Create a new instance of `class_id`
    pub fn instantiate(&self, class_id: &str) -> Result<Arc<dyn Helper>, String> {
        let factory = self
            .factories
            .get(class_id)
            .ok_or_else(|| format!("no plugin registered for class '{}'", class_id))?;
        factory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Tree;

    #[test]
    fn test_boolean_rendering_is_lowercase() {
        assert_eq!(HelperValue::Bool(true).to_string(), "true");
        assert_eq!(HelperValue::Bool(false).to_string(), "false");
        assert_eq!(HelperValue::Integer(42).to_string(), "42");
        assert_eq!(HelperValue::from("/tmp").to_string(), "/tmp");
    }

    #[test]
    fn test_as_bool() {
        assert_eq!(HelperValue::Bool(false).as_bool(), Some(false));
        assert_eq!(HelperValue::from("True").as_bool(), Some(true));
        assert_eq!(HelperValue::Integer(0).as_bool(), Some(false));
        assert_eq!(HelperValue::from("maybe").as_bool(), None);
        assert_eq!(HelperValue::Float(1.0).as_bool(), None);
    }

    #[test]
    fn test_fn_helper_dispatch() {
        let helper = FnHelper::new("checks")
            .with_method("non_empty", |node| Ok((!node.value().is_empty()).into()));
        let tree = Tree::with_root("root");
        let root = tree.node(tree.root_element().unwrap());

        assert!(helper.has_method("non_empty"));
        assert_eq!(helper.call("non_empty", root).unwrap(), HelperValue::Bool(false));
        assert!(matches!(
            helper.call("other", root),
            Err(HelperError::UnknownMethod { .. })
        ));
    }

    #[test]
    fn test_catalog_instantiation() {
        let catalog = PluginCatalog::new().with_helper("checks", || FnHelper::new("checks"));
        assert!(catalog.contains("checks"));
        assert_eq!(catalog.class_ids(), vec!["checks"]);
        assert_eq!(catalog.instantiate("checks").unwrap().class_id(), "checks");
        assert!(catalog.instantiate("missing").is_err());
    }
}
