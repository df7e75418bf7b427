//! Rule-driven default injection and content validation
//!
//! A rule document names helper routines by symbolic ref and describes:
//!
//! - `default` rules: nodes to add to a data tree when they are absent,
//!   with a literal value or one computed by a default-setter helper;
//! - `validate` rules: nodes whose content a validator helper must accept.
//!
//! Helpers are plugin instances created from a [`PluginCatalog`] at startup.
//! The [`DefvalEngine`] runs the default pass and then the validation pass;
//! each pass builds its own [`HelperRegistry`] from the rule document.
//!
//! ```
//! use defval_core::{DefvalEngine, RuleDocument, Tree};
//! use serde_json::json;
//!
//! let rules = RuleDocument::from_value(&json!({
//!     "defval": {
//!         "helpers": {
//!             "validator": { "@ref": "abs", "@module": "builtin_checks.rs", "@method": "is_absolute_path" }
//!         },
//!         "default": { "@nodepath": "distro/build_area", "@type": "element", "@from": "value", "#text": "/export/build" },
//!         "validate": { "@nodepath": "distro/build_area", "#text": "abs" }
//!     }
//! }))
//! .unwrap();
//!
//! let mut data = Tree::from_value(&json!({ "distro": { "@name": "demo" } })).unwrap();
//! let report = DefvalEngine::default().apply(&mut data, &rules).unwrap();
//! assert_eq!(report.defaults.created, vec!["/distro/build_area"]);
//! ```

pub mod builtin;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod findings;
pub mod helper;
pub mod invoke;
pub mod registry;
pub mod rules;
pub mod tree;
pub mod validate;

pub use defaults::{DefaultInjector, InjectionSummary};
pub use engine::{DefvalEngine, RunReport};
pub use error::{DefvalError, HelperError, RegistryError, Result, TreeError};
pub use findings::{Finding, FindingKind, Pass};
pub use helper::{FnHelper, Helper, HelperValue, PluginCatalog};
pub use registry::{HelperBinding, HelperRegistry, DEFAULT_SETTER_SECTION, VALIDATOR_SECTION};
pub use rules::RuleDocument;
pub use tree::{NodeId, NodeKind, NodeRef, Tree};
pub use validate::{ContentValidator, PassSummary, ValidationSummary};
