//! Built-in validator methods
//!
//! Every method inspects the node it is handed and returns a boolean.

use std::sync::Arc;

use regex::Regex;

use super::CHECKS_CLASS;
use crate::error::HelperError;
use crate::helper::{Helper, HelperValue};
use crate::tree::{NodeKind, NodeRef};

/// Method names exposed by [`Checks`]
pub const METHODS: &[&str] = &[
    "is_nonempty",
    "is_bool",
    "is_integer",
    "is_positive_integer",
    "is_absolute_path",
    "is_identifier",
    "is_url",
    "is_leaf",
];

/// Validator plugin backing `builtin_checks`
pub struct Checks {
    identifier: Regex,
    url: Regex,
}

impl Checks {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            identifier: Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$")?,
            url: Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://\S+$")?,
        })
    }
}

pub(super) fn create() -> Result<Arc<dyn Helper>, String> {
    let checks = Checks::new().map_err(|e| e.to_string())?;
    Ok(Arc::new(checks))
}

impl Helper for Checks {
    fn class_id(&self) -> &str {
        CHECKS_CLASS
    }

    fn has_method(&self, method: &str) -> bool {
        METHODS.contains(&method)
    }

    fn call(&self, method: &str, node: NodeRef<'_>) -> Result<HelperValue, HelperError> {
        let text = node.value().trim();
        let verdict = match method {
            "is_nonempty" => !text.is_empty(),
            "is_bool" => {
                text.eq_ignore_ascii_case("true") || text.eq_ignore_ascii_case("false")
            }
            "is_integer" => text.parse::<i64>().is_ok(),
            "is_positive_integer" => text.parse::<i64>().map(|n| n > 0).unwrap_or(false),
            "is_absolute_path" => text.starts_with('/'),
            "is_identifier" => self.identifier.is_match(text),
            "is_url" => self.url.is_match(text),
            "is_leaf" => node.kind() == NodeKind::Attribute || node.children().next().is_none(),
            other => {
                return Err(HelperError::UnknownMethod {
                    class_id: CHECKS_CLASS.to_string(),
                    method: other.to_string(),
                })
            }
        };
        Ok(HelperValue::Bool(verdict))
    }
}
