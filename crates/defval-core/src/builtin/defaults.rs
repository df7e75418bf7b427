//! Built-in default-setter methods
//!
//! Each method receives the parent under which the new node will be created.

use std::sync::Arc;

use super::DEFAULTS_CLASS;
use crate::error::HelperError;
use crate::helper::{Helper, HelperValue};
use crate::tree::NodeRef;

pub const METHODS: &[&str] = &[
    "parent_name",
    "node_path",
    "child_count",
    "temp_dir",
    "enabled",
    "disabled",
];

/// Default-setter plugin backing `builtin_defaults`
#[derive(Debug, Default)]
pub struct Defaults;

pub(super) fn create() -> Result<Arc<dyn Helper>, String> {
    Ok(Arc::new(Defaults))
}

impl Helper for Defaults {
    fn class_id(&self) -> &str {
        DEFAULTS_CLASS
    }

    fn has_method(&self, method: &str) -> bool {
        METHODS.contains(&method)
    }

    fn call(&self, method: &str, parent: NodeRef<'_>) -> Result<HelperValue, HelperError> {
        match method {
            "parent_name" => {
                if parent.is_document() {
                    return Err(HelperError::failed("the document node has no name"));
                }
                Ok(parent.name().into())
            }
            "node_path" => Ok(parent.path().into()),
            "child_count" => Ok(HelperValue::Integer(parent.children().count() as i64)),
            "temp_dir" => Ok(std::env::temp_dir().display().to_string().into()),
            "enabled" => Ok(true.into()),
            "disabled" => Ok(false.into()),
            other => Err(HelperError::UnknownMethod {
                class_id: DEFAULTS_CLASS.to_string(),
                method: other.to_string(),
            }),
        }
    }
}
