//! Conversion between serde document values and [`Tree`]s
//!
//! Documents arrive already parsed (YAML, JSON or TOML deserialized into a
//! `serde_json::Value`). The mapping is:
//!
//! - a mapping key names a child element;
//! - a key starting with `@` names an attribute of the enclosing element;
//! - the key `#text` holds the enclosing element's text value;
//! - a sequence repeats the element once per item;
//! - scalars become text (`null` becomes the empty string).

use serde_json::{Map, Value};

use super::{NodeId, Tree};
use crate::error::TreeError;

/// Key prefix marking an attribute
pub const ATTRIBUTE_PREFIX: char = '@';

/// Key holding an element's own text
pub const TEXT_KEY: &str = "#text";

impl Tree {
    /// Build a tree from a document value
    ///
    /// The top-level value must be a mapping; each of its keys becomes a
    /// top-level element.
    pub fn from_value(value: &Value) -> Result<Self, TreeError> {
        let map = value.as_object().ok_or_else(|| {
            TreeError::InvalidDocument("top-level document must be a mapping".to_string())
        })?;

        let mut tree = Tree::new();
        for (name, child) in map {
            if name.starts_with(ATTRIBUTE_PREFIX) || name == TEXT_KEY {
                return Err(TreeError::InvalidDocument(format!(
                    "top-level key '{}' must name an element",
                    name
                )));
            }
            tree.insert_value(Tree::DOCUMENT, name, child)?;
        }
        Ok(tree)
    }

    /// Render the tree back into a document value
    pub fn to_value(&self) -> Value {
        Value::Object(self.children_to_map(Tree::DOCUMENT))
    }

    fn insert_value(&mut self, parent: NodeId, name: &str, value: &Value) -> Result<(), TreeError> {
        match value {
            Value::Array(items) => {
                for item in items {
                    if item.is_array() {
                        return Err(TreeError::InvalidDocument(format!(
                            "nested sequence under '{}'",
                            name
                        )));
                    }
                    self.insert_value(parent, name, item)?;
                }
            }
            Value::Object(map) => {
                let element = self.add_element(parent, name, "")?;
                for (key, child) in map {
                    if let Some(attribute) = key.strip_prefix(ATTRIBUTE_PREFIX) {
                        let text = scalar_text(child).ok_or_else(|| {
                            TreeError::InvalidDocument(format!(
                                "attribute '{}' of '{}' must be a scalar",
                                attribute,
                                self.path(element)
                            ))
                        })?;
                        self.add_attribute(element, attribute, text)?;
                    } else if key == TEXT_KEY {
                        let text = scalar_text(child).ok_or_else(|| {
                            TreeError::InvalidDocument(format!(
                                "text of '{}' must be a scalar",
                                self.path(element)
                            ))
                        })?;
                        self.set_value(element, text);
                    } else {
                        self.insert_value(element, key, child)?;
                    }
                }
            }
            scalar => {
                let text = scalar_text(scalar).unwrap_or_default();
                self.add_element(parent, name, text)?;
            }
        }
        Ok(())
    }

    fn children_to_map(&self, id: NodeId) -> Map<String, Value> {
        let mut map = Map::new();
        for child in self.node(id).children() {
            let rendered = self.element_to_value(child.id());
            match map.get_mut(child.name()) {
                Some(Value::Array(items)) => items.push(rendered),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, rendered]);
                }
                None => {
                    map.insert(child.name().to_string(), rendered);
                }
            }
        }
        map
    }

    fn element_to_value(&self, id: NodeId) -> Value {
        let node = self.node(id);
        let attributes = node.attributes();
        let has_children = node.children().next().is_some();

        if attributes.is_empty() && !has_children {
            return Value::String(node.value().to_string());
        }

        let mut map = Map::new();
        for (name, value) in attributes {
            map.insert(format!("{}{}", ATTRIBUTE_PREFIX, name), Value::String(value));
        }
        if !node.value().is_empty() {
            map.insert(TEXT_KEY.to_string(), Value::String(node.value().to_string()));
        }
        for (name, value) in self.children_to_map(id) {
            map.insert(name, value);
        }
        Value::Object(map)
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => None,
    }
}
