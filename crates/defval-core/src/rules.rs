//! Typed rules extracted from the rule document
//!
//! The rule document is itself a [`Tree`]. Its sections are addressed
//! relative to the top-level element, so the element's own name does not
//! matter. Rule nodes are turned into tagged data here; the passes never
//! inspect rule nodes directly.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::error::TreeError;
use crate::tree::{NodeId, NodeKind, NodeRef, Tree};

/// Attribute names read from the rule document
pub mod attr {
    pub const REF: &str = "ref";
    pub const MODULE: &str = "module";
    pub const METHOD: &str = "method";
    pub const INVERT: &str = "invert";
    pub const NODEPATH: &str = "nodepath";
    pub const TYPE: &str = "type";
    pub const FROM: &str = "from";
    pub const MISSING_PARENT: &str = "missing_parent";
    pub const SKIP_IF_NO_EXIST: &str = "skip_if_no_exist";
    pub const MISSING: &str = "missing";
    pub const GROUP: &str = "group";
    pub const EXCLUDE: &str = "exclude";
}

/// Element name of default rules
pub const DEFAULT_ELEMENT: &str = "default";

/// Element name of validation rules
pub const VALIDATE_ELEMENT: &str = "validate";

/// A rule node that could not be turned into a rule
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed rule at '{path}': {message}")]
pub struct MalformedRule {
    /// Canonical path of the rule node in the rule document
    pub path: String,
    /// Target nodepath, when the rule declared one
    pub nodepath: Option<String>,
    pub message: String,
}

impl MalformedRule {
    fn new(node: NodeRef<'_>, message: impl Into<String>) -> Self {
        Self {
            path: node.path(),
            nodepath: node.attribute(attr::NODEPATH).map(str::to_string),
            message: message.into(),
        }
    }
}

/// Where a default value comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// The rule's own text, used verbatim
    Literal(String),
    /// A default-setter ref
    Helper(String),
}

/// What to do when a default rule's parent is absent
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MissingParentPolicy {
    /// Materialize the ancestor chain
    Create,
    /// Skip the rule silently
    Skip,
    /// Record an error
    #[default]
    Error,
    /// Value not understood; reported when the policy is consulted
    Unrecognized(String),
}

impl MissingParentPolicy {
    pub fn parse(text: &str) -> Self {
        match text {
            "create" => MissingParentPolicy::Create,
            "skip" => MissingParentPolicy::Skip,
            "error" => MissingParentPolicy::Error,
            other => MissingParentPolicy::Unrecognized(other.to_string()),
        }
    }
}

/// What to do when a singles rule's target is absent
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MissingPolicy {
    /// Absence is an error
    #[default]
    Error,
    /// Absence is always acceptable
    Ok,
    /// Absence is acceptable only when the parent is absent too
    OkIfNoParent,
    /// Value not understood; treated as an error
    Unrecognized(String),
}

impl MissingPolicy {
    pub fn parse(text: &str) -> Self {
        match text {
            "error" => MissingPolicy::Error,
            "ok" => MissingPolicy::Ok,
            "ok_if_no_parent" => MissingPolicy::OkIfNoParent,
            other => MissingPolicy::Unrecognized(other.to_string()),
        }
    }
}

impl fmt::Display for MissingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingPolicy::Error => write!(f, "error"),
            MissingPolicy::Ok => write!(f, "ok"),
            MissingPolicy::OkIfNoParent => write!(f, "ok_if_no_parent"),
            MissingPolicy::Unrecognized(other) => write!(f, "{}", other),
        }
    }
}

/// A `default` rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultRule {
    pub nodepath: String,
    pub kind: NodeKind,
    pub source: ValueSource,
    pub missing_parent: MissingParentPolicy,
    pub skip_if_no_exist: Option<String>,
}

impl DefaultRule {
    /// Read a `default` rule node
    pub fn from_node(node: NodeRef<'_>) -> Result<Self, MalformedRule> {
        let nodepath = required(node, attr::NODEPATH)?;
        if split_nodepath(nodepath).1.is_empty() {
            return Err(MalformedRule::new(
                node,
                format!("nodepath '{}' does not name a node", nodepath),
            ));
        }

        let kind = match required(node, attr::TYPE)? {
            "element" => NodeKind::Element,
            "attribute" => NodeKind::Attribute,
            other => {
                return Err(MalformedRule::new(
                    node,
                    format!("invalid \"type\" attribute '{}'", other),
                ))
            }
        };

        let source = match required(node, attr::FROM)? {
            "value" => ValueSource::Literal(node.value().to_string()),
            "helper" => ValueSource::Helper(node.value().trim().to_string()),
            other => {
                return Err(MalformedRule::new(
                    node,
                    format!("invalid \"from\" attribute '{}'", other),
                ))
            }
        };

        Ok(Self {
            nodepath: nodepath.to_string(),
            kind,
            source,
            missing_parent: node
                .attribute(attr::MISSING_PARENT)
                .map(MissingParentPolicy::parse)
                .unwrap_or_default(),
            skip_if_no_exist: optional(node, attr::SKIP_IF_NO_EXIST),
        })
    }

    /// Parent nodepath and final segment
    pub fn split(&self) -> (&str, &str) {
        split_nodepath(&self.nodepath)
    }
}

/// A `validate nodepath=` rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinglesRule {
    pub nodepath: String,
    pub validator_refs: Vec<String>,
    pub missing: MissingPolicy,
    pub skip_if_no_exist: Option<String>,
}

impl SinglesRule {
    pub fn split(&self) -> (&str, &str) {
        split_nodepath(&self.nodepath)
    }
}

/// A `validate group=` rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRule {
    pub validator_ref: String,
    pub nodepaths: Vec<String>,
}

/// A `validate exclude=` rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludeRule {
    pub validator_ref: String,
    pub excluded_nodepaths: Vec<String>,
}

/// A classified `validate` rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidateRule {
    Singles(SinglesRule),
    Group(GroupRule),
    Exclude(ExcludeRule),
}

impl ValidateRule {
    /// Classify a `validate` node by its selector attribute
    ///
    /// Selectors are checked in the order `nodepath`, `group`, `exclude`.
    /// Returns `None` when the node carries none of them.
    pub fn classify(node: NodeRef<'_>) -> Option<Self> {
        if let Some(nodepath) = node.attribute(attr::NODEPATH) {
            return Some(ValidateRule::Singles(SinglesRule {
                nodepath: nodepath.to_string(),
                validator_refs: split_list(node.value()),
                missing: node
                    .attribute(attr::MISSING)
                    .map(MissingPolicy::parse)
                    .unwrap_or_default(),
                skip_if_no_exist: optional(node, attr::SKIP_IF_NO_EXIST),
            }));
        }

        if let Some(reference) = node.attribute(attr::GROUP) {
            return Some(ValidateRule::Group(GroupRule {
                validator_ref: reference.trim().to_string(),
                nodepaths: split_list(node.value()),
            }));
        }

        if let Some(reference) = node.attribute(attr::EXCLUDE) {
            return Some(ValidateRule::Exclude(ExcludeRule {
                validator_ref: reference.trim().to_string(),
                excluded_nodepaths: split_list(node.value()),
            }));
        }

        None
    }
}

/// A parsed rule document
#[derive(Debug, Clone)]
pub struct RuleDocument {
    tree: Tree,
    scope: NodeId,
    default_element: String,
    validate_element: String,
}

impl RuleDocument {
    /// Wrap a rule tree; sections resolve under its top-level element
    pub fn new(tree: Tree) -> Self {
        let scope = tree.root_element().unwrap_or(Tree::DOCUMENT);
        Self {
            tree,
            scope,
            default_element: DEFAULT_ELEMENT.to_string(),
            validate_element: VALIDATE_ELEMENT.to_string(),
        }
    }

    /// Use different element names for `default` and `validate` rules
    pub fn with_element_names(
        mut self,
        default_element: impl Into<String>,
        validate_element: impl Into<String>,
    ) -> Self {
        self.default_element = default_element.into();
        self.validate_element = validate_element.into();
        self
    }

    /// Build a rule document from a document value
    pub fn from_value(value: &Value) -> Result<Self, TreeError> {
        Ok(Self::new(Tree::from_value(value)?))
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Nodes matching `nodepath` relative to the top-level element
    pub fn section(&self, nodepath: &str) -> Vec<NodeRef<'_>> {
        self.tree
            .find_under(self.scope, nodepath)
            .into_iter()
            .map(|id| self.tree.node(id))
            .collect()
    }

    /// `default` rule nodes in declaration order
    pub fn default_nodes(&self) -> Vec<NodeRef<'_>> {
        self.section(&self.default_element)
    }

    /// `validate` rule nodes in declaration order
    pub fn validate_nodes(&self) -> Vec<NodeRef<'_>> {
        self.section(&self.validate_element)
    }
}

/// Split a nodepath at its last separator
///
/// Without a separator the parent is the document node (`""`).
pub fn split_nodepath(nodepath: &str) -> (&str, &str) {
    match nodepath.rfind('/') {
        Some(index) => (&nodepath[..index], &nodepath[index + 1..]),
        None => ("", nodepath),
    }
}

/// Split a comma and/or whitespace separated list
pub fn split_list(text: &str) -> Vec<String> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn required<'a>(node: NodeRef<'a>, name: &str) -> Result<&'a str, MalformedRule> {
    node.attribute(name)
        .ok_or_else(|| MalformedRule::new(node, format!("missing required attribute '{}'", name)))
}

fn optional(node: NodeRef<'_>, name: &str) -> Option<String> {
    node.attribute(name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
