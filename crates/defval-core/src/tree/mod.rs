//! Hierarchical document tree
//!
//! Both the data tree and the rule tree are instances of [`Tree`]. Nodes live
//! in an arena and are addressed by [`NodeId`]; parent links are plain
//! indices, so a node never owns its ancestors.
//!
//! # Nodepaths
//!
//! A nodepath is a `/`-separated list of names, e.g.
//! `distro/img_params/output_image`. A leading `/` is accepted, so the
//! canonical path returned by [`Tree::path`] can be fed back into
//! [`Tree::find`]. Matching walks segment by segment from the hidden document
//! node (or from a scope node for [`Tree::find_under`]); every segment matches
//! element children by name, and the final segment also matches attributes.
//! The empty nodepath matches the scope node itself.

pub mod document;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TreeError;

/// Index of a node inside its [`Tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Kind of a tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Element node, may carry attributes and children
    Element,
    /// Attribute node, always a leaf attached to an element
    Attribute,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Element => write!(f, "element"),
            NodeKind::Attribute => write!(f, "attribute"),
        }
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    name: String,
    kind: NodeKind,
    value: String,
    parent: Option<NodeId>,
    attributes: Vec<NodeId>,
    children: Vec<NodeId>,
}

impl NodeData {
    fn new(name: String, kind: NodeKind, value: String, parent: Option<NodeId>) -> Self {
        Self {
            name,
            kind,
            value,
            parent,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }
}

/// Arena-backed document tree
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<NodeData>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// The hidden document node every tree starts with
    pub const DOCUMENT: NodeId = NodeId(0);

    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData::new(
                String::new(),
                NodeKind::Element,
                String::new(),
                None,
            )],
        }
    }

    /// Create a tree with a single top-level element
    pub fn with_root(name: impl Into<String>) -> Self {
        let mut tree = Self::new();
        tree.push(Self::DOCUMENT, name.into(), String::new(), NodeKind::Element);
        tree
    }

    /// First top-level element, if any
    pub fn root_element(&self) -> Option<NodeId> {
        self.data(Self::DOCUMENT).children.first().copied()
    }

    /// Number of nodes, not counting the document node
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Whether the tree holds no nodes besides the document node
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow a node as a read-only view
    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { tree: self, id }
    }

    /// Canonical path of a node (`""` for the document node)
    pub fn path(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let data = self.data(node_id);
            if data.parent.is_some() {
                names.push(data.name.as_str());
            }
            current = data.parent;
        }

        let mut path = String::new();
        for name in names.iter().rev() {
            path.push('/');
            path.push_str(name);
        }
        path
    }

    /// Find all nodes matching `nodepath` from the document node
    pub fn find(&self, nodepath: &str) -> Vec<NodeId> {
        self.find_under(Self::DOCUMENT, nodepath)
    }

    /// Find all nodes matching `nodepath` below `scope`
    pub fn find_under(&self, scope: NodeId, nodepath: &str) -> Vec<NodeId> {
        let segments = split_segments(nodepath);
        let mut current = vec![scope];

        for (index, segment) in segments.iter().enumerate() {
            let last = index + 1 == segments.len();
            let mut next = Vec::new();

            for id in current {
                let data = self.data(id);
                if last {
                    next.extend(
                        data.attributes
                            .iter()
                            .copied()
                            .filter(|attr| self.data(*attr).name == *segment),
                    );
                }
                next.extend(
                    data.children
                        .iter()
                        .copied()
                        .filter(|child| self.data(*child).name == *segment),
                );
            }

            if next.is_empty() {
                return next;
            }
            current = next;
        }

        current
    }

    /// Add a node under `parent`
    ///
    /// Attributes may only be attached to elements and their names must be
    /// unique per element.
    pub fn add_node(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
        kind: NodeKind,
    ) -> Result<NodeId, TreeError> {
        let name = name.into();
        if name.is_empty() || name.contains('/') {
            return Err(TreeError::InvalidName { name });
        }

        let parent_data = self.data(parent);
        if parent_data.kind == NodeKind::Attribute {
            return Err(TreeError::InvalidParent {
                path: self.path(parent),
                reason: "attributes cannot have children".to_string(),
            });
        }

        if kind == NodeKind::Attribute {
            if parent == Self::DOCUMENT {
                return Err(TreeError::InvalidParent {
                    path: String::new(),
                    reason: "the document node cannot carry attributes".to_string(),
                });
            }
            if parent_data
                .attributes
                .iter()
                .any(|attr| self.data(*attr).name == name)
            {
                return Err(TreeError::DuplicateAttribute {
                    path: self.path(parent),
                    name,
                });
            }
        }

        Ok(self.push(parent, name, value.into(), kind))
    }

    /// Add an element under `parent`
    pub fn add_element(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<NodeId, TreeError> {
        self.add_node(parent, name, value, NodeKind::Element)
    }

    /// Add an attribute to the element `parent`
    pub fn add_attribute(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<NodeId, TreeError> {
        self.add_node(parent, name, value, NodeKind::Attribute)
    }

    /// Replace the text value of a node
    pub fn set_value(&mut self, id: NodeId, value: impl Into<String>) {
        self.nodes[id.0].value = value.into();
    }

    /// Resolve `nodepath` to exactly one element, creating missing elements
    /// along the way
    ///
    /// The top-level element must already exist ([`TreeError::MissingRoot`]);
    /// only the levels below it are created, with an empty value. A level
    /// that already has more than one matching element makes the insertion
    /// point ambiguous and fails with [`TreeError::NonDeterministicPath`].
    pub fn ensure_path(&mut self, nodepath: &str) -> Result<NodeId, TreeError> {
        let mut current = Self::DOCUMENT;

        for (depth, segment) in split_segments(nodepath).into_iter().enumerate() {
            let matches: Vec<NodeId> = self
                .data(current)
                .children
                .iter()
                .copied()
                .filter(|child| self.data(*child).name == segment)
                .collect();

            current = match matches.as_slice() {
                [] if depth == 0 => {
                    return Err(TreeError::MissingRoot {
                        nodepath: nodepath.to_string(),
                        root: segment.to_string(),
                    })
                }
                [] => {
                    tracing::debug!(
                        parent = %self.path(current),
                        element = segment,
                        "creating missing ancestor element"
                    );
                    self.add_element(current, segment, "")?
                }
                [single] => *single,
                _ => {
                    return Err(TreeError::NonDeterministicPath {
                        nodepath: nodepath.to_string(),
                        segment: segment.to_string(),
                        candidates: matches.len(),
                    })
                }
            };
        }

        Ok(current)
    }

    /// Traverse every element and attribute once, in document order
    ///
    /// Each element is followed by its attributes and then its children.
    /// The returned iterator is finite; call `walk` again to restart.
    pub fn walk(&self) -> Walk<'_> {
        let mut stack: Vec<NodeId> = self.data(Self::DOCUMENT).children.clone();
        stack.reverse();
        Walk { tree: self, stack }
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    fn push(&mut self, parent: NodeId, name: String, value: String, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData::new(name, kind, value, Some(parent)));
        let parent_data = &mut self.nodes[parent.0];
        match kind {
            NodeKind::Element => parent_data.children.push(id),
            NodeKind::Attribute => parent_data.attributes.push(id),
        }
        id
    }
}

/// Split a nodepath into its non-empty segments
fn split_segments(nodepath: &str) -> Vec<&str> {
    nodepath.split('/').filter(|s| !s.is_empty()).collect()
}

/// Read-only view of one node
///
/// This is the handle plugins receive; it gives access to the surrounding
/// tree for context-dependent computations.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a Tree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    pub fn name(&self) -> &'a str {
        &self.tree.data(self.id).name
    }

    pub fn kind(&self) -> NodeKind {
        self.tree.data(self.id).kind
    }

    pub fn value(&self) -> &'a str {
        &self.tree.data(self.id).value
    }

    /// Canonical path of this node
    pub fn path(&self) -> String {
        self.tree.path(self.id)
    }

    pub fn is_document(&self) -> bool {
        self.id == Tree::DOCUMENT
    }

    /// Attributes of this node as a name/value mapping
    pub fn attributes(&self) -> BTreeMap<String, String> {
        self.tree
            .data(self.id)
            .attributes
            .iter()
            .map(|attr| {
                let data = self.tree.data(*attr);
                (data.name.clone(), data.value.clone())
            })
            .collect()
    }

    /// Value of a single attribute
    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        let tree = self.tree;
        tree.data(self.id)
            .attributes
            .iter()
            .map(|attr| tree.data(*attr))
            .find(|data| data.name == name)
            .map(|data| data.value.as_str())
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.tree
            .data(self.id)
            .parent
            .map(|id| self.tree.node(id))
    }

    /// Element children in document order
    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        tree.data(self.id)
            .children
            .iter()
            .map(move |id| tree.node(*id))
    }

    /// Find nodes matching `nodepath` below this node
    pub fn find(&self, nodepath: &str) -> Vec<NodeRef<'a>> {
        self.tree
            .find_under(self.id, nodepath)
            .into_iter()
            .map(|id| self.tree.node(id))
            .collect()
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("path", &self.path())
            .field("kind", &self.kind())
            .field("value", &self.value())
            .finish()
    }
}

/// Pre-order traversal over a tree, see [`Tree::walk`]
pub struct Walk<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let data = self.tree.data(id);
        self.stack.extend(data.children.iter().rev().copied());
        self.stack.extend(data.attributes.iter().rev().copied());
        Some(self.tree.node(id))
    }
}
