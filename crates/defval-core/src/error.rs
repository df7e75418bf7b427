//! Error types for the defaults and validation engine
//!
//! Two families of failure exist. Structural defects in the rule document
//! ([`RegistryError`]) abort a pass immediately. Everything that goes wrong
//! for a single rule or node is recorded as a [`Finding`] and surfaces at the
//! end of the pass as one batch error.

use thiserror::Error;

use crate::findings::{Finding, Pass};

/// Errors raised by the tree collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// An ancestor level has more than one candidate, so the insertion point
    /// is ambiguous
    #[error("non-deterministic nodepath '{nodepath}': {candidates} candidates for '{segment}'")]
    NonDeterministicPath {
        nodepath: String,
        segment: String,
        candidates: usize,
    },

    /// The top-level element of a nodepath is absent; ancestor creation
    /// never adds a second root
    #[error("nodepath '{nodepath}' starts at '{root}', which is not a top-level element")]
    MissingRoot { nodepath: String, root: String },

    /// The requested parent cannot hold the new node
    #[error("invalid parent '{path}': {reason}")]
    InvalidParent { path: String, reason: String },

    /// Attribute names are unique per element
    #[error("attribute '{name}' already exists on '{path}'")]
    DuplicateAttribute { path: String, name: String },

    /// Node names are non-empty and cannot contain the separator
    #[error("invalid node name '{name}'")]
    InvalidName { name: String },

    /// A document value could not be mapped onto a tree
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

/// Errors that abort a helper registry build
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The same ref was declared twice in one section
    #[error("helper ref '{reference}' in '{section}' is not unique")]
    DuplicateRef { section: String, reference: String },

    /// The module specifier lacks a recognized module-file suffix
    #[error("invalid helper module name '{specifier}' for ref '{reference}'")]
    InvalidModuleName { reference: String, specifier: String },

    /// The plugin could not be instantiated
    #[error("cannot load helper module '{class_id}': {reason}")]
    Load { class_id: String, reason: String },

    /// A helper declaration lacks `ref`, `module` or `method`
    #[error("helper declaration at '{path}' is missing required attribute '{attribute}'")]
    MissingAttribute { path: String, attribute: String },

    /// `invert` is present but not a boolean
    #[error("invalid invert value '{value}' for helper ref '{reference}'")]
    InvalidInvert { reference: String, value: String },
}

/// Errors raised while reaching or running a helper method
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HelperError {
    /// No module/method is bound to the ref
    #[error("helper '{reference}' missing from the rule document")]
    Missing { reference: String },

    /// The plugin was asked for a method it does not provide
    #[error("helper module '{class_id}' has no method '{method}'")]
    UnknownMethod { class_id: String, method: String },

    /// The helper method itself failed
    #[error("{0}")]
    Failed(String),
}

impl HelperError {
    /// Create a failure raised from inside a helper method
    pub fn failed(msg: impl Into<String>) -> Self {
        HelperError::Failed(msg.into())
    }
}

/// Errors returned by the defaults and validation passes
#[derive(Error, Debug)]
pub enum DefvalError {
    /// The rule document's helper section is structurally broken
    #[error("error building helper registry: {0}")]
    Registry(#[from] RegistryError),

    /// One or more default rules failed
    #[error("one or more errors occurred while setting defaults ({} finding(s))", .findings.len())]
    BatchDefault { findings: Vec<Finding> },

    /// One or more validation sub-passes failed
    #[error("{}: one or more validation errors found ({} finding(s))", join_passes(.failed), .findings.len())]
    BatchValidation {
        failed: Vec<Pass>,
        findings: Vec<Finding>,
    },
}

impl DefvalError {
    /// Findings carried by a batch error (empty for registry errors)
    pub fn findings(&self) -> &[Finding] {
        match self {
            DefvalError::Registry(_) => &[],
            DefvalError::BatchDefault { findings } => findings,
            DefvalError::BatchValidation { findings, .. } => findings,
        }
    }

    /// Whether this error describes a broken rule document rather than bad data
    pub fn is_structural(&self) -> bool {
        matches!(self, DefvalError::Registry(_))
    }
}

fn join_passes(passes: &[Pass]) -> String {
    passes
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, DefvalError>;
