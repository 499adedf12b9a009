//! Domain-level errors (no external dependencies)

use std::fmt;

use itertools::Itertools;
use thiserror::Error;

/// Structural-constraint violations raised by tree operations.
///
/// Every variant is a recoverable rejection: the operation did not apply
/// and the caller still holds the unchanged snapshot.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("indicator not found: {0}")]
    NodeNotFound(String),

    #[error("invalid level {level}: expected {expected}")]
    InvalidLevel { level: u8, expected: u8 },

    #[error("indicator {0} is at level 1 and cannot be promoted")]
    RootPromotion(String),

    #[error("indicator {0} has no preceding sibling to demote into")]
    NoPrecedingSibling(String),

    #[error("cannot demote {id} into {target}: target is a leaf indicator")]
    TargetIsLeaf { id: String, target: String },

    #[error("subtree of {id} would reach level {level}, maximum is {max}")]
    MaxDepthExceeded { id: String, level: u8, max: u8 },

    #[error("indicator {0} is not a leaf and holds no data indicators or supporting materials")]
    NotALeaf(String),

    #[error("{kind} {record} not found on indicator {id}")]
    ContentNotFound {
        id: String,
        record: String,
        kind: &'static str,
    },

    #[error("indicator name must not be empty")]
    EmptyName,
}

/// Result type for tree operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// What went wrong with one element of an import document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImportIssueKind {
    #[error("invalid JSON: {0}")]
    Syntax(String),

    #[error("expected an array of indicators or an object with a `tree` array")]
    Format,

    #[error("expected an object")]
    NotAnObject,

    #[error("missing or non-text `name`")]
    MissingName,

    #[error("indicator \"{name}\" nests deeper than level {max}")]
    DepthExceeded { name: String, max: u8 },

    #[error("invalid `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("duplicate id \"{0}\"")]
    DuplicateId(String),
}

/// One located problem in an import document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportIssue {
    /// JSON path of the offending element, e.g. `$[0].children[1]`
    pub path: String,
    pub kind: ImportIssueKind,
}

impl ImportIssue {
    pub fn new(path: impl Into<String>, kind: ImportIssueKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

impl fmt::Display for ImportIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.kind)
    }
}

/// Import rejected. Carries every issue found in the document, not just the first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportError {
    pub issues: Vec<ImportIssue>,
}

impl ImportError {
    pub fn single(path: impl Into<String>, kind: ImportIssueKind) -> Self {
        Self {
            issues: vec![ImportIssue::new(path, kind)],
        }
    }

    pub fn has(&self, pred: impl Fn(&ImportIssueKind) -> bool) -> bool {
        self.issues.iter().any(|i| pred(&i.kind))
    }
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.issues.as_slice() {
            [only] => write!(f, "import rejected: {}", only),
            issues => write!(
                f,
                "import rejected with {} issues: {}",
                issues.len(),
                issues.iter().join("; ")
            ),
        }
    }
}

impl std::error::Error for ImportError {}

/// Invariant breach found by `IndicatorTree::check_invariants`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("{id}: level {level}, expected {expected}")]
    LevelMismatch { id: String, level: u8, expected: u8 },

    #[error("{id}: level {level} exceeds maximum {max}")]
    TooDeep { id: String, level: u8, max: u8 },

    #[error("{id}: container at level {level} (deepest level must be a leaf)")]
    ContainerAtMaxLevel { id: String, level: u8 },

    #[error("{0}: container without children")]
    EmptyContainer(String),

    #[error("{id}: code \"{actual}\", expected \"{expected}\"")]
    StaleCode {
        id: String,
        actual: String,
        expected: String,
    },

    #[error("duplicate id \"{0}\"")]
    DuplicateId(String),

    #[error("{0}: empty name")]
    EmptyName(String),

    #[error("{id}: {kind} without id")]
    MissingRecordId { id: String, kind: &'static str },

    #[error("{id}: {kind} {record} has an empty name")]
    EmptyRecordName {
        id: String,
        record: String,
        kind: &'static str,
    },
}
