//! Error type for tree operations.

use thiserror::Error;

use crate::id::NodeId;

/// Errors returned by [`Tree`](crate::Tree) operations.
///
/// Structural mutations validate before they touch the tree, so an error
/// leaves the tree as it was. Decoding is the exception: a body that fails
/// halfway leaves a partially populated node behind.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("cycle: {0}")]
    Cycle(String),
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },
    #[error("index {index} out of range for {len} children")]
    InvalidIndex { index: usize, len: usize },
    #[error("node {0} is not initialized or was destroyed")]
    SelfNotInitialized(NodeId),
    #[error("path not found: {0}")]
    PathNotFound(String),
    #[error("capability missing: {0}")]
    CapabilityMissing(String),
    #[error("no such field: {0}")]
    NoSuchField(String),
    #[error("embedded field node {0} cannot be re-parented or deleted")]
    EmbeddedField(NodeId),
    #[error("unresolved path references under {node}: {paths:?}")]
    UnresolvedRefs { node: NodeId, paths: Vec<String> },
    #[error("decode error: {0}")]
    Decode(String),
    #[error(transparent)]
    Path(#[from] arbor_path::PathError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl TreeError {
    /// Caller misuse (a stale or uninitialized handle) rather than an
    /// ordinary recoverable failure.
    pub fn is_misuse(&self) -> bool {
        matches!(self, TreeError::SelfNotInitialized(_))
    }
}

pub type Result<T, E = TreeError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_misuse() {
        assert!(TreeError::SelfNotInitialized(NodeId::new(0, 0)).is_misuse());
        assert!(!TreeError::PathNotFound("/a".to_string()).is_misuse());
    }

    #[test]
    fn test_display() {
        let err = TreeError::InvalidIndex { index: 4, len: 2 };
        assert_eq!(err.to_string(), "index 4 out of range for 2 children");
    }
}
