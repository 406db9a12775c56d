//! Store error types

use crate::model::{EdgeKind, NodeKey};

/// Errors raised by a graph store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Unique create hit an existing node
    #[error("node already exists: {key}")]
    AlreadyExists {
        /// Key that was already present
        key: NodeKey,
    },

    /// Edge write referenced a node that is not in the store
    #[error("cannot write {kind} edge: endpoint {missing} not found")]
    MissingEndpoint {
        /// Kind of the rejected edge
        kind: EdgeKind,
        /// The endpoint that could not be resolved
        missing: NodeKey,
    },

    /// Node lookup for an update failed
    #[error("node not found: {0}")]
    NodeNotFound(NodeKey),

    /// Snapshot import failed validation
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Backend-specific failure
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Check if a retry of the same operation could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend(_))
    }
}
