//! Error types for branching, cloning, diffing and promotion

use loom_graph::StoreError;
use thiserror::Error;

/// Errors returned by [`crate::Brancher`] operations
#[derive(Debug, Error)]
pub enum BranchError {
    /// Source universe does not exist
    #[error("source universe not found: {0}")]
    SourceNotFound(String),

    /// Target universe exists and `force` was not set
    #[error("target universe already exists: {0} (use force to overwrite or choose a new id)")]
    TargetAlreadyExists(String),

    /// Divergence scene is not reachable from the source, or has no order
    #[error("divergence scene {scene_id} not found in universe {universe_id}")]
    DivergencePointNotFound {
        /// Source universe
        universe_id: String,
        /// Requested divergence scene
        scene_id: String,
    },

    /// Promotion strategy matched nothing because ids are namespaced
    #[error(
        "{strategy} matches on literal story and scene ids, but {source_id} and {target_id} \
         share none; use append_missing or promote between universes with literal ids"
    )]
    LiteralIdPrecondition {
        /// Strategy name
        strategy: &'static str,
        /// Source universe
        source_id: String,
        /// Target universe
        target_id: String,
    },

    /// Unrecognized promotion strategy name
    #[error("unknown promotion strategy: {0}")]
    UnknownStrategy(String),

    /// Cancellation was requested; nothing was committed
    #[error("operation cancelled")]
    Cancelled,

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Graph store failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl BranchError {
    /// Check if this is a guardrail rejection raised before any write
    #[inline]
    #[must_use]
    pub fn is_guardrail(&self) -> bool {
        matches!(
            self,
            Self::SourceNotFound(_)
                | Self::TargetAlreadyExists(_)
                | Self::DivergencePointNotFound { .. }
        )
    }

    /// Check if retrying the same call may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}
