//! Cooperative cancellation

use crate::error::BranchError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag
///
/// Long-running writes check the token between batches and abort the whole
/// transaction when it is set.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create new, unset token
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation was requested
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Fail with [`BranchError::Cancelled`] if cancellation was requested
    ///
    /// # Errors
    /// [`BranchError::Cancelled`]
    #[inline]
    pub fn check(&self) -> Result<(), BranchError> {
        if self.is_cancelled() {
            Err(BranchError::Cancelled)
        } else {
            Ok(())
        }
    }
}
