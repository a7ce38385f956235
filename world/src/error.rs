//! Store error types.

use std::time::Duration;
use terra_journal::JournalError;
use thiserror::Error;

/// Failures from a backing store, unrelated to version conflicts.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached; safe to retry.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store did not become healthy in time.
    #[error("store not healthy after {waited:?}")]
    Unhealthy { waited: Duration },

    /// The caller's abort signal fired.
    #[error("operation aborted")]
    Aborted,

    /// The store refused a request outright.
    #[error("store rejected request: {0}")]
    Rejected(String),

    #[error("journal error: {0}")]
    Journal(#[from] JournalError),
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn unhealthy(waited: Duration) -> Self {
        Self::Unhealthy { waited }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    /// Transient errors may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
