//! Transaction error types.

use terra_core::CoreError;
use terra_event::EventError;
use terra_query::QueryError;
use terra_world::StoreError;
use thiserror::Error;

/// Transaction errors.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// An iff no longer held at commit time.
    #[error("conflict: a read entity changed before commit")]
    Conflict,

    /// Backing store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Handler or resolution failure.
    #[error("event error: {0}")]
    Event(#[from] EventError),

    #[error("query error: {0}")]
    Query(#[from] QueryError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Retries ran out.
    #[error("gave up after {attempts} attempts: {last}")]
    ExhaustedAttempts {
        attempts: u32,
        #[source]
        last: Box<TransactionError>,
    },
}

impl TransactionError {
    pub fn exhausted(attempts: u32, last: TransactionError) -> Self {
        Self::ExhaustedAttempts {
            attempts,
            last: Box::new(last),
        }
    }

    /// Worth another attempt from a fresh read.
    pub fn is_transient(&self) -> bool {
        match self {
            TransactionError::Conflict => true,
            TransactionError::Store(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Errors that concern the whole attempt rather than one event.
    pub fn is_attempt_wide(&self) -> bool {
        matches!(self, TransactionError::Conflict | TransactionError::Store(_))
    }

    pub fn is_fatal(&self) -> bool {
        !self.is_transient()
    }
}

/// Result type for transaction operations.
pub type TransactionResult<T> = Result<T, TransactionError>;
