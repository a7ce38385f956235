//! Event error types.

use terra_core::{CoreError, EntityId};
use terra_query::QueryError;
use thiserror::Error;

/// Result type for handler and context operations.
pub type EventResult<T> = Result<T, EventError>;

/// Errors raised while resolving, preparing or applying an event.
#[derive(Debug, Error)]
pub enum EventError {
    /// The handler decided not to act. Not a failure.
    #[error("rolled back: {reason}")]
    Rollback { reason: String },

    /// The handler refused the actor.
    #[error("denied: {reason}")]
    Denied { reason: String },

    /// A required query matched nothing.
    #[error("could not satisfy '{name}': {query}")]
    Unsatisfied { name: String, query: String },

    #[error("no handler registered for event kind '{kind}'")]
    NoHandler { kind: String },

    #[error("a handler is already registered for event kind '{kind}'")]
    DuplicateHandler { kind: String },

    #[error("no involved entry named '{name}'")]
    UnknownEntry { name: String },

    #[error("involved entry '{name}' is not {expected}")]
    WrongEntry { name: String, expected: &'static str },

    #[error("create of {id}, which was not reserved by this event")]
    UnreservedCreate { id: EntityId },

    #[error("{id} was already created by this event")]
    DuplicateCreate { id: EntityId },

    #[error("invariant violated: {message}")]
    Invariant { message: String },

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl EventError {
    pub fn rollback(reason: impl Into<String>) -> Self {
        Self::Rollback {
            reason: reason.into(),
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self::Denied {
            reason: reason.into(),
        }
    }

    pub fn unsatisfied(name: impl Into<String>, query: impl ToString) -> Self {
        Self::Unsatisfied {
            name: name.into(),
            query: query.to_string(),
        }
    }

    pub fn no_handler(kind: impl Into<String>) -> Self {
        Self::NoHandler { kind: kind.into() }
    }

    pub fn duplicate_handler(kind: impl Into<String>) -> Self {
        Self::DuplicateHandler { kind: kind.into() }
    }

    pub fn unknown_entry(name: impl Into<String>) -> Self {
        Self::UnknownEntry { name: name.into() }
    }

    pub fn wrong_entry(name: impl Into<String>, expected: &'static str) -> Self {
        Self::WrongEntry {
            name: name.into(),
            expected,
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
        }
    }

    /// Handler-initiated "do nothing" outcomes.
    pub fn is_rollback(&self) -> bool {
        matches!(self, EventError::Rollback { .. } | EventError::Denied { .. })
    }
}
