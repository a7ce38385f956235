//! Journal error types.

use terra_core::Tick;
use thiserror::Error;

/// Journal errors.
#[derive(Debug, Error)]
pub enum JournalError {
    /// The requested tick is older than the retained window.
    #[error("tick {requested} was truncated, oldest retained is {oldest}")]
    Truncated { requested: Tick, oldest: Tick },

    /// The requested tick has not been committed yet.
    #[error("tick {requested} is ahead of the journal head {head}")]
    FutureTick { requested: Tick, head: Tick },
}

impl JournalError {
    pub fn truncated(requested: Tick, oldest: Tick) -> Self {
        Self::Truncated { requested, oldest }
    }

    pub fn future_tick(requested: Tick, head: Tick) -> Self {
        Self::FutureTick { requested, head }
    }
}

/// Result type for journal operations.
pub type JournalResult<T> = Result<T, JournalError>;
