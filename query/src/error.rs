//! Query error types.

use terra_core::CoreError;
use thiserror::Error;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors in a specification. All of them are invariant violations.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("involved entry '{name}': {source}")]
    InEntry {
        name: String,
        #[source]
        source: CoreError,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl QueryError {
    pub fn in_entry(name: impl Into<String>, source: CoreError) -> Self {
        Self::InEntry {
            name: name.into(),
            source,
        }
    }
}
