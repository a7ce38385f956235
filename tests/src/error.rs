//! Error types for the scenario framework.

use terra_core::CoreError;
use terra_event::EventError;
use terra_world::StoreError;
use thiserror::Error;

/// Result type for scenario operations.
pub type ScenarioResult<T> = Result<T, ScenarioError>;

/// Errors that can occur when running scenarios.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// Assertion failed.
    #[error("assertion failed for step '{step}': {message}")]
    AssertionFailed { step: String, message: String },

    /// Seeding the world failed.
    #[error("failed to seed scenario '{scenario}': {source}")]
    Seed {
        scenario: String,
        #[source]
        source: StoreError,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("handler registration failed: {0}")]
    Registry(#[from] EventError),

    #[error("fixture error: {0}")]
    Core(#[from] CoreError),
}

impl ScenarioError {
    pub fn assertion_failed(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            step: step.into(),
            message: message.into(),
        }
    }

    pub fn seed(scenario: impl Into<String>, source: StoreError) -> Self {
        Self::Seed {
            scenario: scenario.into(),
            source,
        }
    }
}
