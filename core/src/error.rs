//! Common error types for Terra.
//!
//! Every variant here is an invariant violation: a programming error in a
//! handler or a malformed request. None of them is retried.

use crate::id::EntityId;
use thiserror::Error;

/// Errors raised by core entity and request types.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A component expected to be present is missing.
    #[error("Missing component {component} on entity {entity}")]
    MissingComponent { entity: EntityId, component: String },

    /// A narrowed view was asked for a component outside its guaranteed set.
    #[error("Component {component} was not narrowed on entity {entity}")]
    NotNarrowed { entity: EntityId, component: String },

    /// A component payload did not match its typed shape.
    #[error("Failed to decode component {component}: {message}")]
    ComponentDecode { component: String, message: String },

    /// A `NewIds` request over the per-transaction cap.
    #[error("Can only generate up to {cap} ids at once, requested {requested}")]
    NewIdsOverCap { requested: usize, cap: usize },

    /// More new ids were consumed than were reserved.
    #[error("Id underflow: requested {requested}, available {available}")]
    IdUnderflow { requested: usize, available: usize },
}

impl CoreError {
    pub fn missing_component(entity: EntityId, component: impl Into<String>) -> Self {
        Self::MissingComponent {
            entity,
            component: component.into(),
        }
    }

    pub fn not_narrowed(entity: EntityId, component: impl Into<String>) -> Self {
        Self::NotNarrowed {
            entity,
            component: component.into(),
        }
    }

    pub fn component_decode(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ComponentDecode {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn new_ids_over_cap(requested: usize, cap: usize) -> Self {
        Self::NewIdsOverCap { requested, cap }
    }

    pub fn id_underflow(requested: usize, available: usize) -> Self {
        Self::IdUnderflow {
            requested,
            available,
        }
    }
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
