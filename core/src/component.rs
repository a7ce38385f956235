//! Components: named, optional field groups attached to an entity.
//!
//! Payloads are stored as JSON values so that the store stays agnostic of the
//! game's component registry; handlers decode them into typed structs through
//! the [`Component`] trait.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{CoreError, CoreResult};

/// Raw component payload.
pub type ComponentValue = serde_json::Value;

/// Sparse component map of an entity, ordered by component name.
pub type Components = BTreeMap<String, ComponentValue>;

/// Marker component of a frozen ("iced") entity.
///
/// Frozen entities are excluded from queries unless they opt in with
/// `include_frozen`.
pub const ICED: &str = "iced";

/// A typed component with a stable name.
pub trait Component: Serialize + DeserializeOwned {
    /// Name the component is stored under.
    const NAME: &'static str;
}

/// Decode a raw payload into a typed component.
pub fn decode_component<C: Component>(value: &ComponentValue) -> CoreResult<C> {
    C::deserialize(value).map_err(|e| CoreError::component_decode(C::NAME, e.to_string()))
}

/// Encode a typed component into its raw payload.
pub fn encode_component<C: Component>(component: &C) -> CoreResult<ComponentValue> {
    serde_json::to_value(component)
        .map_err(|e| CoreError::component_decode(C::NAME, e.to_string()))
}
