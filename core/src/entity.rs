//! Entity structures for Terra.
//!
//! An entity is an id plus a sparse set of named components. Presence checks
//! are explicit: [`Entity::narrow`] returns an [`EntityWith`] view only when
//! every requested component is present.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::component::{
    decode_component, encode_component, Component, ComponentValue, Components, ICED,
};
use crate::error::{CoreError, CoreResult};
use crate::id::EntityId;

/// An addressable game object made of optional named components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier for this entity.
    pub id: EntityId,
    /// Component payloads by name.
    #[serde(flatten)]
    pub components: Components,
}

impl Entity {
    /// Create an entity with no components.
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            components: Components::new(),
        }
    }

    /// Builder-style raw component insertion.
    pub fn with_raw(mut self, name: impl Into<String>, value: ComponentValue) -> Self {
        self.components.insert(name.into(), value);
        self
    }

    /// Builder-style typed component insertion.
    pub fn with<C: Component>(mut self, component: &C) -> CoreResult<Self> {
        self.set(component)?;
        Ok(self)
    }

    /// Returns true if the component is present.
    pub fn has(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    /// Returns true if every listed component is present.
    pub fn has_all<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.iter().all(|n| self.has(n.as_ref()))
    }

    /// Get a raw component payload.
    pub fn get_raw(&self, name: &str) -> Option<&ComponentValue> {
        self.components.get(name)
    }

    /// Decode a typed component, `None` if absent.
    pub fn get<C: Component>(&self) -> CoreResult<Option<C>> {
        self.components
            .get(C::NAME)
            .map(decode_component::<C>)
            .transpose()
    }

    /// Set a typed component.
    pub fn set<C: Component>(&mut self, component: &C) -> CoreResult<()> {
        let value = encode_component(component)?;
        self.components.insert(C::NAME.to_string(), value);
        Ok(())
    }

    /// Set a raw component payload.
    pub fn set_raw(&mut self, name: impl Into<String>, value: ComponentValue) {
        self.components.insert(name.into(), value);
    }

    /// Remove a component.
    pub fn remove(&mut self, name: &str) -> Option<ComponentValue> {
        self.components.remove(name)
    }

    /// Returns true if the entity is frozen ("iced").
    pub fn is_frozen(&self) -> bool {
        self.has(ICED)
    }

    /// Names of all present components, sorted.
    pub fn component_names(&self) -> Vec<String> {
        self.components.keys().cloned().collect()
    }

    /// Narrow to a view that guarantees the listed components are present.
    pub fn narrow<'a>(&'a self, names: &[&'a str]) -> Option<EntityWith<'a>> {
        if self.has_all(names) {
            Some(EntityWith {
                entity: self,
                guaranteed: names.to_vec(),
            })
        } else {
            None
        }
    }

    /// Apply a patch in place.
    pub fn apply_patch(&mut self, patch: &EntityPatch) {
        for (name, value) in &patch.components {
            match value {
                Some(v) => {
                    self.components.insert(name.clone(), v.clone());
                }
                None => {
                    self.components.remove(name);
                }
            }
        }
    }
}

/// A narrowed view of an entity whose listed components are known present.
#[derive(Debug, Clone)]
pub struct EntityWith<'a> {
    entity: &'a Entity,
    guaranteed: Vec<&'a str>,
}

impl<'a> EntityWith<'a> {
    pub fn id(&self) -> EntityId {
        self.entity.id
    }

    pub fn entity(&self) -> &'a Entity {
        self.entity
    }

    /// Decode a guaranteed component.
    ///
    /// Asking for a component outside the narrowed set is a programming error.
    pub fn get<C: Component>(&self) -> CoreResult<C> {
        if !self.guaranteed.contains(&C::NAME) {
            return Err(CoreError::not_narrowed(self.entity.id, C::NAME));
        }
        match self.entity.get_raw(C::NAME) {
            Some(value) => decode_component(value),
            None => Err(CoreError::missing_component(self.entity.id, C::NAME)),
        }
    }
}

/// A partial update to an entity: `Some` sets a component, `None` removes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityPatch {
    pub id: EntityId,
    #[serde(flatten)]
    pub components: BTreeMap<String, Option<ComponentValue>>,
}

impl EntityPatch {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            components: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn set(&mut self, name: impl Into<String>, value: ComponentValue) {
        self.components.insert(name.into(), Some(value));
    }

    pub fn remove(&mut self, name: impl Into<String>) {
        self.components.insert(name.into(), None);
    }
}
