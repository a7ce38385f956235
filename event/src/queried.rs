//! Queried entities: a snapshot plus a staged patch.

use terra_core::{
    Component, ComponentValue, CoreResult, Entity, EntityId, EntityPatch, EntityWith, ICED,
};

/// An entity handed to `apply`.
///
/// Writes are staged as a patch and are visible to later reads on the same
/// value. Only a non-empty patch turns into an update.
#[derive(Debug, Clone, PartialEq)]
pub struct QueriedEntity {
    current: Entity,
    patch: EntityPatch,
}

impl QueriedEntity {
    pub fn new(entity: Entity) -> Self {
        let patch = EntityPatch::new(entity.id);
        Self {
            current: entity,
            patch,
        }
    }

    pub fn id(&self) -> EntityId {
        self.current.id
    }

    /// The entity as it reads now, staged writes included.
    pub fn entity(&self) -> &Entity {
        &self.current
    }

    pub fn has(&self, name: &str) -> bool {
        self.current.has(name)
    }

    pub fn get<C: Component>(&self) -> CoreResult<Option<C>> {
        self.current.get::<C>()
    }

    pub fn get_raw(&self, name: &str) -> Option<&ComponentValue> {
        self.current.get_raw(name)
    }

    /// Narrow to a view guaranteeing `names` are present.
    pub fn narrow<'a>(&'a self, names: &[&'a str]) -> Option<EntityWith<'a>> {
        self.current.narrow(names)
    }

    pub fn set<C: Component>(&mut self, component: &C) -> CoreResult<()> {
        self.current.set(component)?;
        if let Some(value) = self.current.get_raw(C::NAME) {
            self.patch.set(C::NAME, value.clone());
        }
        Ok(())
    }

    pub fn set_raw(&mut self, name: impl Into<String>, value: ComponentValue) {
        let name = name.into();
        self.current.set_raw(name.clone(), value.clone());
        self.patch.set(name, value);
    }

    pub fn remove(&mut self, name: &str) {
        if self.current.remove(name).is_some() {
            self.patch.remove(name);
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.current.is_frozen()
    }

    pub fn freeze(&mut self) {
        self.set_raw(ICED, ComponentValue::Object(Default::default()));
    }

    pub fn unfreeze(&mut self) {
        self.remove(ICED);
    }

    pub fn is_dirty(&self) -> bool {
        !self.patch.is_empty()
    }

    pub fn patch(&self) -> &EntityPatch {
        &self.patch
    }

    pub fn into_patch(self) -> EntityPatch {
        self.patch
    }
}
