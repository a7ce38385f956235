//! Secondary indexes for key lookups.

use std::collections::HashMap;
use terra_core::{Entity, EntityId, IndexKey};

/// Declares an index: `name` maps the string at `component.field` to an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub component: String,
    pub field: String,
}

impl IndexSpec {
    pub fn new(
        name: impl Into<String>,
        component: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            component: component.into(),
            field: field.into(),
        }
    }

    fn key_of(&self, entity: &Entity) -> Option<IndexKey> {
        let value = entity.get_raw(&self.component)?.get(&self.field)?;
        let key = match value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        Some(IndexKey::new(self.name.clone(), key))
    }
}

/// Unique key index over every declared [`IndexSpec`]. Later writes win.
#[derive(Debug, Default)]
pub struct SecondaryIndex {
    specs: Vec<IndexSpec>,
    exact: HashMap<IndexKey, EntityId>,
}

impl SecondaryIndex {
    pub fn new(specs: Vec<IndexSpec>) -> Self {
        Self {
            specs,
            exact: HashMap::new(),
        }
    }

    pub fn insert(&mut self, entity: &Entity) {
        for spec in &self.specs {
            if let Some(key) = spec.key_of(entity) {
                self.exact.insert(key, entity.id);
            }
        }
    }

    pub fn remove(&mut self, entity: &Entity) {
        for spec in &self.specs {
            if let Some(key) = spec.key_of(entity) {
                if self.exact.get(&key) == Some(&entity.id) {
                    self.exact.remove(&key);
                }
            }
        }
    }

    pub fn get(&self, key: &IndexKey) -> Option<EntityId> {
        self.exact.get(key).copied()
    }
}
