//! Subscriber-side replica of the world.

use std::collections::HashMap;
use terra_core::{Change, Entity, EntityId, Tick, Version};
use tracing::warn;

use crate::store::{UpdateBatch, UpdateKind};

/// A local copy kept consistent by feeding it subscription batches in order.
///
/// Batches are applied whole, so a reader of the mirror never observes part
/// of a transaction.
#[derive(Debug, Default)]
pub struct Mirror {
    entities: HashMap<EntityId, (Version, Entity)>,
    tick: Tick,
}

impl Mirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tick of the last applied batch.
    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id).map(|(_, e)| e)
    }

    pub fn version(&self, id: EntityId) -> Option<Version> {
        self.entities.get(&id).map(|(v, _)| *v)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Apply one batch. Returns false for stale incremental batches.
    pub fn apply(&mut self, batch: &UpdateBatch) -> bool {
        match batch.kind {
            UpdateKind::Bootstrap => {
                self.entities.clear();
            }
            UpdateKind::Incremental if batch.tick <= self.tick => return false,
            UpdateKind::Incremental => {}
        }
        for change in &batch.changes {
            match change {
                Change::Create { version, entity, .. } => {
                    self.entities.insert(entity.id, (*version, entity.clone()));
                }
                Change::Update {
                    version,
                    entity: patch,
                    ..
                } => match self.entities.get_mut(&patch.id) {
                    Some((v, entity)) => {
                        entity.apply_patch(patch);
                        *v = *version;
                    }
                    None => warn!(id = %patch.id, tick = batch.tick, "update for unknown entity"),
                },
                Change::Delete { id, .. } => {
                    self.entities.remove(id);
                }
            }
        }
        self.tick = batch.tick;
        true
    }
}
