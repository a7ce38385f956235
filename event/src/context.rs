//! The context handed to `apply`.

use std::collections::BTreeSet;
use terra_core::{Entity, EntityId, FirehoseEvent};
use tracing::{debug, warn};

use crate::error::{EventError, EventResult};
use crate::working::StagedChanges;

/// Create, delete and publish on behalf of one event.
///
/// Everything goes into the staged changes of the surrounding transaction;
/// nothing reaches the store until commit.
#[derive(Debug)]
pub struct EventContext<'a> {
    target: Option<EntityId>,
    reserved: &'a [EntityId],
    involved: &'a BTreeSet<EntityId>,
    staged: &'a mut StagedChanges,
}

impl<'a> EventContext<'a> {
    pub fn new(
        target: Option<EntityId>,
        reserved: &'a [EntityId],
        involved: &'a BTreeSet<EntityId>,
        staged: &'a mut StagedChanges,
    ) -> Self {
        Self {
            target,
            reserved,
            involved,
            staged,
        }
    }

    pub fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Create an entity under an id reserved by `involves`.
    pub fn create(&mut self, entity: Entity) -> EventResult<()> {
        if !self.reserved.contains(&entity.id) {
            warn!(id = %entity.id, reserved = ?self.reserved, "create under an unreserved id");
            return Err(EventError::UnreservedCreate { id: entity.id });
        }
        if self.staged.id_used(entity.id) {
            warn!(id = %entity.id, "id already used by an earlier create");
            return Err(EventError::DuplicateCreate { id: entity.id });
        }
        self.staged.create(entity);
        Ok(())
    }

    /// Delete `id`, or the event's target when `None`.
    ///
    /// Only entities this event involved or created may be deleted.
    pub fn delete(&mut self, id: Option<EntityId>) -> EventResult<()> {
        let id = id.or(self.target).ok_or_else(|| {
            EventError::invariant("delete without an id on an event with no target")
        })?;
        if !self.involved.contains(&id) && !self.staged.id_used(id) {
            warn!(%id, target = ?self.target, "delete of an entity outside this event");
            return Err(EventError::invariant(format!("{id} is not involved in this event")));
        }
        debug!(%id, "staged delete");
        self.staged.delete(id);
        Ok(())
    }

    /// Queue a firehose event; delivered only if the transaction commits.
    pub fn publish(&mut self, event: FirehoseEvent) {
        debug!(kind = %event.kind, "staged firehose event");
        self.staged.publish(event);
    }
}
