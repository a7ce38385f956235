//! The working set of one transaction.
//!
//! Holds the versioned reads of the attempt and the changes staged against
//! them, and builds the Change-To-Apply that is finally submitted.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use terra_core::{
    ChangeToApply, Entity, EntityId, EntityPatch, FirehoseEvent, Iff, ProposedChange, Version,
};
use terra_world::VersionedEntity;

/// Changes staged by one or more `apply` calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StagedChanges {
    /// Patches to existing entities, by id.
    patches: BTreeMap<EntityId, EntityPatch>,
    /// Created entities, in call order.
    created: Vec<Entity>,
    /// Deleted pre-existing entities, in call order.
    deleted: Vec<EntityId>,
    /// Fresh ids already consumed by a create.
    used_ids: BTreeSet<EntityId>,
    events: Vec<FirehoseEvent>,
}

impl StagedChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a patch; later values win per component.
    pub fn stage_patch(&mut self, patch: EntityPatch) {
        if patch.is_empty() {
            return;
        }
        if let Some(created) = self.created.iter_mut().find(|e| e.id == patch.id) {
            created.apply_patch(&patch);
            return;
        }
        let merged = self
            .patches
            .entry(patch.id)
            .or_insert_with(|| EntityPatch::new(patch.id));
        merged.components.extend(patch.components);
    }

    pub fn create(&mut self, entity: Entity) {
        self.used_ids.insert(entity.id);
        self.created.push(entity);
    }

    /// Delete an entity. Deleting something created in this transaction
    /// just drops the create.
    pub fn delete(&mut self, id: EntityId) {
        if let Some(pos) = self.created.iter().position(|e| e.id == id) {
            self.created.remove(pos);
            return;
        }
        self.patches.remove(&id);
        if !self.deleted.contains(&id) {
            self.deleted.push(id);
        }
    }

    pub fn publish(&mut self, event: FirehoseEvent) {
        self.events.push(event);
    }

    /// True if `id` was consumed by a create, even one later deleted.
    pub fn id_used(&self, id: EntityId) -> bool {
        self.used_ids.contains(&id)
    }

    pub fn is_deleted(&self, id: EntityId) -> bool {
        self.deleted.contains(&id)
    }

    pub fn events(&self) -> &[FirehoseEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty() && self.created.is_empty() && self.deleted.is_empty()
    }
}

/// Reads plus staged changes for one attempt.
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    reads: HashMap<EntityId, VersionedEntity>,
    staged: StagedChanges,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record fetched entities, keyed by the ids they were requested as.
    pub fn record_reads(&mut self, ids: &[EntityId], reads: Vec<VersionedEntity>) {
        for (id, read) in ids.iter().zip(reads) {
            self.reads.insert(*id, read);
        }
    }

    pub fn has_read(&self, id: EntityId) -> bool {
        self.reads.contains_key(&id)
    }

    pub fn read_version(&self, id: EntityId) -> Version {
        self.reads.get(&id).map(|r| r.version).unwrap_or(Version::ABSENT)
    }

    /// The entity as this transaction currently sees it.
    pub fn current(&self, id: EntityId) -> Option<Entity> {
        if self.staged.is_deleted(id) {
            return None;
        }
        if let Some(created) = self.staged.created.iter().find(|e| e.id == id) {
            return Some(created.clone());
        }
        let mut entity = self.reads.get(&id)?.entity.clone()?;
        if let Some(patch) = self.staged.patches.get(&id) {
            entity.apply_patch(patch);
        }
        Some(entity)
    }

    /// Current state of `ids`, absent ones left out.
    pub fn view(&self, ids: &[EntityId]) -> HashMap<EntityId, Entity> {
        ids.iter()
            .filter_map(|id| self.current(*id).map(|e| (*id, e)))
            .collect()
    }

    pub fn staged(&self) -> &StagedChanges {
        &self.staged
    }

    pub fn staged_mut(&mut self) -> &mut StagedChanges {
        &mut self.staged
    }

    /// Capture staged changes for a later [`restore`](Self::restore).
    pub fn savepoint(&self) -> StagedChanges {
        self.staged.clone()
    }

    pub fn restore(&mut self, savepoint: StagedChanges) {
        self.staged = savepoint;
    }

    /// Build the Change-To-Apply.
    ///
    /// Every id in `guarded` gets an iff at its read version with the
    /// component names it had when read. Changes are ordered updates (by id),
    /// then creates, then deletes.
    pub fn build(&self, guarded: &BTreeSet<EntityId>) -> ChangeToApply {
        let iffs = guarded
            .iter()
            .map(|id| {
                let read = self.reads.get(id);
                let version = read.map(|r| r.version).unwrap_or(Version::ABSENT);
                let components = read
                    .and_then(|r| r.entity.as_ref())
                    .map(|e| e.component_names())
                    .unwrap_or_default();
                Iff::new(*id, version, components)
            })
            .collect();

        let updates = self
            .staged
            .patches
            .values()
            .filter(|p| !p.is_empty() && !self.staged.is_deleted(p.id))
            .cloned()
            .map(ProposedChange::update);
        let creates = self.staged.created.iter().cloned().map(ProposedChange::create);
        let deletes = self.staged.deleted.iter().copied().map(ProposedChange::delete);

        ChangeToApply {
            iffs,
            changes: updates.chain(creates).chain(deletes).collect(),
            events: self.staged.events.clone(),
        }
    }
}
