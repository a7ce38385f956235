//! In-memory reference store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use terra_acl::{Aabb, AclComponent, AclDomain, Position, Protection, Restoration, Size};
use terra_core::{
    ApplyStatus, Change, ChangeToApply, Component, EngineConfig, Entity, EntityId, IndexKey,
    ProposedChange, Tick, Version,
};
use terra_journal::{JournalError, MemoryJournal};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::index::{IndexSpec, SecondaryIndex};
use crate::signal::AbortSignal;
use crate::store::{
    ApplyResult, IdAllocator, IndexSource, ProtectionSource, Subscription, SubscriptionConfig,
    UpdateBatch, UpdateKind, VersionedEntity, WorldStore,
};

/// Mutable state behind the store lock.
#[derive(Debug)]
struct WorldState {
    entities: HashMap<EntityId, Entity>,
    /// Current version per id, kept after deletion.
    versions: HashMap<EntityId, Version>,
    index: SecondaryIndex,
    journal: MemoryJournal,
    subscribers: Vec<mpsc::Sender<UpdateBatch>>,
    /// Lowest id never handed out or written.
    next_id: u64,
}

impl WorldState {
    fn version(&self, id: EntityId) -> Version {
        self.versions.get(&id).copied().unwrap_or(Version::ABSENT)
    }

    fn read(&self, id: EntityId) -> VersionedEntity {
        VersionedEntity {
            version: self.version(id),
            entity: self.entities.get(&id).cloned(),
        }
    }

    /// Every iff holds and every update/delete has a target.
    fn admits(&self, unit: &ChangeToApply) -> bool {
        let iffs_hold = unit
            .iffs
            .iter()
            .all(|iff| iff.holds(self.version(iff.id), self.entities.get(&iff.id)));
        if !iffs_hold {
            return false;
        }

        let mut exists: HashMap<EntityId, bool> = HashMap::new();
        for change in &unit.changes {
            let id = change.id();
            let present = *exists
                .entry(id)
                .or_insert_with(|| self.entities.contains_key(&id));
            match change {
                ProposedChange::Create { .. } => {
                    exists.insert(id, true);
                }
                ProposedChange::Update { .. } if !present => return false,
                ProposedChange::Update { .. } => {}
                ProposedChange::Delete { .. } if !present => return false,
                ProposedChange::Delete { .. } => {
                    exists.insert(id, false);
                }
            }
        }
        true
    }

    /// Land an admitted unit as one tick.
    fn commit(&mut self, unit: ChangeToApply) -> Vec<Change> {
        let tick = self.journal.next_tick();
        let mut bumped: HashMap<EntityId, Version> = HashMap::new();
        let mut committed = Vec::with_capacity(unit.changes.len());

        for change in unit.changes {
            let id = change.id();
            let current = self.version(id);
            let version = *bumped.entry(id).or_insert_with(|| current.next());
            self.versions.insert(id, version);

            match change {
                ProposedChange::Create { entity } => {
                    if let Some(old) = self.entities.remove(&id) {
                        self.index.remove(&old);
                    }
                    self.index.insert(&entity);
                    self.next_id = self.next_id.max(id.raw() + 1);
                    self.entities.insert(id, entity.clone());
                    committed.push(Change::Create {
                        tick,
                        version,
                        entity,
                    });
                }
                ProposedChange::Update { entity: patch } => {
                    if let Some(entity) = self.entities.get_mut(&id) {
                        self.index.remove(entity);
                        entity.apply_patch(&patch);
                        self.index.insert(entity);
                    }
                    committed.push(Change::Update {
                        tick,
                        version,
                        entity: patch,
                    });
                }
                ProposedChange::Delete { .. } => {
                    if let Some(old) = self.entities.remove(&id) {
                        self.index.remove(&old);
                    }
                    committed.push(Change::Delete { tick, version, id });
                }
            }
        }

        self.journal.append(committed.clone());
        self.broadcast(UpdateBatch {
            kind: UpdateKind::Incremental,
            tick,
            changes: committed.clone(),
        });
        committed
    }

    fn broadcast(&mut self, batch: UpdateBatch) {
        self.subscribers.retain(|tx| match tx.try_send(batch.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(tick = batch.tick, "subscriber lagging, closing its stream");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        });
    }

    fn bootstrap(&self) -> UpdateBatch {
        let tick = self.journal.head();
        let mut ids: Vec<_> = self.entities.keys().copied().collect();
        ids.sort();
        let changes = ids
            .into_iter()
            .filter_map(|id| {
                self.entities.get(&id).map(|entity| Change::Create {
                    tick,
                    version: self.version(id),
                    entity: entity.clone(),
                })
            })
            .collect();
        UpdateBatch {
            kind: UpdateKind::Bootstrap,
            tick,
            changes,
        }
    }
}

/// In-memory [`WorldStore`] with indexes, a journal and id allocation.
#[derive(Debug)]
pub struct MemoryWorld {
    config: EngineConfig,
    healthy: AtomicBool,
    state: Mutex<WorldState>,
}

impl Default for MemoryWorld {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl MemoryWorld {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_indexes(config, Vec::new())
    }

    pub fn with_indexes(config: EngineConfig, indexes: Vec<IndexSpec>) -> Self {
        let state = WorldState {
            entities: HashMap::new(),
            versions: HashMap::new(),
            index: SecondaryIndex::new(indexes),
            journal: MemoryJournal::new(config.journal_retention()),
            subscribers: Vec::new(),
            next_id: 1,
        };
        Self {
            config,
            healthy: AtomicBool::new(true),
            state: Mutex::new(state),
        }
    }

    /// Create entities unconditionally, as one batch.
    pub async fn seed(&self, entities: Vec<Entity>) -> StoreResult<Tick> {
        let unit = ChangeToApply {
            changes: entities.into_iter().map(ProposedChange::create).collect(),
            ..ChangeToApply::default()
        };
        self.apply(vec![unit]).await?;
        Ok(self.head().await)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Tick of the last committed batch.
    pub async fn head(&self) -> Tick {
        self.state.lock().await.journal.head()
    }

    pub async fn version_of(&self, id: EntityId) -> Version {
        self.state.lock().await.version(id)
    }

    fn ensure_healthy(&self) -> StoreResult<()> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::unavailable("memory world marked unhealthy"))
        }
    }
}

#[async_trait]
impl WorldStore for MemoryWorld {
    async fn get_with_version(&self, ids: &[EntityId]) -> StoreResult<Vec<VersionedEntity>> {
        self.ensure_healthy()?;
        let state = self.state.lock().await;
        Ok(ids.iter().map(|id| state.read(*id)).collect())
    }

    async fn apply(&self, units: Vec<ChangeToApply>) -> StoreResult<ApplyResult> {
        self.ensure_healthy()?;
        let mut state = self.state.lock().await;
        let mut result = ApplyResult::default();
        for unit in units {
            if !state.admits(&unit) {
                debug!(touched = ?unit.touched_ids(), "change rejected");
                result.outcomes.push(ApplyStatus::Conflict);
                continue;
            }
            if unit.is_empty() {
                result.outcomes.push(ApplyStatus::Success);
                continue;
            }
            let committed = state.commit(unit);
            result.outcomes.push(ApplyStatus::Success);
            result.changes.extend(committed);
        }
        Ok(result)
    }

    async fn subscribe(
        &self,
        config: SubscriptionConfig,
        signal: AbortSignal,
    ) -> StoreResult<Subscription> {
        self.ensure_healthy()?;
        let mut state = self.state.lock().await;

        let backlog = match config.resume_from {
            Some(tick) => match state.journal.since(tick) {
                Ok(records) => records
                    .into_iter()
                    .map(|r| UpdateBatch {
                        kind: UpdateKind::Incremental,
                        tick: r.tick,
                        changes: r.changes,
                    })
                    .collect(),
                Err(JournalError::Truncated { requested, oldest }) => {
                    debug!(requested, oldest, "resume point truncated, bootstrapping");
                    vec![state.bootstrap()]
                }
                Err(e) => return Err(e.into()),
            },
            None => vec![state.bootstrap()],
        };

        let (tx, rx) = mpsc::channel(self.config.subscription_buffer().max(backlog.len() + 1));
        for batch in backlog {
            tx.try_send(batch)
                .map_err(|_| StoreError::unavailable("subscription closed during backlog"))?;
        }
        state.subscribers.push(tx);
        Ok(Subscription::new(rx, signal))
    }

    async fn healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    fn health_poll(&self) -> (Duration, Duration) {
        (self.config.health_poll_initial(), self.config.health_poll_max())
    }
}

#[async_trait]
impl IndexSource for MemoryWorld {
    async fn lookup_index(&self, keys: &[IndexKey]) -> StoreResult<Vec<Option<EntityId>>> {
        self.ensure_healthy()?;
        let state = self.state.lock().await;
        Ok(keys.iter().map(|k| state.index.get(k)).collect())
    }
}

#[async_trait]
impl ProtectionSource for MemoryWorld {
    async fn acl_entities(&self, domain: &AclDomain) -> StoreResult<Vec<Entity>> {
        self.ensure_healthy()?;
        let state = self.state.lock().await;
        let mut found: Vec<Entity> = state
            .entities
            .values()
            .filter(|e| e.has(Protection::NAME) || e.has(Restoration::NAME))
            .filter(|e| {
                let Some(view) = e.narrow(&[AclComponent::NAME, Position::NAME, Size::NAME]) else {
                    return false;
                };
                match (view.get::<Position>(), view.get::<Size>()) {
                    (Ok(p), Ok(s)) => domain.overlaps(&Aabb::from_position_size(p.v, s.v)),
                    _ => {
                        warn!(entity = %e.id, "malformed region entity skipped");
                        false
                    }
                }
            })
            .cloned()
            .collect();
        found.sort_by_key(|e| e.id);
        Ok(found)
    }
}

#[async_trait]
impl IdAllocator for MemoryWorld {
    async fn allocate(&self, count: usize) -> StoreResult<Vec<EntityId>> {
        self.ensure_healthy()?;
        let mut state = self.state.lock().await;
        let start = state.next_id;
        state.next_id += count as u64;
        Ok((start..state.next_id).map(EntityId::new).collect())
    }
}
