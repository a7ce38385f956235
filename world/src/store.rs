//! The world store contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use terra_acl::AclDomain;
use terra_core::{
    ApplyStatus, Change, ChangeToApply, EngineConfig, Entity, EntityId, IndexKey, Tick, Version,
};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::signal::AbortSignal;

/// An entity read together with its current version.
///
/// `entity` is `None` for ids that do not exist; `version` is then either
/// [`Version::ABSENT`] or the version the entity had when it was deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedEntity {
    pub version: Version,
    pub entity: Option<Entity>,
}

impl VersionedEntity {
    pub fn absent(version: Version) -> Self {
        Self {
            version,
            entity: None,
        }
    }

    pub fn exists(&self) -> bool {
        self.entity.is_some()
    }
}

/// Result of one apply call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyResult {
    /// One status per submitted unit, in submission order.
    pub outcomes: Vec<ApplyStatus>,
    /// Everything that committed, in commit order.
    pub changes: Vec<Change>,
}

impl ApplyResult {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|s| *s == ApplyStatus::Success)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateKind {
    /// Full state of every live entity as of `tick`.
    Bootstrap,
    /// The changes committed at `tick`.
    Incremental,
}

/// One batch on a subscription stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateBatch {
    pub kind: UpdateKind,
    pub tick: Tick,
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriptionConfig {
    /// Resume after this tick instead of bootstrapping, if still retained.
    pub resume_from: Option<Tick>,
}

impl SubscriptionConfig {
    pub fn resume_from(tick: Tick) -> Self {
        Self {
            resume_from: Some(tick),
        }
    }
}

/// An ordered stream of update batches.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::Receiver<UpdateBatch>,
    signal: AbortSignal,
}

impl Subscription {
    pub fn new(rx: mpsc::Receiver<UpdateBatch>, signal: AbortSignal) -> Self {
        Self { rx, signal }
    }

    /// Next batch, or `None` once the store closed the stream or the signal
    /// fired.
    pub async fn next(&mut self) -> Option<UpdateBatch> {
        if self.signal.is_aborted() {
            return None;
        }
        tokio::select! {
            batch = self.rx.recv() => batch,
            _ = self.signal.aborted() => None,
        }
    }

    /// Next batch if one is already queued.
    pub fn try_next(&mut self) -> Option<UpdateBatch> {
        if self.signal.is_aborted() {
            return None;
        }
        self.rx.try_recv().ok()
    }
}

/// The versioned entity store.
#[async_trait]
pub trait WorldStore: Send + Sync {
    /// Batch read; one result per requested id, in request order.
    async fn get_with_version(&self, ids: &[EntityId]) -> StoreResult<Vec<VersionedEntity>>;

    /// Apply units atomically each; a conflicted unit lands nothing.
    async fn apply(&self, units: Vec<ChangeToApply>) -> StoreResult<ApplyResult>;

    async fn subscribe(
        &self,
        config: SubscriptionConfig,
        signal: AbortSignal,
    ) -> StoreResult<Subscription>;

    async fn healthy(&self) -> bool;

    /// Initial and maximum delay between health polls.
    fn health_poll(&self) -> (Duration, Duration) {
        let defaults = EngineConfig::default();
        (defaults.health_poll_initial(), defaults.health_poll_max())
    }

    /// Batch read without versions.
    async fn get(&self, ids: &[EntityId]) -> StoreResult<Vec<Option<Entity>>> {
        let read = self.get_with_version(ids).await?;
        Ok(read.into_iter().map(|v| v.entity).collect())
    }

    /// The subset of `ids` that currently exist, in request order.
    async fn has(&self, ids: &[EntityId]) -> StoreResult<Vec<EntityId>> {
        let read = self.get_with_version(ids).await?;
        Ok(ids
            .iter()
            .zip(read)
            .filter(|(_, v)| v.exists())
            .map(|(id, _)| *id)
            .collect())
    }

    /// Poll [`healthy`](Self::healthy) with exponential backoff.
    async fn wait_for_healthy(&self, timeout: Duration, signal: &AbortSignal) -> StoreResult<()> {
        let (mut delay, max_delay) = self.health_poll();
        let deadline = Instant::now() + timeout;
        loop {
            if signal.is_aborted() {
                return Err(StoreError::Aborted);
            }
            if self.healthy().await {
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(StoreError::unhealthy(timeout));
            }
            debug!(?delay, "store unhealthy, polling again");
            tokio::select! {
                _ = tokio::time::sleep(delay.min(deadline - now)) => {}
                _ = signal.aborted() => return Err(StoreError::Aborted),
            }
            delay = (delay * 2).min(max_delay);
        }
    }
}

/// Secondary-index lookups.
#[async_trait]
pub trait IndexSource: Send + Sync {
    /// One answer per key; unknown keys yield `None`.
    async fn lookup_index(&self, keys: &[IndexKey]) -> StoreResult<Vec<Option<EntityId>>>;
}

/// Spatial scan of ACL region entities.
#[async_trait]
pub trait ProtectionSource: Send + Sync {
    /// Protection and restoration entities overlapping `domain`.
    async fn acl_entities(&self, domain: &AclDomain) -> StoreResult<Vec<Entity>>;
}

/// Allocation of never-used entity ids.
#[async_trait]
pub trait IdAllocator: Send + Sync {
    async fn allocate(&self, count: usize) -> StoreResult<Vec<EntityId>>;
}
