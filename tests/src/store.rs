//! An instrumented store wrapper for probing the driver.
//!
//! Delegates to a [`MemoryWorld`] and records every call. It can also slip a
//! concurrent writer's change in ahead of a commit, hold commits at a
//! barrier so attempts interleave, and fail commits transiently.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use terra_acl::AclDomain;
use terra_core::{ChangeToApply, Entity, EntityId, IndexKey};
use terra_world::{
    AbortSignal, ApplyResult, IdAllocator, IndexSource, MemoryWorld, ProtectionSource, StoreError,
    StoreResult, Subscription, SubscriptionConfig, VersionedEntity, WorldStore,
};
use tokio::sync::Barrier;
use tracing::debug;

/// Counts of calls that reached the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallLog {
    pub reads: Vec<Vec<EntityId>>,
    pub applies: usize,
    pub index_lookups: usize,
    pub allocations: usize,
    pub acl_scans: usize,
}

impl CallLog {
    /// Total calls of any kind.
    pub fn total(&self) -> usize {
        self.reads.len() + self.applies + self.index_lookups + self.allocations + self.acl_scans
    }
}

#[derive(Debug)]
struct Gate {
    barrier: Barrier,
    remaining: AtomicUsize,
}

/// A [`MemoryWorld`] with hooks.
#[derive(Debug)]
pub struct InstrumentedStore {
    inner: Arc<MemoryWorld>,
    calls: Mutex<CallLog>,
    interference: Mutex<VecDeque<ChangeToApply>>,
    failures: AtomicUsize,
    gate: Mutex<Option<Arc<Gate>>>,
}

impl InstrumentedStore {
    pub fn new(inner: Arc<MemoryWorld>) -> Self {
        Self {
            inner,
            calls: Mutex::new(CallLog::default()),
            interference: Mutex::new(VecDeque::new()),
            failures: AtomicUsize::new(0),
            gate: Mutex::new(None),
        }
    }

    pub fn inner(&self) -> &Arc<MemoryWorld> {
        &self.inner
    }

    pub fn calls(&self) -> CallLog {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Commit `unit` directly just before the next apply reaches the store.
    pub fn interfere_with(&self, unit: ChangeToApply) {
        if let Ok(mut queue) = self.interference.lock() {
            queue.push_back(unit);
        }
    }

    /// Fail the next `count` applies as unavailable.
    pub fn fail_next_applies(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Hold the next `parties` applies until all of them have arrived.
    pub fn gate_applies(&self, parties: usize) {
        if let Ok(mut gate) = self.gate.lock() {
            *gate = Some(Arc::new(Gate {
                barrier: Barrier::new(parties),
                remaining: AtomicUsize::new(parties),
            }));
        }
    }

    fn record(&self, f: impl FnOnce(&mut CallLog)) {
        if let Ok(mut calls) = self.calls.lock() {
            f(&mut calls);
        }
    }

    fn take_gate(&self) -> Option<Arc<Gate>> {
        let gate = self.gate.lock().ok()?.clone()?;
        gate.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .ok()
            .map(|_| gate)
    }
}

#[async_trait]
impl WorldStore for InstrumentedStore {
    async fn get_with_version(&self, ids: &[EntityId]) -> StoreResult<Vec<VersionedEntity>> {
        self.record(|c| c.reads.push(ids.to_vec()));
        self.inner.get_with_version(ids).await
    }

    async fn apply(&self, units: Vec<ChangeToApply>) -> StoreResult<ApplyResult> {
        self.record(|c| c.applies += 1);
        if let Some(gate) = self.take_gate() {
            gate.barrier.wait().await;
        }
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::unavailable("injected failure"));
        }
        let interfering = self.interference.lock().ok().and_then(|mut q| q.pop_front());
        if let Some(unit) = interfering {
            debug!(touched = ?unit.touched_ids(), "interfering write");
            self.inner.apply(vec![unit]).await?;
        }
        self.inner.apply(units).await
    }

    async fn subscribe(
        &self,
        config: SubscriptionConfig,
        signal: AbortSignal,
    ) -> StoreResult<Subscription> {
        self.inner.subscribe(config, signal).await
    }

    async fn healthy(&self) -> bool {
        self.inner.healthy().await
    }

    fn health_poll(&self) -> (Duration, Duration) {
        self.inner.health_poll()
    }
}

#[async_trait]
impl IndexSource for InstrumentedStore {
    async fn lookup_index(&self, keys: &[IndexKey]) -> StoreResult<Vec<Option<EntityId>>> {
        self.record(|c| c.index_lookups += 1);
        self.inner.lookup_index(keys).await
    }
}

#[async_trait]
impl ProtectionSource for InstrumentedStore {
    async fn acl_entities(&self, domain: &AclDomain) -> StoreResult<Vec<Entity>> {
        self.record(|c| c.acl_scans += 1);
        self.inner.acl_entities(domain).await
    }
}

#[async_trait]
impl IdAllocator for InstrumentedStore {
    async fn allocate(&self, count: usize) -> StoreResult<Vec<EntityId>> {
        self.record(|c| c.allocations += 1);
        self.inner.allocate(count).await
    }
}
