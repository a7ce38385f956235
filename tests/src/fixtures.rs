//! World fixtures and the wired-up harness.

use serde_json::json;
use std::sync::Arc;
use terra_acl::{Acl, AclComponent, Position, Protection, Size, Vec3};
use terra_core::{
    ChangeToApply, Component, CoreResult, EngineConfig, Entity, EntityId, EntityPatch, ProposedChange, Version,
};
use terra_event::MemoryFirehose;
use terra_transaction::{Backend, EventDriver};
use terra_world::{MemoryWorld, StoreResult, WorldStore};

use crate::error::ScenarioResult;
use crate::game::{self, Contents, Counter, GameEvent, Inventory, Label, Wallet};
use crate::store::InstrumentedStore;

/// Engine settings for tests: no retry sleeps.
pub fn test_config() -> EngineConfig {
    EngineConfig::default().with_backoff_ms(0, 0)
}

pub fn player(id: u64, slots: u32) -> CoreResult<Entity> {
    Entity::new(EntityId::new(id)).with(&Inventory { slots })
}

pub fn shard(id: u64) -> CoreResult<Entity> {
    Entity::new(EntityId::new(id)).with(&Counter::default())
}

pub fn wallet(id: u64, coins: u64) -> CoreResult<Entity> {
    Entity::new(EntityId::new(id)).with(&Wallet { coins })
}

pub fn labelled(id: u64, text: &str) -> CoreResult<Entity> {
    Entity::new(EntityId::new(id)).with(&Label { text: text.into() })
}

pub fn container(id: u64, ids: &[u64]) -> CoreResult<Entity> {
    Entity::new(EntityId::new(id)).with(&Contents {
        ids: ids.iter().copied().map(EntityId::new).collect(),
    })
}

/// A protected box from `min` spanning `size`.
pub fn region(id: u64, min: Vec3, size: Vec3, acl: Acl) -> CoreResult<Entity> {
    Entity::new(EntityId::new(id))
        .with(&Position { v: min })?
        .with(&Size { v: size })?
        .with(&AclComponent { acl })?
        .with(&Protection { timestamp: Some(1.0) })
}

/// A unit replacing the ACL of a region entity.
pub fn set_acl(region: EntityId, acl: Acl) -> CoreResult<ChangeToApply> {
    let mut patch = EntityPatch::new(region);
    patch.set(AclComponent::NAME, terra_core::encode_component(&AclComponent { acl })?);
    Ok(ChangeToApply {
        changes: vec![ProposedChange::update(patch)],
        ..ChangeToApply::default()
    })
}

/// A unit touching `id` so its version moves on.
pub fn touch(id: EntityId, revision: u64) -> ChangeToApply {
    let mut patch = EntityPatch::new(id);
    patch.set("revision", json!(revision));
    ChangeToApply {
        changes: vec![ProposedChange::update(patch)],
        ..ChangeToApply::default()
    }
}

/// Commit unconditional touches until `id` reaches `target`.
pub async fn advance_version(
    world: &MemoryWorld,
    id: EntityId,
    target: Version,
) -> StoreResult<()> {
    let mut revision = 0;
    while world.version_of(id).await < target {
        revision += 1;
        world.apply(vec![touch(id, revision)]).await?;
    }
    Ok(())
}

/// A driver over an instrumented in-memory world with a recording firehose.
pub struct Harness {
    pub world: Arc<MemoryWorld>,
    pub store: Arc<InstrumentedStore>,
    pub firehose: Arc<MemoryFirehose>,
    pub driver: EventDriver<GameEvent>,
}

impl Harness {
    pub async fn new(seed: Vec<Entity>) -> ScenarioResult<Self> {
        Self::with_config(seed, test_config()).await
    }

    pub async fn with_config(seed: Vec<Entity>, config: EngineConfig) -> ScenarioResult<Self> {
        let world = Arc::new(MemoryWorld::with_indexes(config.clone(), game::indexes()));
        if !seed.is_empty() {
            world.seed(seed).await?;
        }
        let store = Arc::new(InstrumentedStore::new(world.clone()));
        let firehose = Arc::new(MemoryFirehose::new());
        let backend = Backend::shared(store.clone()).with_firehose(firehose.clone());
        let driver = EventDriver::new(game::registry()?, backend, config);
        Ok(Self {
            world,
            store,
            firehose,
            driver,
        })
    }

    pub async fn entity(&self, id: EntityId) -> StoreResult<Option<Entity>> {
        Ok(self.world.get(&[id]).await?.into_iter().next().flatten())
    }

    pub async fn version(&self, id: EntityId) -> Version {
        self.world.version_of(id).await
    }
}
