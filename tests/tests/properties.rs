//! Engine-wide guarantees checked against the sample game.

use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use terra_core::{Change, IndexKey};
use terra_tests::prelude::*;
use terra_transaction::{EventOutcome, TransactionError};
use terra_world::{AbortSignal, IndexSource, SubscriptionConfig, UpdateKind, WorldStore};

#[tokio::test]
async fn test_planning_is_deterministic() {
    init_tracing();

    // GIVEN
    let harness = Harness::new(vec![shard(5).unwrap()]).await.unwrap();
    let mine = GameEvent::Mine { shard: EntityId::new(5) };

    // WHEN
    let first = harness.driver.plan(&mine).await.unwrap();
    let second = harness.driver.plan(&mine).await.unwrap();

    // THEN the submitted units are identical on the wire
    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
    assert_eq!(harness.store.calls().applies, 0);
}

#[tokio::test]
async fn test_conflicted_unit_lands_nothing() {
    init_tracing();

    // GIVEN a single attempt and a concurrent writer touching the player
    let player_id = EntityId::new(42);
    let config = test_config().with_max_attempts(1);
    let harness = Harness::with_config(vec![player(42, 3).unwrap()], config).await.unwrap();
    harness.store.interfere_with(touch(player_id, 1));

    // WHEN
    let outcome = harness.driver.process(&GameEvent::Stow { player: player_id }).await;

    // THEN neither the inventory change nor the stowed entity landed
    match &outcome {
        EventOutcome::Failed { error } => assert!(matches!(
            error.as_ref(),
            TransactionError::ExhaustedAttempts { attempts: 1, .. }
        )),
        other => panic!("expected failure, got {other:?}"),
    }
    let player = harness.entity(player_id).await.unwrap().unwrap();
    assert_eq!(player.get::<Inventory>().unwrap(), Some(Inventory { slots: 3 }));
    assert_eq!(harness.version(player_id).await, Version::new(2));
    let stowed = harness
        .world
        .lookup_index(&[IndexKey::new(BY_LABEL, format!("stow of {player_id}"))])
        .await
        .unwrap();
    assert_eq!(stowed, vec![None]);
}

#[tokio::test]
async fn test_one_commit_is_one_tick() {
    init_tracing();

    // GIVEN a subscriber caught up to the head
    let player_id = EntityId::new(42);
    let harness = Harness::new(vec![player(42, 3).unwrap()]).await.unwrap();
    let head = harness.world.head().await;
    let mut updates = harness
        .world
        .subscribe(SubscriptionConfig::resume_from(head), AbortSignal::never())
        .await
        .unwrap();

    // WHEN a stow updates the player and creates an entity
    let outcome = harness.driver.process(&GameEvent::Stow { player: player_id }).await;

    // THEN both changes arrive together, once, at the next tick
    assert_eq!(outcome.tick(), Some(head + 1));
    let batch = updates.next().await.unwrap();
    assert_eq!(batch.kind, UpdateKind::Incremental);
    assert_eq!(batch.tick, head + 1);
    assert_eq!(batch.changes, outcome.changes().to_vec());
    let versions: Vec<(bool, Version)> = batch
        .changes
        .iter()
        .map(|c| (matches!(c, Change::Create { .. }), c.version()))
        .collect();
    assert_eq!(versions, vec![(false, Version::new(2)), (true, Version::new(1))]);
    assert!(updates.try_next().is_none());
}

#[tokio::test]
async fn test_spawned_ids_are_fresh() {
    // GIVEN / WHEN
    let harness = Scenario::new("fresh_ids")
        .seed([shard(1).unwrap(), shard(2).unwrap(), shard(3).unwrap()])
        .step("spawn_five", GameEvent::Spawn { count: 5 }, |a| a.committed().created(5))
        .run()
        .await
        .unwrap();

    // THEN
    let head = harness.world.head().await;
    let mut updates = harness
        .world
        .subscribe(SubscriptionConfig::resume_from(head - 1), AbortSignal::never())
        .await
        .unwrap();
    let batch = updates.next().await.unwrap();
    let ids: BTreeSet<EntityId> = batch.changes.iter().map(Change::id).collect();
    assert_eq!(ids.len(), 5);
    assert!(ids.iter().all(|id| id.raw() > 3), "{ids:?}");
}

#[tokio::test]
async fn test_unresolved_key_reads_nothing() {
    // GIVEN / WHEN
    let harness = Scenario::new("unresolved_key")
        .seed([labelled(9, "anvil").unwrap()])
        .step(
            "rename_nobody",
            GameEvent::Rename {
                label: "nobody".into(),
                to: "somebody".into(),
            },
            |a| a.rolled_back(),
        )
        .run()
        .await
        .unwrap();

    // THEN the lookup happened but no entity was fetched
    let calls = harness.store.calls();
    assert_eq!(calls.index_lookups, 1);
    assert!(calls.reads.is_empty(), "{:?}", calls.reads);
    assert_eq!(calls.applies, 0);
}

#[tokio::test]
async fn test_resolved_key_renames() {
    let harness = Scenario::new("resolved_key")
        .seed([labelled(9, "anvil").unwrap()])
        .step(
            "rename_anvil",
            GameEvent::Rename {
                label: "anvil".into(),
                to: "hammer".into(),
            },
            |a| a.committed().updated(1),
        )
        .run()
        .await
        .unwrap();

    let calls = harness.store.calls();
    assert_eq!(calls.reads, vec![vec![EntityId::new(9)]]);
    let found = harness
        .world
        .lookup_index(&[IndexKey::new(BY_LABEL, "hammer"), IndexKey::new(BY_LABEL, "anvil")])
        .await
        .unwrap();
    assert_eq!(found, vec![Some(EntityId::new(9)), None]);
}

#[tokio::test]
async fn test_rollback_writes_nothing() {
    // GIVEN / WHEN
    let harness = Scenario::new("rollback")
        .seed([player(3, 1).unwrap()])
        .step("abstain", GameEvent::Abstain { player: EntityId::new(3) }, |a| {
            a.rolled_back().custom(|o| {
                matches!(o, EventOutcome::RolledBack { reason } if reason == "changed my mind")
            })
        })
        .run()
        .await
        .unwrap();

    // THEN
    assert_eq!(harness.store.calls().applies, 0);
    assert_eq!(harness.version(EntityId::new(3)).await, Version::new(1));
    assert!(harness.firehose.events().await.is_empty());
    let player = harness.entity(EntityId::new(3)).await.unwrap().unwrap();
    assert_eq!(player.get::<Counter>().unwrap(), None);
}
