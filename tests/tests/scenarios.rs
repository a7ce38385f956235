//! End-to-end scenarios: a stow against an advanced version, two miners
//! racing for one shard, and an over-sized spawn.

use pretty_assertions::assert_eq;
use terra_core::{Change, ChangeToApply, Component, EntityPatch, Iff, ProposedChange};
use terra_tests::prelude::*;
use terra_transaction::EventOutcome;
use terra_world::WorldStore;

/// Commit inventory rewrites until `id` reaches `target`.
async fn restock(harness: &Harness, id: EntityId, target: Version) {
    let mut slots = 3;
    while harness.version(id).await < target {
        slots += 1;
        let mut patch = EntityPatch::new(id);
        patch.set(Inventory::NAME, terra_core::encode_component(&Inventory { slots }).unwrap());
        let unit = ChangeToApply {
            changes: vec![ProposedChange::update(patch)],
            ..ChangeToApply::default()
        };
        harness.world.apply(vec![unit]).await.unwrap();
    }
}

#[tokio::test]
async fn test_stow_guards_the_version_it_read() {
    init_tracing();

    // GIVEN a player at version 7
    let player_id = EntityId::new(42);
    let harness = Harness::new(vec![player(42, 3).unwrap()]).await.unwrap();
    restock(&harness, player_id, Version::new(7)).await;
    let event = GameEvent::Stow { player: player_id };

    // WHEN the stow is planned
    let planned = harness.driver.plan(&event).await.unwrap();

    // THEN the only precondition is the player at the version it was read
    assert_eq!(
        planned.iffs,
        vec![Iff::new(player_id, Version::new(7), vec![Inventory::NAME.to_string()])]
    );

    // WHEN it is processed
    let outcome = harness.driver.process(&event).await;

    // THEN the player moves to version 8 and the stowed entity exists
    assert!(outcome.is_committed(), "{outcome:?}");
    assert_eq!(harness.version(player_id).await, Version::new(8));
    let created: Vec<EntityId> = outcome
        .changes()
        .iter()
        .filter_map(|c| match c {
            Change::Create { entity, .. } => Some(entity.id),
            _ => None,
        })
        .collect();
    assert_eq!(created.len(), 1);
    let stowed = harness.entity(created[0]).await.unwrap().unwrap();
    assert_eq!(
        stowed.get::<Label>().unwrap(),
        Some(Label {
            text: format!("stow of {player_id}")
        })
    );
}

#[tokio::test]
async fn test_contended_shard_commits_both_miners() {
    init_tracing();

    // GIVEN a shard at version 3 and two commits held until both arrive
    let shard_id = EntityId::new(100);
    let harness = Harness::new(vec![shard(100).unwrap()]).await.unwrap();
    advance_version(&harness.world, shard_id, Version::new(3)).await.unwrap();
    harness.store.gate_applies(2);
    let mine = GameEvent::Mine { shard: shard_id };

    // WHEN two miners run concurrently
    let (a, b) = tokio::join!(harness.driver.process(&mine), harness.driver.process(&mine));

    // THEN one wins on its first attempt and the other after one retry
    let mut attempts: Vec<u32> = [a, b]
        .iter()
        .map(|o| match o {
            EventOutcome::Committed { attempts, .. } => *attempts,
            other => panic!("expected a commit, got {other:?}"),
        })
        .collect();
    attempts.sort();
    assert_eq!(attempts, vec![1, 2]);
    assert_eq!(harness.version(shard_id).await, Version::new(5));
    let counter = harness.entity(shard_id).await.unwrap().unwrap().get::<Counter>().unwrap();
    assert_eq!(counter, Some(Counter { value: 2 }));
    assert_eq!(harness.store.calls().applies, 3);
}

#[tokio::test]
async fn test_oversized_spawn_never_reaches_the_store() {
    // GIVEN / WHEN
    let harness = Scenario::new("oversized_spawn")
        .step("spawn_200", GameEvent::Spawn { count: 200 }, |a| a.error("up to 100 ids"))
        .run()
        .await
        .unwrap();

    // THEN
    assert_eq!(harness.store.calls().total(), 0);
    assert_eq!(harness.world.head().await, 0);
}

#[tokio::test]
async fn test_stow_until_empty() {
    let harness = Scenario::new("stow_until_empty")
        .seed([player(7, 2).unwrap()])
        .step("first", GameEvent::Stow { player: EntityId::new(7) }, |a| {
            a.committed().updated(1).created(1).attempts(1)
        })
        .step("second", GameEvent::Stow { player: EntityId::new(7) }, |a| {
            a.committed().updated(1).created(1)
        })
        .step("empty", GameEvent::Stow { player: EntityId::new(7) }, |a| a.rolled_back())
        .step("missing", GameEvent::Stow { player: EntityId::new(8) }, |a| {
            a.unsatisfied()
                .custom(|o| matches!(o, EventOutcome::Unsatisfied { name } if name == "player"))
        })
        .run()
        .await
        .unwrap();

    let inventory = harness
        .entity(EntityId::new(7))
        .await
        .unwrap()
        .unwrap()
        .get::<Inventory>()
        .unwrap();
    assert_eq!(inventory, Some(Inventory { slots: 0 }));
}
