//! Integration tests for the sea-orm graph store.
//!
//! These tests require the `sqlite` and `migrate` features to be enabled
//! and use an in-memory SQLite database.

#![cfg(all(feature = "sqlite", feature = "migrate"))]

use chrono::{TimeZone, Utc};
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;
use twixter::entity::prelude::{FollowEdge, ProfileEntity};
use twixter::store::{GraphStore, SeaOrmGraphStore, StoreError, UPSERT_CHUNK_SIZE};
use twixter::{Profile, connect_and_migrate};

/// Create a store over an in-memory SQLite database with migrations applied.
async fn setup_store() -> SeaOrmGraphStore {
    let db = connect_and_migrate("sqlite::memory:")
        .await
        .expect("Failed to create test database");
    SeaOrmGraphStore::new(db)
}

fn profile(username: &str, followers: u64) -> Profile {
    Profile {
        name: username.to_uppercase(),
        followers_count: followers,
        ..Profile::new(format!("id-{username}"), username)
    }
}

fn usernames(profiles: &[Profile]) -> Vec<&str> {
    profiles.iter().map(|p| p.username.as_str()).collect()
}

async fn edge_count(store: &SeaOrmGraphStore) -> u64 {
    FollowEdge::find()
        .count(store.connection())
        .await
        .expect("count edges")
}

// ─── Profiles ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_profile_unknown_username_is_not_found() {
    let store = setup_store().await;

    let err = store
        .get_profile("doesnotexist")
        .await
        .expect_err("missing profile should error");

    assert!(matches!(err, StoreError::NotFound { ref username } if username == "doesnotexist"));
}

#[tokio::test]
async fn test_save_and_load_round_trips_every_field() {
    let store = setup_store().await;

    let mut alice = profile("alice", 3);
    alice.location = "Berlin".to_string();
    alice.bio = "hello".to_string();
    alice.url = "https://t.co/abc".to_string();
    alice.verified = true;
    alice.posts_count = 1234;
    alice.joined_at = Some(Utc.with_ymd_and_hms(2018, 10, 10, 20, 19, 24).unwrap());
    alice.entities = json!({
        "url": {"urls": [{"expanded_url": "https://example.com", "indices": [0, 23]}]},
        "description": {"urls": []},
        "flag": true,
        "missing": null,
    })
    .as_object()
    .cloned()
    .unwrap();

    store.save_profile(&alice).await.expect("save");
    let loaded = store.get_profile("alice").await.expect("load");

    assert_eq!(loaded.external_id, "id-alice");
    assert_eq!(loaded.location, "Berlin");
    assert_eq!(loaded.bio, "hello");
    assert!(loaded.verified);
    assert_eq!(loaded.followers_count, 3);
    assert_eq!(loaded.posts_count, 1234);
    assert_eq!(loaded.joined_at, alice.joined_at);
    assert_eq!(loaded.entities, alice.entities);
    assert!(loaded.created_at.is_some());
    assert!(loaded.updated_at.is_some());
}

#[tokio::test]
async fn test_empty_entities_save_successfully() {
    let store = setup_store().await;

    store.save_profile(&profile("bare", 0)).await.expect("save");
    let loaded = store.get_profile("bare").await.expect("load");

    assert!(loaded.entities.is_empty());
}

#[tokio::test]
async fn test_save_profile_overwrites_by_username_and_keeps_created_at() {
    let store = setup_store().await;

    store.save_profile(&profile("alice", 1)).await.expect("first save");
    let first = store.get_profile("alice").await.expect("load");

    let mut renamed = profile("alice", 99);
    renamed.name = "Alice Liddell".to_string();
    store.save_profile(&renamed).await.expect("second save");
    let second = store.get_profile("alice").await.expect("load");

    assert_eq!(second.name, "Alice Liddell");
    assert_eq!(second.followers_count, 99);
    assert_eq!(second.created_at, first.created_at);

    let rows = ProfileEntity::find()
        .count(store.connection())
        .await
        .expect("count");
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_save_profiles_last_duplicate_wins() {
    let store = setup_store().await;

    let written = store
        .save_profiles(&[profile("bob", 1), profile("carol", 2), profile("bob", 7)])
        .await
        .expect("save batch");

    assert_eq!(written, 2);
    assert_eq!(store.get_profile("bob").await.unwrap().followers_count, 7);
}

#[tokio::test]
async fn test_save_profiles_rolls_back_whole_batch_on_conflict() {
    let store = setup_store().await;
    store.save_profile(&profile("alice", 1)).await.expect("seed");

    // Enough rows to span several statements, with two handles claiming the
    // same external id at the end.
    let mut batch: Vec<Profile> = (0..UPSERT_CHUNK_SIZE + 1)
        .map(|i| profile(&format!("user{i}"), 0))
        .collect();
    for username in ["mallory", "trent"] {
        let mut imposter = profile(username, 0);
        imposter.external_id = "id-shared".to_string();
        batch.push(imposter);
    }

    let err = store
        .save_profiles(&batch)
        .await
        .expect_err("external_id conflict should fail");
    assert!(matches!(err, StoreError::Persistence { .. }));

    let rows = ProfileEntity::find()
        .count(store.connection())
        .await
        .expect("count");
    assert_eq!(rows, 1, "no row from the failed batch may be visible");
    assert!(store.get_profile("user0").await.unwrap_err().is_not_found());
}

// ─── Edges ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_add_followings_is_idempotent() {
    let store = setup_store().await;
    let alice = profile("alice", 0);
    let followings = [profile("bob", 10), profile("carol", 20)];

    let first = store
        .add_followings(&alice, &followings)
        .await
        .expect("first attach");
    let second = store
        .add_followings(&alice, &followings)
        .await
        .expect("second attach");

    assert_eq!(first, 2);
    assert_eq!(second, 0);
    assert_eq!(edge_count(&store).await, 2);

    let loaded = store.get_followings("alice").await.expect("followings");
    assert_eq!(usernames(&loaded), vec!["bob", "carol"]);
}

#[tokio::test]
async fn test_add_followers_points_edges_at_owner() {
    let store = setup_store().await;
    let alice = profile("alice", 0);

    let added = store
        .add_followers(&alice, &[profile("dave", 0), profile("erin", 0)])
        .await
        .expect("attach followers");
    assert_eq!(added, 2);

    let followers = store.get_followers("alice").await.expect("followers");
    assert_eq!(usernames(&followers), vec!["dave", "erin"]);

    let dave_follows = store.get_followings("dave").await.expect("followings");
    assert_eq!(usernames(&dave_follows), vec!["alice"]);
    assert!(store.get_followers("dave").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_self_edges_are_skipped() {
    let store = setup_store().await;
    let alice = profile("alice", 0);

    let added = store
        .add_followings(&alice, &[profile("alice", 0), profile("bob", 0)])
        .await
        .expect("attach");

    assert_eq!(added, 1);
    assert_eq!(
        usernames(&store.get_followings("alice").await.unwrap()),
        vec!["bob"]
    );
}

#[tokio::test]
async fn test_attach_refreshes_connection_profiles() {
    let store = setup_store().await;
    let alice = profile("alice", 0);

    store
        .add_followings(&alice, &[profile("bob", 1)])
        .await
        .expect("first attach");
    store
        .add_followings(&alice, &[profile("bob", 500)])
        .await
        .expect("second attach");

    let followings = store.get_followings("alice").await.unwrap();
    assert_eq!(followings.len(), 1);
    assert_eq!(followings[0].followers_count, 500);
}

#[tokio::test]
async fn test_renamed_connection_keeps_its_row_and_edges() {
    let store = setup_store().await;
    let alice = profile("alice", 0);
    store
        .add_followers(&alice, &[profile("bob", 1), profile("carol", 2)])
        .await
        .expect("first attach");
    let bob_before = store.get_profile("bob").await.expect("bob");

    // bob is now bobby; the source id stays the same.
    let mut bobby = profile("bobby", 5);
    bobby.external_id = "id-bob".to_string();
    let added = store
        .add_followers(&alice, &[bobby, profile("carol", 2), profile("dan", 3)])
        .await
        .expect("attach after rename");

    assert_eq!(added, 1);
    assert_eq!(edge_count(&store).await, 3);
    assert_eq!(
        usernames(&store.get_followers("alice").await.unwrap()),
        vec!["bobby", "carol", "dan"]
    );

    let renamed = store.get_profile("bobby").await.expect("bobby");
    assert_eq!(renamed.followers_count, 5);
    assert_eq!(renamed.created_at, bob_before.created_at);
    assert!(store.get_profile("bob").await.unwrap_err().is_not_found());

    let rows = ProfileEntity::find()
        .count(store.connection())
        .await
        .expect("count");
    assert_eq!(rows, 4);
}

#[tokio::test]
async fn test_save_profile_follows_handle_change_and_frees_old_handle() {
    let store = setup_store().await;
    store.save_profile(&profile("alice", 1)).await.expect("seed");

    let mut alicia = profile("alicia", 2);
    alicia.external_id = "id-alice".to_string();
    store.save_profile(&alicia).await.expect("save renamed");

    // Someone else now claims the old handle.
    let mut newcomer = profile("alice", 0);
    newcomer.external_id = "id-alice-new".to_string();
    store
        .save_profile(&newcomer)
        .await
        .expect("reuse old handle");

    assert_eq!(store.get_profile("alicia").await.unwrap().external_id, "id-alice");
    assert_eq!(store.get_profile("alice").await.unwrap().external_id, "id-alice-new");
}

#[tokio::test]
async fn test_relation_reads_for_unknown_owner_are_not_found() {
    let store = setup_store().await;

    assert!(store.get_followings("ghost").await.unwrap_err().is_not_found());
    assert!(store.get_followers("ghost").await.unwrap_err().is_not_found());
    assert!(
        store
            .get_top_followers_by_followers("ghost", 5)
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn test_known_owner_without_edges_reads_empty() {
    let store = setup_store().await;
    store.save_profile(&profile("loner", 0)).await.unwrap();

    assert!(store.get_followings("loner").await.unwrap().is_empty());
    assert!(store.get_followers("loner").await.unwrap().is_empty());
}

// ─── Top-N ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_top_followings_rank_by_follower_count_then_username() {
    let store = setup_store().await;
    let alice = profile("alice", 0);
    store
        .add_followings(
            &alice,
            &[
                profile("bob", 5),
                profile("dave", 50),
                profile("carol", 50),
                profile("erin", 1),
            ],
        )
        .await
        .expect("attach");

    let top = store
        .get_top_followings_by_followers("alice", 2)
        .await
        .expect("top 2");
    assert_eq!(usernames(&top), vec!["carol", "dave"]);

    let all = store
        .get_top_followings_by_followers("alice", 10)
        .await
        .expect("top 10");
    assert_eq!(usernames(&all), vec!["carol", "dave", "bob", "erin"]);

    let none = store
        .get_top_followings_by_followers("alice", 0)
        .await
        .expect("top 0");
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_top_followers_only_ranks_followers() {
    let store = setup_store().await;
    let alice = profile("alice", 0);
    store
        .add_followers(&alice, &[profile("fan", 3), profile("celebrity", 1_000_000)])
        .await
        .expect("attach followers");
    store
        .add_followings(&alice, &[profile("idol", 5_000_000)])
        .await
        .expect("attach followings");

    let top = store
        .get_top_followers_by_followers("alice", 1)
        .await
        .expect("top follower");
    assert_eq!(usernames(&top), vec!["celebrity"]);
}
