//! SQLite session store tests

use gtier_common::db::init_database;
use gtier_common::events::RankingPhase;
use gtier_common::Error;
use gtier_rank::models::{Item, ItemId, OwnerId, RankingSession, SessionOptions};
use gtier_rank::store::{SessionStore, SqliteSessionStore};
use serde_json::json;
use tempfile::TempDir;

async fn setup_store() -> (TempDir, SqliteSessionStore) {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("gtier.db")).await.unwrap();
    (dir, SqliteSessionStore::new(pool))
}

fn session(owner: &str, n: i64) -> RankingSession {
    let items = (1..=n)
        .map(|id| Item::new(ItemId(id), "RPG", json!({ "name": format!("Game {}", id) })))
        .collect();
    RankingSession::start(OwnerId::new(owner), items, SessionOptions::default())
}

#[tokio::test]
async fn test_get_missing_owner_is_none() {
    let (_dir, store) = setup_store().await;
    assert!(store.get(&OwnerId::new("nobody")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_round_trip_preserves_session_mid_merge() {
    let (_dir, store) = setup_store().await;
    let mut s = session("alice", 6);
    let (a, b) = s.pending_pair().unwrap();
    s.answer(b, a).unwrap();

    store.create(&s).await.unwrap();
    let loaded = store.get(&OwnerId::new("alice")).await.unwrap().unwrap();

    assert_eq!(loaded, s);
    assert_eq!(loaded.pending_pair(), s.pending_pair());
    assert_eq!(loaded.items[0].payload["name"], "Game 1");
}

#[tokio::test]
async fn test_create_overwrites_prior_session() {
    let (_dir, store) = setup_store().await;
    let first = session("bob", 3);
    let second = session("bob", 4);

    store.create(&first).await.unwrap();
    store.create(&second).await.unwrap();

    let loaded = store.get(&OwnerId::new("bob")).await.unwrap().unwrap();
    assert_eq!(loaded.session_id, second.session_id);
    assert_eq!(loaded.items.len(), 4);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ranking_sessions WHERE owner = 'bob'")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_owners_are_independent() {
    let (_dir, store) = setup_store().await;
    store.create(&session("carol", 3)).await.unwrap();
    store.create(&session("dana", 5)).await.unwrap();

    assert!(store.delete(&OwnerId::new("carol")).await.unwrap());

    assert!(store.get(&OwnerId::new("carol")).await.unwrap().is_none());
    let dana = store.get(&OwnerId::new("dana")).await.unwrap().unwrap();
    assert_eq!(dana.items.len(), 5);
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let (_dir, store) = setup_store().await;
    store.create(&session("erin", 2)).await.unwrap();

    assert!(store.delete(&OwnerId::new("erin")).await.unwrap());
    assert!(!store.delete(&OwnerId::new("erin")).await.unwrap());
}

#[tokio::test]
async fn test_compare_and_save_advances_revision() {
    let (_dir, store) = setup_store().await;
    let mut s = session("finn", 2);
    store.create(&s).await.unwrap();

    s.answer(ItemId(1), ItemId(2)).unwrap();
    store.compare_and_save(&s, 0).await.unwrap();

    let loaded = store.get(&OwnerId::new("finn")).await.unwrap().unwrap();
    assert_eq!(loaded.revision, 1);
    assert_eq!(loaded.phase, RankingPhase::Finished);

    let (phase, revision): (String, i64) =
        sqlx::query_as("SELECT phase, revision FROM ranking_sessions WHERE owner = 'finn'")
            .fetch_one(store.pool())
            .await
            .unwrap();
    assert_eq!(phase, "FINISHED");
    assert_eq!(revision, 1);
}

#[tokio::test]
async fn test_compare_and_save_conflict_leaves_row_untouched() {
    let (_dir, store) = setup_store().await;
    let original = session("gail", 4);
    store.create(&original).await.unwrap();

    // Two writers read revision 0 and answer the same pair
    let mut first = original.clone();
    let mut second = original.clone();
    first.answer(ItemId(1), ItemId(2)).unwrap();
    second.answer(ItemId(2), ItemId(1)).unwrap();

    store.compare_and_save(&first, 0).await.unwrap();
    let result = store.compare_and_save(&second, 0).await;
    assert!(matches!(result, Err(Error::Conflict(_))));

    let loaded = store.get(&OwnerId::new("gail")).await.unwrap().unwrap();
    assert_eq!(loaded, first);
}

#[tokio::test]
async fn test_compare_and_save_against_restarted_session_conflicts() {
    let (_dir, store) = setup_store().await;
    let mut old = session("hank", 3);
    store.create(&old).await.unwrap();

    // Restart replaces the row with a new session at revision 0
    store.create(&session("hank", 3)).await.unwrap();

    old.answer(ItemId(1), ItemId(2)).unwrap();
    let result = store.compare_and_save(&old, 0).await;
    assert!(matches!(result, Err(Error::Conflict(_))));
}

#[tokio::test]
async fn test_save_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("gtier.db");
    let s = session("ivy", 5);

    {
        let pool = init_database(&db_path).await.unwrap();
        SqliteSessionStore::new(pool.clone()).save(&s).await.unwrap();
        pool.close().await;
    }

    let pool = init_database(&db_path).await.unwrap();
    let loaded = SqliteSessionStore::new(pool)
        .get(&OwnerId::new("ivy"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded, s);
}

#[tokio::test]
async fn test_writes_use_configured_budget_without_reading_settings() {
    let (_dir, store) = setup_store().await;
    let store = store.with_max_lock_wait_ms(250);
    assert_eq!(store.max_lock_wait_ms(), 250);

    sqlx::query("DROP TABLE settings")
        .execute(store.pool())
        .await
        .unwrap();

    let mut s = session("jack", 3);
    store.create(&s).await.unwrap();
    s.answer(ItemId(1), ItemId(2)).unwrap();
    store.compare_and_save(&s, 0).await.unwrap();
    assert!(store.delete(&OwnerId::new("jack")).await.unwrap());
}
