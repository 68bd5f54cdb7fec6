//! End-to-end ranking flow over the SQLite stack
//!
//! Each test builds the service the way the binary does: catalog and
//! sessions in one database, settings read from the settings table.

use std::collections::HashSet;

use gtier_common::db::settings::{set_setting, ELIMINATED_POLICY, GROUPING_ENABLED, QUALIFIERS_PER_GROUP};
use gtier_common::db::{init_database, GameRecord};
use gtier_common::events::{EventBus, RankingPhase};
use gtier_rank::{
    build_sqlite_service, CatalogFilter, ItemId, OwnerId, RankError, RankingService,
    SessionView, SqliteCatalog,
};
use sqlx::SqlitePool;
use tempfile::TempDir;

fn game(id: i64, genre: &str, platform: &str) -> GameRecord {
    GameRecord {
        id,
        name: format!("Game {}", id),
        genre: genre.to_string(),
        platform: platform.to_string(),
        release_date: Some("2020-01-01".to_string()),
        rating: Some(4.5),
        image: None,
    }
}

async fn setup_db() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("gtier.db")).await.unwrap();
    (dir, pool)
}

async fn import(pool: &SqlitePool, owner: &OwnerId, games: &[GameRecord]) {
    SqliteCatalog::new(pool.clone())
        .import_games(owner, games)
        .await
        .unwrap();
}

async fn service(pool: &SqlitePool) -> RankingService {
    build_sqlite_service(pool.clone(), EventBus::new(100))
        .await
        .unwrap()
}

/// Answer every pending pair by preferring items earlier in `truth`
async fn answer_all(service: &RankingService, owner: &OwnerId, truth: &[i64]) -> SessionView {
    let rank = |id: ItemId| truth.iter().position(|t| *t == id.0).unwrap();
    let mut view = service.status(owner).await.unwrap();
    while let Some(pair) = view.pending_pair.clone() {
        let (winner, loser) = if rank(pair.left.id) < rank(pair.right.id) {
            (pair.left.id, pair.right.id)
        } else {
            (pair.right.id, pair.left.id)
        };
        view = service.answer(owner, winner, loser).await.unwrap();
    }
    view
}

fn ranked_ids(view: &SessionView) -> Vec<i64> {
    view.ranking
        .as_ref()
        .unwrap()
        .iter()
        .map(|t| t.item.id.0)
        .collect()
}

#[tokio::test]
async fn test_full_ranking_produces_true_order_and_tiers() {
    let (_dir, pool) = setup_db().await;
    let owner = OwnerId::new("alice");
    let games: Vec<GameRecord> = (1..=10).map(|id| game(id, "RPG", "PC")).collect();
    import(&pool, &owner, &games).await;

    let service = service(&pool).await;
    let started = service.start(&owner).await.unwrap();
    assert_eq!(started.phase, RankingPhase::Merge);
    assert_eq!(started.progress.comparisons_done, 0);
    assert_eq!(started.progress.comparisons_expected, 34);

    let truth = [7, 3, 10, 1, 5, 9, 2, 8, 4, 6];
    let finished = answer_all(&service, &owner, &truth).await;

    assert_eq!(finished.phase, RankingPhase::Finished);
    assert!(finished.pending_pair.is_none());
    assert_eq!(ranked_ids(&finished), truth.to_vec());

    let done = finished.progress.comparisons_done;
    assert!((9..=34).contains(&done), "done={}", done);

    let ranking = finished.ranking.unwrap();
    let ranks: Vec<u32> = ranking.iter().map(|t| t.rank).collect();
    assert_eq!(ranks, (1..=10).collect::<Vec<u32>>());
    let tiers: Vec<&str> = ranking.iter().map(|t| t.tier.as_str()).collect();
    assert_eq!(tiers, vec!["S", "A", "A", "B", "B", "B", "C", "C", "C", "D"]);
    assert_eq!(finished.eliminated, Some(Vec::new()));
}

#[tokio::test]
async fn test_each_call_resumes_from_the_database() {
    let (_dir, pool) = setup_db().await;
    let owner = OwnerId::new("bob");
    import(&pool, &owner, &[game(1, "", ""), game(2, "", ""), game(3, "", "")]).await;

    service(&pool).await.start(&owner).await.unwrap();

    // A fresh service per answer, like separate CLI invocations
    let truth = [2, 3, 1];
    loop {
        let svc = service(&pool).await;
        let view = svc.status(&owner).await.unwrap();
        let Some(pair) = view.pending_pair else { break };
        let rank = |id: ItemId| truth.iter().position(|t| *t == id.0).unwrap();
        let (w, l) = if rank(pair.left.id) < rank(pair.right.id) {
            (pair.left.id, pair.right.id)
        } else {
            (pair.right.id, pair.left.id)
        };
        svc.answer(&owner, w, l).await.unwrap();
    }

    let view = service(&pool).await.status(&owner).await.unwrap();
    assert_eq!(ranked_ids(&view), vec![2, 3, 1]);
}

#[tokio::test]
async fn test_status_is_idempotent() {
    let (_dir, pool) = setup_db().await;
    let owner = OwnerId::new("carol");
    import(&pool, &owner, &(1..=5).map(|id| game(id, "", "")).collect::<Vec<_>>()).await;

    let service = service(&pool).await;
    service.start(&owner).await.unwrap();
    service.answer(&owner, ItemId(2), ItemId(1)).await.unwrap();

    let first = service.status(&owner).await.unwrap();
    for _ in 0..5 {
        assert_eq!(service.status(&owner).await.unwrap(), first);
    }
}

#[tokio::test]
async fn test_restart_resets_progress() {
    let (_dir, pool) = setup_db().await;
    let owner = OwnerId::new("dana");
    import(&pool, &owner, &(1..=4).map(|id| game(id, "", "")).collect::<Vec<_>>()).await;

    let service = service(&pool).await;
    let first = service.start(&owner).await.unwrap();
    answer_all(&service, &owner, &[4, 3, 2, 1]).await;

    let restarted = service.start(&owner).await.unwrap();
    assert_ne!(restarted.session_id, first.session_id);
    assert_eq!(restarted.phase, RankingPhase::Merge);
    assert_eq!(restarted.progress.comparisons_done, 0);
    assert!(restarted.ranking.is_none());
    assert!(restarted.pending_pair.is_some());
}

#[tokio::test]
async fn test_stale_pair_rejected_without_state_change() {
    let (_dir, pool) = setup_db().await;
    let owner = OwnerId::new("erin");
    import(&pool, &owner, &(1..=4).map(|id| game(id, "", "")).collect::<Vec<_>>()).await;

    let service = service(&pool).await;
    let before = service.start(&owner).await.unwrap();

    let err = service
        .answer(&owner, ItemId(1), ItemId(3))
        .await
        .unwrap_err();
    match &err {
        RankError::StalePair { expected, .. } => {
            assert_eq!(*expected, Some((ItemId(1), ItemId(2))));
        }
        other => panic!("expected StalePair, got {:?}", other),
    }
    assert!(err.is_client_recoverable());
    assert_eq!(err.code(), "STALE_PAIR");

    // Unknown id
    assert!(matches!(
        service.answer(&owner, ItemId(99), ItemId(1)).await,
        Err(RankError::StalePair { .. })
    ));

    assert_eq!(service.status(&owner).await.unwrap(), before);
}

#[tokio::test]
async fn test_duplicate_submission_is_stale() {
    let (_dir, pool) = setup_db().await;
    let owner = OwnerId::new("finn");
    import(&pool, &owner, &(1..=4).map(|id| game(id, "", "")).collect::<Vec<_>>()).await;

    let service = service(&pool).await;
    service.start(&owner).await.unwrap();
    service.answer(&owner, ItemId(1), ItemId(2)).await.unwrap();

    let err = service.answer(&owner, ItemId(1), ItemId(2)).await.unwrap_err();
    assert!(matches!(err, RankError::StalePair { .. }));
    assert_eq!(
        service.status(&owner).await.unwrap().progress.comparisons_done,
        1
    );
}

#[tokio::test]
async fn test_error_cases_for_missing_sessions() {
    let (_dir, pool) = setup_db().await;
    let owner = OwnerId::new("gail");
    let service = service(&pool).await;

    assert!(matches!(
        service.status(&owner).await,
        Err(RankError::NotFound(_))
    ));
    assert!(matches!(
        service.answer(&owner, ItemId(1), ItemId(2)).await,
        Err(RankError::NoActivePair(_))
    ));
    assert!(matches!(
        service.start(&owner).await,
        Err(RankError::NoItems { found: 0, .. })
    ));

    import(&pool, &owner, &[game(1, "", "")]).await;
    assert!(matches!(
        service.start(&owner).await,
        Err(RankError::NoItems { found: 1, .. })
    ));
}

#[tokio::test]
async fn test_answer_after_finish_is_no_active_pair() {
    let (_dir, pool) = setup_db().await;
    let owner = OwnerId::new("hank");
    import(&pool, &owner, &[game(1, "", ""), game(2, "", "")]).await;

    let service = service(&pool).await;
    service.start(&owner).await.unwrap();
    let view = service.answer(&owner, ItemId(2), ItemId(1)).await.unwrap();
    assert_eq!(view.phase, RankingPhase::Finished);

    let err = service.answer(&owner, ItemId(2), ItemId(1)).await.unwrap_err();
    assert!(matches!(err, RankError::NoActivePair(_)));
    assert_eq!(err.code(), "NO_ACTIVE_PAIR");
}

#[tokio::test]
async fn test_catalog_filters_limit_the_item_set() {
    let (_dir, pool) = setup_db().await;
    let owner = OwnerId::new("ivy");
    import(
        &pool,
        &owner,
        &[
            game(1, "Shooter", "PC"),
            game(2, "Shooter, Action", "Xbox"),
            game(3, "Puzzle", "PC"),
            game(4, "shooter", "PC, Switch"),
        ],
    )
    .await;

    let service = service(&pool).await;
    let filter = CatalogFilter {
        genre: Some("Shooter".to_string()),
        platform: Some("PC".to_string()),
    };
    let view = service.start_filtered(&owner, &filter).await.unwrap();
    let pair = view.pending_pair.unwrap();
    assert_eq!((pair.left.id, pair.right.id), (ItemId(1), ItemId(4)));
    assert_eq!(view.progress.comparisons_expected, 2);
}

#[tokio::test]
async fn test_played_games_are_per_owner() {
    let (_dir, pool) = setup_db().await;
    let alice = OwnerId::new("alice");
    let bob = OwnerId::new("bob");
    import(&pool, &alice, &[game(1, "", ""), game(2, "", ""), game(3, "", "")]).await;
    import(&pool, &bob, &[game(3, "", ""), game(4, "", "")]).await;

    let service = service(&pool).await;
    let a = service.start(&alice).await.unwrap();
    let b = service.start(&bob).await.unwrap();

    assert_eq!(a.progress.comparisons_expected, 5);
    let pair = b.pending_pair.unwrap();
    assert_eq!((pair.left.id, pair.right.id), (ItemId(3), ItemId(4)));

    service.answer(&bob, ItemId(4), ItemId(3)).await.unwrap();
    assert_eq!(
        service.status(&alice).await.unwrap().progress.comparisons_done,
        0
    );
}

#[tokio::test]
async fn test_grouping_stage_from_settings() {
    let (_dir, pool) = setup_db().await;
    set_setting(&pool, GROUPING_ENABLED, true).await.unwrap();
    set_setting(&pool, QUALIFIERS_PER_GROUP, 2).await.unwrap();

    let owner = OwnerId::new("jack");
    import(
        &pool,
        &owner,
        &[
            game(1, "RPG", ""),
            game(2, "Shooter", ""),
            game(3, "RPG", ""),
            game(4, "RPG", ""),
            game(5, "Shooter", ""),
            game(6, "", ""),
        ],
    )
    .await;

    let service = service(&pool).await;
    let started = service.start(&owner).await.unwrap();
    assert_eq!(started.phase, RankingPhase::Group);
    let group = started.current_group.unwrap();
    assert_eq!((group.label.as_str(), group.index, group.total), ("RPG", 0, 3));

    let truth = [6, 4, 2, 1, 5, 3];
    let finished = answer_all(&service, &owner, &truth).await;

    // Qualifiers: RPG {4,1}, Shooter {2,5}, Uncategorised {6}
    assert_eq!(ranked_ids(&finished), vec![6, 4, 2, 1, 5]);
    let eliminated: Vec<i64> = finished
        .eliminated
        .unwrap()
        .iter()
        .map(|i| i.id.0)
        .collect();
    assert_eq!(eliminated, vec![3]);
}

#[tokio::test]
async fn test_rank_after_qualifiers_covers_every_item() {
    let (_dir, pool) = setup_db().await;
    set_setting(&pool, ELIMINATED_POLICY, "rank_after_qualifiers")
        .await
        .unwrap();
    set_setting(&pool, QUALIFIERS_PER_GROUP, 1).await.unwrap();

    let owner = OwnerId::new("kate");
    let games: Vec<GameRecord> = (1..=6)
        .map(|id| game(id, if id % 2 == 0 { "Even" } else { "Odd" }, ""))
        .collect();
    import(&pool, &owner, &games).await;

    let service = service(&pool).await;
    let mut options = service.settings().session_options();
    options.grouping = true;
    service
        .start_with(&owner, &CatalogFilter::default(), options)
        .await
        .unwrap();

    let finished = answer_all(&service, &owner, &[1, 2, 3, 4, 5, 6]).await;
    let ranking = finished.ranking.unwrap();

    let ids: Vec<i64> = ranking.iter().map(|t| t.item.id.0).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    let unique: HashSet<i64> = ids.iter().copied().collect();
    assert_eq!(unique.len(), 6);

    let tiers: Vec<&str> = ranking.iter().map(|t| t.tier.as_str()).collect();
    assert_eq!(tiers, vec!["S", "A", "D", "D", "D", "D"]);
}

#[tokio::test]
async fn test_delete_removes_session() {
    let (_dir, pool) = setup_db().await;
    let owner = OwnerId::new("liam");
    import(&pool, &owner, &[game(1, "", ""), game(2, "", "")]).await;

    let service = service(&pool).await;
    service.start(&owner).await.unwrap();

    assert!(service.delete(&owner).await.unwrap());
    assert!(!service.delete(&owner).await.unwrap());
    assert!(matches!(
        service.status(&owner).await,
        Err(RankError::NotFound(_))
    ));
}
