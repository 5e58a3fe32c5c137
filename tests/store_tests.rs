use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use steam_tracker::db::DbClient;
use steam_tracker::error::TrackerError;
use steam_tracker::store::{GameStore, InMemoryGameStore, SqliteGameStore};

fn t(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn sqlite_store() -> (tempfile::TempDir, Arc<dyn GameStore>) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    let db = DbClient::new(path.to_string_lossy().into_owned()).unwrap();
    db.initialize().unwrap();
    (dir, Arc::new(SqliteGameStore::new(Arc::new(db))))
}

async fn check_create_is_idempotent(store: Arc<dyn GameStore>) {
    assert!(!store.exists(730).await.unwrap());
    assert!(store.create(730, "Counter-Strike 2", t(0)).await.unwrap());
    assert!(!store.create(730, "Something Else", t(10)).await.unwrap());

    let games = store.list_all().await.unwrap();
    assert_eq!(games.len(), 1);
    assert_eq!(games[0].name, "Counter-Strike 2");
    assert_eq!(games[0].created_at, t(0));
    assert_eq!(games[0].last_updated, t(0));
    assert!(store.exists(730).await.unwrap());
}

async fn check_samples_are_ordered_and_windowed(store: Arc<dyn GameStore>) {
    store.create(570, "Dota 2", t(0)).await.unwrap();
    store.append_sample(570, 300, t(300)).await.unwrap();
    store.append_sample(570, 100, t(100)).await.unwrap();
    store.append_sample(570, 200, t(200)).await.unwrap();
    store.append_sample(570, 201, t(200)).await.unwrap();

    let all = store.samples_since(570, t(0)).await.unwrap();
    let counts: Vec<u64> = all.iter().map(|s| s.player_count).collect();
    assert_eq!(counts, vec![100, 200, 201, 300]);

    // boundary is inclusive
    let recent = store.samples_since(570, t(200)).await.unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].recorded_at, t(200));

    assert_eq!(store.get(570).await.unwrap().unwrap().last_updated, t(300));
    assert_eq!(store.count_samples(570).await.unwrap(), 4);
}

async fn check_delete_cascades(store: Arc<dyn GameStore>) {
    store.create(440, "Team Fortress 2", t(0)).await.unwrap();
    store.create(550, "Left 4 Dead 2", t(0)).await.unwrap();
    store.append_sample(440, 1, t(1)).await.unwrap();
    store.append_sample(440, 2, t(2)).await.unwrap();
    store.append_sample(550, 3, t(3)).await.unwrap();

    assert_eq!(store.delete(440).await.unwrap(), 2);
    assert!(store.get(440).await.unwrap().is_none());
    assert_eq!(store.count_samples(440).await.unwrap(), 0);
    assert!(store.samples_since(440, t(0)).await.unwrap().is_empty());

    // the other game is untouched
    assert_eq!(store.count_samples(550).await.unwrap(), 1);
}

async fn check_missing_game_errors(store: Arc<dyn GameStore>) {
    store.create(10, "Counter-Strike", t(0)).await.unwrap();
    store.append_sample(10, 7, t(5)).await.unwrap();

    assert!(matches!(
        store.delete(999).await,
        Err(TrackerError::NotFound(999))
    ));
    assert!(matches!(
        store.append_sample(999, 1, t(1)).await,
        Err(TrackerError::NotFound(999))
    ));
    assert!(store.get(999).await.unwrap().is_none());
    assert!(store.samples_since(999, t(0)).await.unwrap().is_empty());

    // nothing else changed
    assert_eq!(store.list_all().await.unwrap().len(), 1);
    assert_eq!(store.count_samples(10).await.unwrap(), 1);
}

async fn check_find_by_name(store: Arc<dyn GameStore>) {
    store.create(730, "Counter-Strike 2", t(0)).await.unwrap();
    store.create(10, "Counter-Strike", t(0)).await.unwrap();
    store.create(570, "Dota 2", t(0)).await.unwrap();

    let ids: Vec<u64> = store
        .find_by_name("STRIKE")
        .await
        .unwrap()
        .iter()
        .map(|g| g.app_id)
        .collect();
    assert_eq!(ids, vec![10, 730]);
    assert!(store.find_by_name("portal").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_memory_store_contract() {
    check_create_is_idempotent(Arc::new(InMemoryGameStore::new())).await;
    check_samples_are_ordered_and_windowed(Arc::new(InMemoryGameStore::new())).await;
    check_delete_cascades(Arc::new(InMemoryGameStore::new())).await;
    check_missing_game_errors(Arc::new(InMemoryGameStore::new())).await;
    check_find_by_name(Arc::new(InMemoryGameStore::new())).await;
}

#[tokio::test]
async fn test_sqlite_store_contract() {
    let (_d1, s1) = sqlite_store();
    check_create_is_idempotent(s1).await;
    let (_d2, s2) = sqlite_store();
    check_samples_are_ordered_and_windowed(s2).await;
    let (_d3, s3) = sqlite_store();
    check_delete_cascades(s3).await;
    let (_d4, s4) = sqlite_store();
    check_missing_game_errors(s4).await;
    let (_d5, s5) = sqlite_store();
    check_find_by_name(s5).await;
}

#[tokio::test]
async fn test_sqlite_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reopen.db").to_string_lossy().into_owned();

    {
        let db = DbClient::new(path.clone()).unwrap();
        db.initialize().unwrap();
        let store = SqliteGameStore::new(Arc::new(db));
        store.create(252490, "Rust", t(0)).await.unwrap();
        store.append_sample(252490, 150_000, t(60)).await.unwrap();
    }

    let db = DbClient::new(path).unwrap();
    db.initialize().unwrap();
    let store = SqliteGameStore::new(Arc::new(db));
    let game = store.get(252490).await.unwrap().unwrap();
    assert_eq!(game.last_updated, t(60));
    let samples = store
        .samples_since(252490, t(60) - Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].player_count, 150_000);
}
