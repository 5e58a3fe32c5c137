use super::traits::PlayerCountSource;
use crate::error::{Result, TrackerError};
use crate::stats::StatsCollector;
use crate::store::GameStore;
use chrono::Utc;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, warn};

/// Outcome of one collection pass over every tracked game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollectionSummary {
    pub processed: usize,
    pub recorded: usize,
    pub failed: usize,
}

/// Fetches player counts and records them as samples.
///
/// Every write for a given app id happens while holding that id's lock, so a
/// scheduled pass and an on-demand request can't interleave on the same game.
pub struct Collector {
    store: Arc<dyn GameStore>,
    source: Arc<dyn PlayerCountSource>,
    stats: Arc<StatsCollector>,
    locks: Mutex<FxHashMap<u64, Arc<tokio::sync::Mutex<()>>>>,
    pass_guard: tokio::sync::Mutex<()>,
}

impl Collector {
    pub fn new(
        store: Arc<dyn GameStore>,
        source: Arc<dyn PlayerCountSource>,
        stats: Arc<StatsCollector>,
    ) -> Self {
        Self {
            store,
            source,
            stats,
            locks: Mutex::new(FxHashMap::default()),
            pass_guard: tokio::sync::Mutex::new(()),
        }
    }

    pub fn stats(&self) -> &Arc<StatsCollector> {
        &self.stats
    }

    fn game_lock(&self, app_id: u64) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(app_id).or_default().clone()
    }

    /// Drops the table entry for `app_id` once nobody else holds or waits on it.
    fn release_game_lock(&self, app_id: u64, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // one reference in the table, one here
        let idle = Arc::strong_count(&lock) == 2
            && locks.get(&app_id).is_some_and(|held| Arc::ptr_eq(held, &lock));
        if idle {
            locks.remove(&app_id);
        }
    }

    /// Records one sample for `app_id`.
    ///
    /// Returns `Ok(false)` when the game isn't tracked or its count could not
    /// be fetched; in both cases nothing is written.
    pub async fn collect_one(&self, app_id: u64) -> Result<bool> {
        let lock = self.game_lock(app_id);
        let result = {
            let _guard = lock.lock().await;
            self.collect_locked(app_id).await
        };
        self.release_game_lock(app_id, lock);
        result
    }

    async fn collect_locked(&self, app_id: u64) -> Result<bool> {
        debug!("Collecting player count for app ID: {}", app_id);

        let game = match self.store.get(app_id).await {
            Ok(Some(game)) => game,
            Ok(None) => {
                warn!("Game not found for app ID: {}", app_id);
                return Ok(false);
            }
            Err(e) => {
                error!("Failed to load game {}: {}", app_id, e);
                return Err(e);
            }
        };

        self.stats.inc_polls();
        let Some(player_count) = self.source.fetch_current_count(app_id).await else {
            self.stats.inc_fetch_failures();
            warn!("Failed to get player count for {}", game.name);
            return Ok(false);
        };

        // Keep per-game timestamps monotonic even if the wall clock steps back.
        let recorded_at = Utc::now().max(game.last_updated);
        if let Err(e) = self
            .store
            .append_sample(app_id, player_count, recorded_at)
            .await
        {
            error!("Failed to record player count for app ID {}: {}", app_id, e);
            return Err(e);
        }

        self.stats.inc_recorded();
        debug!("Player count recorded for {}: {}", game.name, player_count);
        Ok(true)
    }

    /// Runs a full pass, waiting for any pass already in progress.
    pub async fn collect_all(&self) -> CollectionSummary {
        let _pass = self.pass_guard.lock().await;
        self.run_pass().await
    }

    /// Runs a full pass unless one is already in progress, in which case
    /// returns `None` without doing anything.
    pub async fn try_collect_all(&self) -> Option<CollectionSummary> {
        let _pass = self.pass_guard.try_lock().ok()?;
        Some(self.run_pass().await)
    }

    async fn run_pass(&self) -> CollectionSummary {
        info!("Collecting player counts for all tracked games");

        let games = match self.store.list_all().await {
            Ok(games) => games,
            Err(e) => {
                error!("Failed to list tracked games: {}", e);
                return CollectionSummary::default();
            }
        };

        let mut summary = CollectionSummary::default();
        for game in &games {
            summary.processed += 1;
            match self.collect_one(game.app_id).await {
                Ok(true) => summary.recorded += 1,
                Ok(false) => summary.failed += 1,
                Err(e) => {
                    error!("Collection failed for app ID {}: {}", game.app_id, e);
                    summary.failed += 1;
                }
            }
        }

        self.stats.record_pass();
        info!(
            "Finished collecting player counts for {} games ({} recorded, {} failed)",
            summary.processed, summary.recorded, summary.failed
        );
        summary
    }

    /// Starts tracking a game and records an initial sample.
    ///
    /// Calling this for a game that is already tracked leaves the game as is
    /// but still records a fresh sample. Returns whether a sample was recorded.
    pub async fn start_tracking(&self, app_id: u64, name: &str) -> Result<bool> {
        validate_app_id(app_id)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(TrackerError::Validation(
                "Game name must not be empty".to_string(),
            ));
        }

        info!("Starting to track game: {} (ID: {})", name, app_id);

        let lock = self.game_lock(app_id);
        let result = {
            let _guard = lock.lock().await;
            self.create_and_collect(app_id, name).await
        };
        self.release_game_lock(app_id, lock);
        result
    }

    async fn create_and_collect(&self, app_id: u64, name: &str) -> Result<bool> {
        if self.store.create(app_id, name, Utc::now()).await? {
            info!("Game added to tracking: {}", name);
        } else {
            debug!("Game already being tracked: {}", name);
        }

        self.collect_locked(app_id).await
    }

    /// Deletes a game and its whole history. Returns the number of samples removed.
    pub async fn stop_tracking(&self, app_id: u64) -> Result<u64> {
        info!("Stopping tracking for game with app ID: {}", app_id);

        let lock = self.game_lock(app_id);
        let result = {
            let _guard = lock.lock().await;
            self.store.delete(app_id).await
        };
        self.release_game_lock(app_id, lock);

        match result {
            Ok(removed) => {
                info!(
                    "Stopped tracking app ID {} ({} samples removed)",
                    app_id, removed
                );
                Ok(removed)
            }
            Err(e) => {
                warn!("Failed to stop tracking app ID {}: {}", app_id, e);
                Err(e)
            }
        }
    }
}

fn validate_app_id(app_id: u64) -> Result<()> {
    // SQLite stores ids as signed 64-bit integers
    if app_id == 0 || app_id > i64::MAX as u64 {
        return Err(TrackerError::Validation(format!(
            "Invalid app ID: {}",
            app_id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryGameStore;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct FixedSource(Option<u64>);

    #[async_trait::async_trait]
    impl PlayerCountSource for FixedSource {
        async fn fetch_current_count(&self, _app_id: u64) -> Option<u64> {
            self.0
        }
    }

    struct CountingSource {
        next: AtomicU64,
    }

    #[async_trait::async_trait]
    impl PlayerCountSource for CountingSource {
        async fn fetch_current_count(&self, _app_id: u64) -> Option<u64> {
            Some(self.next.fetch_add(1, Ordering::SeqCst))
        }
    }

    fn collector(source: Arc<dyn PlayerCountSource>) -> (Arc<InMemoryGameStore>, Collector) {
        let store = Arc::new(InMemoryGameStore::new());
        let collector = Collector::new(store.clone(), source, StatsCollector::new());
        (store, collector)
    }

    #[tokio::test]
    async fn test_collect_one_untracked_is_noop() {
        let (store, collector) = collector(Arc::new(FixedSource(Some(5))));
        assert!(!collector.collect_one(730).await.unwrap());
        assert_eq!(store.count_samples(730).await.unwrap(), 0);
        assert_eq!(collector.stats().get_snapshot().polls, 0);
    }

    #[tokio::test]
    async fn test_start_tracking_validates_input() {
        let (store, collector) = collector(Arc::new(FixedSource(Some(5))));

        assert!(matches!(
            collector.start_tracking(0, "Nothing").await,
            Err(TrackerError::Validation(_))
        ));
        assert!(matches!(
            collector.start_tracking(730, "   ").await,
            Err(TrackerError::Validation(_))
        ));
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_start_tracking_trims_name() {
        let (store, collector) = collector(Arc::new(FixedSource(Some(5))));
        collector.start_tracking(570, "  Dota 2 ").await.unwrap();
        assert_eq!(store.get(570).await.unwrap().unwrap().name, "Dota 2");
    }

    #[tokio::test]
    async fn test_start_tracking_again_refreshes_sample() {
        let source = Arc::new(CountingSource {
            next: AtomicU64::new(100),
        });
        let (store, collector) = collector(source);

        assert!(collector.start_tracking(440, "Team Fortress 2").await.unwrap());
        assert!(collector.start_tracking(440, "Renamed").await.unwrap());

        assert_eq!(store.list_all().await.unwrap().len(), 1);
        assert_eq!(store.get(440).await.unwrap().unwrap().name, "Team Fortress 2");
        assert_eq!(store.count_samples(440).await.unwrap(), 2);
    }

    fn lock_table_len(collector: &Collector) -> usize {
        collector.locks.lock().unwrap().len()
    }

    #[tokio::test]
    async fn test_lock_table_is_pruned_after_use() {
        let (_store, collector) = collector(Arc::new(FixedSource(Some(5))));

        for app_id in 1..=1000u64 {
            assert!(matches!(
                collector.stop_tracking(app_id).await,
                Err(TrackerError::NotFound(_))
            ));
        }
        assert_eq!(lock_table_len(&collector), 0);

        collector.start_tracking(730, "Counter-Strike 2").await.unwrap();
        assert_eq!(lock_table_len(&collector), 0);
        collector.collect_one(730).await.unwrap();
        collector.collect_all().await;
        assert_eq!(lock_table_len(&collector), 0);

        assert_eq!(collector.stop_tracking(730).await.unwrap(), 3);
        assert_eq!(lock_table_len(&collector), 0);
    }

    #[tokio::test]
    async fn test_lock_entry_kept_while_waiter_queued() {
        let (store, collector) = collector(Arc::new(FixedSource(Some(5))));
        let collector = Arc::new(collector);
        store.create(570, "Dota 2", Utc::now()).await.unwrap();

        let lock = collector.game_lock(570);
        let held = lock.lock().await;

        let waiter = {
            let collector = collector.clone();
            tokio::spawn(async move { collector.collect_one(570).await })
        };
        // let the waiter queue up on the held lock
        while Arc::strong_count(&lock) < 3 {
            tokio::task::yield_now().await;
        }

        drop(held);
        collector.release_game_lock(570, lock);
        assert_eq!(lock_table_len(&collector), 1);

        assert!(waiter.await.unwrap().unwrap());
        assert_eq!(lock_table_len(&collector), 0);
        assert_eq!(store.count_samples(570).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_try_collect_all_skips_while_pass_running() {
        let (_store, collector) = collector(Arc::new(FixedSource(Some(1))));
        let held = collector.pass_guard.lock().await;
        assert!(collector.try_collect_all().await.is_none());
        drop(held);
        assert_eq!(
            collector.try_collect_all().await,
            Some(CollectionSummary::default())
        );
    }
}
