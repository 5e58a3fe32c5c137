//! Database-backed implementation of the game store.
//!
//! Delegates to the SQLite `DbClient`, so tracked games and their history
//! survive restarts.

use super::source::GameStore;
use super::types::{Sample, TrackedGame};
use crate::db::DbClient;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// A game store that reads from and writes to a SQLite database.
pub struct SqliteGameStore {
    /// Client for database operations.
    db: Arc<DbClient>,
}

impl SqliteGameStore {
    /// Creates a new `SqliteGameStore`. The schema must already be initialized.
    pub fn new(db: Arc<DbClient>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl GameStore for SqliteGameStore {
    async fn exists(&self, app_id: u64) -> Result<bool> {
        self.db.game_exists(app_id)
    }

    async fn get(&self, app_id: u64) -> Result<Option<TrackedGame>> {
        self.db.get_game(app_id)
    }

    async fn create(&self, app_id: u64, name: &str, now: DateTime<Utc>) -> Result<bool> {
        self.db.insert_game(app_id, name, now)
    }

    async fn list_all(&self) -> Result<Vec<TrackedGame>> {
        self.db.list_games()
    }

    async fn find_by_name(&self, term: &str) -> Result<Vec<TrackedGame>> {
        self.db.find_games_by_name(term)
    }

    async fn append_sample(
        &self,
        app_id: u64,
        player_count: u64,
        recorded_at: DateTime<Utc>,
    ) -> Result<()> {
        self.db.insert_sample(app_id, player_count, recorded_at)
    }

    async fn samples_since(&self, app_id: u64, cutoff: DateTime<Utc>) -> Result<Vec<Sample>> {
        self.db.samples_since(app_id, cutoff)
    }

    async fn count_samples(&self, app_id: u64) -> Result<u64> {
        self.db.count_samples(app_id)
    }

    async fn delete(&self, app_id: u64) -> Result<u64> {
        self.db.delete_game(app_id)
    }
}
