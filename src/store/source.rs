use super::types::{Sample, TrackedGame};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Durable set of tracked games and their sample histories.
#[async_trait]
pub trait GameStore: Send + Sync {
    async fn exists(&self, app_id: u64) -> Result<bool>;

    async fn get(&self, app_id: u64) -> Result<Option<TrackedGame>>;

    /// Inserts the game unless it is already tracked. Returns `true` if a row was created.
    async fn create(&self, app_id: u64, name: &str, now: DateTime<Utc>) -> Result<bool>;

    async fn list_all(&self) -> Result<Vec<TrackedGame>>;

    /// Case-insensitive substring match on the display name.
    async fn find_by_name(&self, term: &str) -> Result<Vec<TrackedGame>>;

    /// Records a sample and advances the game's `last_updated` in one write.
    /// Fails with `NotFound` when the game is not tracked.
    async fn append_sample(
        &self,
        app_id: u64,
        player_count: u64,
        recorded_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Samples recorded at or after `cutoff`, oldest first.
    async fn samples_since(&self, app_id: u64, cutoff: DateTime<Utc>) -> Result<Vec<Sample>>;

    async fn count_samples(&self, app_id: u64) -> Result<u64>;

    /// Removes every sample of the game, then the game itself.
    /// Returns the number of samples removed.
    async fn delete(&self, app_id: u64) -> Result<u64>;
}
