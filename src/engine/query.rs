use super::catalog::{search_catalog, CatalogEntry};
use super::traits::PlayerCountSource;
use crate::error::{Result, TrackerError};
use crate::store::{GameStore, Sample, TrackedGame};
use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Shortest accepted search term, after trimming.
pub const MIN_QUERY_LEN: usize = 2;
/// Catalog matches are only appended while the result list is shorter than this.
pub const MAX_SEARCH_RESULTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSearchResult {
    pub id: u64,
    pub name: String,
    pub current_player_count: Option<u64>,
    pub last_updated: Option<DateTime<Utc>>,
    pub is_tracked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerCountPoint {
    pub timestamp: DateTime<Utc>,
    pub player_count: u64,
}

impl From<Sample> for PlayerCountPoint {
    fn from(sample: Sample) -> Self {
        Self {
            timestamp: sample.recorded_at,
            player_count: sample.player_count,
        }
    }
}

/// Read side: search, history and tracking status.
pub struct QueryService {
    store: Arc<dyn GameStore>,
    source: Arc<dyn PlayerCountSource>,
    default_days: u32,
}

impl QueryService {
    pub fn new(
        store: Arc<dyn GameStore>,
        source: Arc<dyn PlayerCountSource>,
        default_days: u32,
    ) -> Self {
        Self {
            store,
            source,
            default_days,
        }
    }

    /// Tracked games whose name contains `term`, followed by catalog matches
    /// that aren't already listed. Every result carries a live player count.
    pub async fn search(&self, term: &str) -> Result<Vec<GameSearchResult>> {
        let term = term.trim();
        if term.chars().count() < MIN_QUERY_LEN {
            return Err(TrackerError::Validation(format!(
                "Search query must be at least {} characters",
                MIN_QUERY_LEN
            )));
        }
        debug!("Searching for games with term: {}", term);

        // TODO: cache live counts here; every search currently hits Steam once per match.
        let local = self.store.find_by_name(term).await?;
        let counts = join_all(
            local
                .iter()
                .map(|g| self.source.fetch_current_count(g.app_id)),
        )
        .await;

        let mut results: Vec<GameSearchResult> = local
            .into_iter()
            .zip(counts)
            .map(|(game, count)| GameSearchResult {
                id: game.app_id,
                name: game.name,
                current_player_count: count,
                last_updated: Some(game.last_updated),
                is_tracked: true,
            })
            .collect();

        if results.len() < MAX_SEARCH_RESULTS {
            let remaining = MAX_SEARCH_RESULTS - results.len();
            let candidates: Vec<CatalogEntry> = search_catalog(term)
                .into_iter()
                .filter(|entry| !results.iter().any(|r| r.id == entry.app_id))
                .take(remaining)
                .collect();

            let counts = join_all(
                candidates
                    .iter()
                    .map(|e| self.source.fetch_current_count(e.app_id)),
            )
            .await;

            results.extend(candidates.into_iter().zip(counts).map(|(entry, count)| {
                GameSearchResult {
                    id: entry.app_id,
                    name: entry.name.to_string(),
                    current_player_count: count,
                    last_updated: None,
                    is_tracked: false,
                }
            }));
        }

        debug!("Found {} games for search term: {}", results.len(), term);
        Ok(results)
    }

    /// Samples from the last `days` days (default window when `None`), oldest first.
    pub async fn history(&self, app_id: u64, days: Option<u32>) -> Result<Vec<PlayerCountPoint>> {
        self.history_at(app_id, days, Utc::now()).await
    }

    /// [`history`](Self::history) evaluated as of `now`.
    pub async fn history_at(
        &self,
        app_id: u64,
        days: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<Vec<PlayerCountPoint>> {
        let days = days.unwrap_or(self.default_days);
        debug!(
            "Getting player count history for app ID: {} (last {} days)",
            app_id, days
        );

        let cutoff = now
            .checked_sub_signed(Duration::days(i64::from(days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let samples = self.store.samples_since(app_id, cutoff).await?;
        Ok(samples.into_iter().map(PlayerCountPoint::from).collect())
    }

    pub async fn tracked_games(&self) -> Result<Vec<TrackedGame>> {
        self.store.list_all().await
    }

    pub async fn is_tracked(&self, app_id: u64) -> Result<bool> {
        self.store.exists(app_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryGameStore;

    struct NoCounts;

    #[async_trait::async_trait]
    impl PlayerCountSource for NoCounts {
        async fn fetch_current_count(&self, _app_id: u64) -> Option<u64> {
            None
        }
    }

    #[tokio::test]
    async fn test_short_query_is_rejected() {
        let service = QueryService::new(Arc::new(InMemoryGameStore::new()), Arc::new(NoCounts), 7);
        assert!(matches!(
            service.search("x").await,
            Err(TrackerError::Validation(_))
        ));
        assert!(matches!(
            service.search("  a  ").await,
            Err(TrackerError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_history_cutoff_saturates_for_huge_windows() {
        let store = Arc::new(InMemoryGameStore::new());
        let now = Utc::now();
        store.create(10, "Counter-Strike", now).await.unwrap();
        store.append_sample(10, 3, now).await.unwrap();

        let service = QueryService::new(store, Arc::new(NoCounts), 7);
        let points = service.history_at(10, Some(u32::MAX), now).await.unwrap();
        assert_eq!(points.len(), 1);
    }
}
