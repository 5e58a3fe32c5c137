//! In-memory implementation of the game store.
//!
//! Used when no persistent storage is configured, and by tests. Everything
//! lives behind a single `RwLock`, so every multi-step write is atomic.

use super::source::GameStore;
use super::types::{Sample, TrackedGame};
use crate::error::{Result, TrackerError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use std::sync::RwLock;

struct Entry {
    game: TrackedGame,
    samples: Vec<Sample>,
}

/// A game store held entirely in process memory.
#[derive(Default)]
pub struct InMemoryGameStore {
    games: RwLock<FxHashMap<u64, Entry>>,
}

impl InMemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted(mut games: Vec<TrackedGame>) -> Vec<TrackedGame> {
        games.sort_by_key(|g| g.app_id);
        games
    }
}

#[async_trait]
impl GameStore for InMemoryGameStore {
    async fn exists(&self, app_id: u64) -> Result<bool> {
        let games = self.games.read().map_err(|_| TrackerError::LockPoisoned)?;
        Ok(games.contains_key(&app_id))
    }

    async fn get(&self, app_id: u64) -> Result<Option<TrackedGame>> {
        let games = self.games.read().map_err(|_| TrackerError::LockPoisoned)?;
        Ok(games.get(&app_id).map(|e| e.game.clone()))
    }

    async fn create(&self, app_id: u64, name: &str, now: DateTime<Utc>) -> Result<bool> {
        let mut games = self.games.write().map_err(|_| TrackerError::LockPoisoned)?;
        if games.contains_key(&app_id) {
            return Ok(false);
        }
        games.insert(
            app_id,
            Entry {
                game: TrackedGame {
                    app_id,
                    name: name.to_string(),
                    created_at: now,
                    last_updated: now,
                },
                samples: Vec::new(),
            },
        );
        Ok(true)
    }

    async fn list_all(&self) -> Result<Vec<TrackedGame>> {
        let games = self.games.read().map_err(|_| TrackerError::LockPoisoned)?;
        Ok(Self::sorted(games.values().map(|e| e.game.clone()).collect()))
    }

    async fn find_by_name(&self, term: &str) -> Result<Vec<TrackedGame>> {
        let needle = term.to_lowercase();
        let games = self.games.read().map_err(|_| TrackerError::LockPoisoned)?;
        Ok(Self::sorted(
            games
                .values()
                .filter(|e| e.game.name.to_lowercase().contains(&needle))
                .map(|e| e.game.clone())
                .collect(),
        ))
    }

    async fn append_sample(
        &self,
        app_id: u64,
        player_count: u64,
        recorded_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut games = self.games.write().map_err(|_| TrackerError::LockPoisoned)?;
        let entry = games
            .get_mut(&app_id)
            .ok_or(TrackerError::NotFound(app_id))?;

        entry.samples.push(Sample {
            app_id,
            player_count,
            recorded_at,
        });
        if recorded_at > entry.game.last_updated {
            entry.game.last_updated = recorded_at;
        }
        Ok(())
    }

    async fn samples_since(&self, app_id: u64, cutoff: DateTime<Utc>) -> Result<Vec<Sample>> {
        let games = self.games.read().map_err(|_| TrackerError::LockPoisoned)?;
        let Some(entry) = games.get(&app_id) else {
            return Ok(Vec::new());
        };

        let mut samples: Vec<Sample> = entry
            .samples
            .iter()
            .filter(|s| s.recorded_at >= cutoff)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps.
        samples.sort_by_key(|s| s.recorded_at);
        Ok(samples)
    }

    async fn count_samples(&self, app_id: u64) -> Result<u64> {
        let games = self.games.read().map_err(|_| TrackerError::LockPoisoned)?;
        Ok(games.get(&app_id).map_or(0, |e| e.samples.len() as u64))
    }

    async fn delete(&self, app_id: u64) -> Result<u64> {
        let mut games = self.games.write().map_err(|_| TrackerError::LockPoisoned)?;
        let entry = games
            .remove(&app_id)
            .ok_or(TrackerError::NotFound(app_id))?;
        Ok(entry.samples.len() as u64)
    }
}
