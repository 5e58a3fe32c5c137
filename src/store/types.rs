use chrono::{DateTime, Utc};
use serde::Serialize;

/// A game whose player count is being sampled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedGame {
    pub app_id: u64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// One recorded player-count observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub app_id: u64,
    pub player_count: u64,
    pub recorded_at: DateTime<Utc>,
}
