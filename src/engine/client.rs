use super::traits::PlayerCountSource;
use crate::config::SteamConfig;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, warn};

const PLAYER_COUNT_PATH: &str = "/ISteamUserStats/GetNumberOfCurrentPlayers/v1/";

#[derive(Deserialize)]
struct Envelope {
    response: Option<PlayerCountBody>,
}

#[derive(Deserialize)]
struct PlayerCountBody {
    player_count: Option<serde_json::Value>,
}

/// HTTP client for the Steam Web API player-count endpoint.
pub struct SteamClient {
    base_url: String,
    client: Client,
}

impl SteamClient {
    pub fn new(config: &SteamConfig) -> reqwest::Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_millis(config.timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn player_count_url(&self) -> String {
        format!("{}{}", self.base_url, PLAYER_COUNT_PATH)
    }

    /// Pulls `response.player_count` out of a response body.
    fn parse_player_count(body: &[u8]) -> Option<u64> {
        let envelope: Envelope = serde_json::from_slice(body).ok()?;
        envelope.response?.player_count?.as_u64()
    }
}

#[async_trait::async_trait]
impl PlayerCountSource for SteamClient {
    async fn fetch_current_count(&self, app_id: u64) -> Option<u64> {
        debug!("Fetching player count for app ID: {}", app_id);

        let resp = match self
            .client
            .get(self.player_count_url())
            .query(&[("appid", app_id)])
            .send()
            .await
            .and_then(|r| r.error_for_status())
        {
            Ok(resp) => resp,
            Err(e) => {
                error!("Error fetching player count for app ID {}: {}", app_id, e);
                return None;
            }
        };

        let body = match resp.bytes().await {
            Ok(body) => body,
            Err(e) => {
                error!("Error reading player count for app ID {}: {}", app_id, e);
                return None;
            }
        };

        match Self::parse_player_count(&body) {
            Some(count) => {
                debug!("Player count for app ID {}: {}", app_id, count);
                Some(count)
            }
            None => {
                warn!("No player count data found for app ID: {}", app_id);
                None
            }
        }
    }
}
