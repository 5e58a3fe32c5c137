use anyhow::{bail, Context, Result};
use axum::http::HeaderValue;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Browser origins allowed to call the API.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    #[serde(default)]
    pub steam: SteamConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub stats: StatsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SteamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Reserved: the player-count endpoint does not need a key.
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SchedulerConfig {
    #[serde(default = "default_scheduler_enable")]
    pub enable: bool,
    // 30s is a demo cadence; production wants something like 1800.
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_history_days")]
    pub default_days: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_storage_backend")]
    pub backend: String,
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StatsConfig {
    #[serde(default = "default_stats_enable")]
    pub enable: bool,
    #[serde(default = "default_log_interval")]
    pub log_interval_seconds: u64,
}

// Defaults
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}
fn default_base_url() -> String {
    "https://api.steampowered.com".to_string()
}
fn default_timeout_ms() -> u64 {
    5000
}
fn default_connect_timeout_ms() -> u64 {
    2000
}
fn default_user_agent() -> String {
    "SteamTracker/0.1".to_string()
}
fn default_scheduler_enable() -> bool {
    true
}
fn default_interval_seconds() -> u64 {
    30
}
fn default_history_days() -> u32 {
    7
}
fn default_storage_backend() -> String {
    "sqlite".to_string()
}
fn default_sqlite_path() -> String {
    "steam-tracker.db".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}
fn default_stats_enable() -> bool {
    true
}
fn default_log_interval() -> u64 {
    300
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
            steam: SteamConfig::default(),
            scheduler: SchedulerConfig::default(),
            history: HistoryConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
            stats: StatsConfig::default(),
        }
    }
}

impl Default for SteamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enable: default_scheduler_enable(),
            interval_seconds: default_interval_seconds(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            default_days: default_history_days(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            sqlite_path: default_sqlite_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            enable: default_stats_enable(),
            log_interval_seconds: default_log_interval(),
        }
    }
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;
        let config = Self::from_toml(&contents)?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scheduler.interval_seconds == 0 {
            bail!("scheduler.interval_seconds must be greater than zero");
        }
        if self.steam.timeout_ms == 0 || self.steam.connect_timeout_ms == 0 {
            bail!("steam timeouts must be greater than zero");
        }
        for origin in &self.cors_origins {
            if HeaderValue::from_str(origin).is_err() {
                bail!("Invalid CORS origin '{}'", origin);
            }
        }
        if self.stats.enable && self.stats.log_interval_seconds == 0 {
            bail!("stats.log_interval_seconds must be greater than zero");
        }
        match self.storage.backend.as_str() {
            "sqlite" | "memory" => Ok(()),
            other => bail!("Unknown storage backend '{}'", other),
        }
    }

    pub fn scheduler_interval(&self) -> Duration {
        Duration::from_secs(self.scheduler.interval_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config = Config::from_toml(
            r#"
            port = 9000

            [scheduler]
            interval_seconds = 1800

            [storage]
            backend = "memory"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.scheduler_interval(), Duration::from_secs(1800));
        assert!(config.scheduler.enable);
        assert_eq!(config.history.default_days, 7);
        assert_eq!(config.storage.backend, "memory");
        assert_eq!(config.steam.base_url, "https://api.steampowered.com");
    }

    #[test]
    fn test_rejects_zero_interval() {
        let err = Config::from_toml("[scheduler]\ninterval_seconds = 0\n").unwrap_err();
        assert!(err.to_string().contains("interval_seconds"));
    }

    #[test]
    fn test_cors_origins() {
        assert_eq!(Config::default().cors_origins, vec!["http://localhost:3000"]);

        let config = Config::from_toml("cors_origins = [\"https://tracker.example\"]\n").unwrap();
        assert_eq!(config.cors_origins, vec!["https://tracker.example"]);

        assert!(Config::from_toml("cors_origins = [\"bad\\norigin\"]\n").is_err());
    }

    #[test]
    fn test_rejects_unknown_backend() {
        assert!(Config::from_toml("[storage]\nbackend = \"postgres\"\n").is_err());
    }

    #[test]
    fn test_api_key_is_not_serialized() {
        let mut config = Config::default();
        config.steam.api_key = "secret".to_string();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
