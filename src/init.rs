//! Initialization helpers for the application startup.

use crate::config::Config;
use crate::db::DbClient;
use crate::error::Result;
use crate::store::{GameStore, InMemoryGameStore, SqliteGameStore};
use std::sync::Arc;
use tracing::info;

/// Sets up the tracing subscriber with the configured filters.
pub fn setup_logging(config: &Config) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut filter = config.logging.level.clone();

        // Suppress HTTP stack chatter unless explicitly enabled
        for target in ["hyper", "reqwest"] {
            if !filter.contains(target) {
                filter.push_str(&format!(",{}=warn", target));
            }
        }

        tracing_subscriber::EnvFilter::new(filter)
    });

    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);
    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Opens the configured game store.
///
/// `storage.backend = "sqlite"` opens (and if needed creates) the database
/// file; `"memory"` keeps everything in process and loses it on exit.
pub fn init_store(config: &Config) -> Result<Arc<dyn GameStore>> {
    if config.storage.backend == "memory" {
        info!("Using in-memory game store. Tracked games are lost on restart.");
        return Ok(Arc::new(InMemoryGameStore::new()));
    }

    info!(
        "Opening SQLite game store at {}",
        config.storage.sqlite_path
    );
    let client = Arc::new(DbClient::new(config.storage.sqlite_path.clone())?);
    client.initialize()?;
    Ok(Arc::new(SqliteGameStore::new(client)))
}
