use anyhow::{Context, Result};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use steam_tracker::api::{start_api_server, ApiState};
use steam_tracker::config::Config;
use steam_tracker::engine::{Collector, QueryService, Scheduler, SteamClient};
use steam_tracker::init::{init_store, setup_logging};
use steam_tracker::stats::StatsCollector;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load Config
    let config_path = std::env::args().nth(1).unwrap_or("config.toml".to_string());
    let config_exists = std::path::Path::new(&config_path).exists();
    let config = if config_exists {
        Config::load(&config_path).await?
    } else {
        Config::default()
    };

    // 2. Setup Logging
    setup_logging(&config);
    info!("Starting steam-tracker...");

    if !config_exists {
        info!("Config file not found, using defaults.");
    }

    let shutdown = CancellationToken::new();

    // 3. Init Stats
    let stats = StatsCollector::new();
    if config.stats.enable {
        stats.spawn_logger(
            Duration::from_secs(config.stats.log_interval_seconds),
            shutdown.clone(),
        );
    }

    // 4. Init Store
    let store = init_store(&config).context("Failed to open game store")?;

    // 5. Init Steam Client
    let steam = Arc::new(SteamClient::new(&config.steam).context("Failed to build HTTP client")?);

    // 6. Build Collector & Query Facade
    let collector = Arc::new(Collector::new(store.clone(), steam.clone(), stats.clone()));
    let queries = Arc::new(QueryService::new(
        store,
        steam,
        config.history.default_days,
    ));

    // 7. Start Scheduler
    let scheduler = if config.scheduler.enable {
        Some(Scheduler::start(
            collector.clone(),
            config.scheduler_interval(),
            shutdown.child_token(),
        ))
    } else {
        info!("Scheduler disabled; collection runs only on demand.");
        None
    };

    // 8. Start API Server
    let host = config
        .host
        .parse::<IpAddr>()
        .with_context(|| format!("Invalid host '{}'", config.host))?;
    let addr = SocketAddr::new(host, config.port);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let state = Arc::new(ApiState {
        collector,
        queries,
        stats,
        config: config.clone(),
    });
    let server = tokio::spawn(start_api_server(listener, state, shutdown.clone()));

    // 9. Graceful Shutdown
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received."),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
    shutdown.cancel();

    if let Some(scheduler) = scheduler {
        scheduler.shutdown().await;
    }
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("API server error: {}", e),
        Err(e) => error!("API server task failed: {}", e),
    }

    info!("steam-tracker stopped.");
    Ok(())
}
