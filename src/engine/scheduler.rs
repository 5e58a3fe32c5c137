use super::collector::Collector;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Fixed-rate timer that runs a collection pass on every tick.
///
/// Ticks fire on schedule regardless of how long a pass takes; a tick that
/// lands while the previous pass is still running is skipped.
pub struct Scheduler {
    handle: JoinHandle<()>,
    token: CancellationToken,
}

impl Scheduler {
    /// Spawns the timer loop. The first pass starts immediately.
    pub fn start(collector: Arc<Collector>, period: Duration, token: CancellationToken) -> Self {
        info!("Starting collection scheduler (every {:?})", period);
        let loop_token = token.clone();
        let handle = tokio::spawn(async move {
            run(collector, period, loop_token).await;
        });
        Self { handle, token }
    }

    /// Stops ticking and waits for an in-flight pass to finish.
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            error!("Scheduler task failed: {}", e);
        }
        info!("Collection scheduler stopped.");
    }
}

async fn run(collector: Arc<Collector>, period: Duration, token: CancellationToken) {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut in_flight: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => {
                if in_flight.as_ref().is_some_and(|h| !h.is_finished()) {
                    collector.stats().inc_skipped_ticks();
                    warn!("Previous collection pass still running, skipping tick");
                } else {
                    in_flight = Some(tokio::spawn(scheduled_pass(collector.clone())));
                }
            }
        }
    }

    if let Some(pass) = in_flight {
        if let Err(e) = pass.await {
            error!("Collection pass failed: {}", e);
        }
    }
}

async fn scheduled_pass(collector: Arc<Collector>) {
    info!("Scheduled player count collection started");
    match collector.try_collect_all().await {
        Some(summary) => info!(
            "Scheduled player count collection completed ({} games)",
            summary.processed
        ),
        None => {
            // a manual pass holds the guard
            collector.stats().inc_skipped_ticks();
            warn!("A collection pass is already running, skipping tick");
        }
    }
}
