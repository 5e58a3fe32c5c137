use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::{self, Duration};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Lock-free counters describing collection activity.
#[derive(Debug)]
pub struct StatsCollector {
    passes_completed: AtomicU64,
    ticks_skipped: AtomicU64,
    polls: AtomicU64,
    samples_recorded: AtomicU64,
    fetch_failures: AtomicU64,
    // Unix seconds, 0 until the first pass finishes
    last_pass_at: AtomicU64,
    started_at: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub passes_completed: u64,
    pub ticks_skipped: u64,
    pub polls: u64,
    pub samples_recorded: u64,
    pub fetch_failures: u64,
    pub last_pass_at: Option<u64>,
    pub started_at: u64,
}

fn unix_now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}

impl StatsCollector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            passes_completed: AtomicU64::new(0),
            ticks_skipped: AtomicU64::new(0),
            polls: AtomicU64::new(0),
            samples_recorded: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
            last_pass_at: AtomicU64::new(0),
            started_at: unix_now(),
        })
    }

    /// Spawns the periodic stats dump. Stops when `token` is cancelled.
    pub fn spawn_logger(self: &Arc<Self>, log_interval: Duration, token: CancellationToken) {
        let stats = self.clone();
        tokio::spawn(async move {
            let mut interval = time::interval(log_interval);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => stats.dump_stats(),
                }
            }
        });
    }

    pub fn inc_polls(&self) {
        self.polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_recorded(&self) {
        self.samples_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_fetch_failures(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_skipped_ticks(&self) {
        self.ticks_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pass(&self) {
        self.passes_completed.fetch_add(1, Ordering::Relaxed);
        self.last_pass_at.store(unix_now(), Ordering::Relaxed);
    }

    pub fn get_snapshot(&self) -> StatsSnapshot {
        let last = self.last_pass_at.load(Ordering::Relaxed);
        StatsSnapshot {
            passes_completed: self.passes_completed.load(Ordering::Relaxed),
            ticks_skipped: self.ticks_skipped.load(Ordering::Relaxed),
            polls: self.polls.load(Ordering::Relaxed),
            samples_recorded: self.samples_recorded.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            last_pass_at: (last > 0).then_some(last),
            started_at: self.started_at,
        }
    }

    fn dump_stats(&self) {
        let s = self.get_snapshot();
        let failure_pct = if s.polls > 0 {
            (s.fetch_failures as f64 / s.polls as f64) * 100.0
        } else {
            0.0
        };

        info!(
            "STATS DUMP: Passes: {}, Skipped ticks: {}, Polls: {}, Recorded: {}, Fetch failures: {} ({:.1}%)",
            s.passes_completed, s.ticks_skipped, s.polls, s.samples_recorded, s.fetch_failures, failure_pct
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let stats = StatsCollector::new();
        assert_eq!(stats.get_snapshot().last_pass_at, None);

        stats.inc_polls();
        stats.inc_polls();
        stats.inc_recorded();
        stats.inc_fetch_failures();
        stats.inc_skipped_ticks();
        stats.record_pass();

        let s = stats.get_snapshot();
        assert_eq!(s.polls, 2);
        assert_eq!(s.samples_recorded, 1);
        assert_eq!(s.fetch_failures, 1);
        assert_eq!(s.ticks_skipped, 1);
        assert_eq!(s.passes_completed, 1);
        assert!(s.last_pass_at.is_some());
    }

    #[test]
    fn test_timestamps_are_unix_seconds() {
        let before = Utc::now().timestamp() as u64;
        let stats = StatsCollector::new();
        stats.record_pass();
        let after = Utc::now().timestamp() as u64;

        let s = stats.get_snapshot();
        assert!((before..=after).contains(&s.started_at));
        assert!((before..=after).contains(&s.last_pass_at.unwrap()));
    }
}
