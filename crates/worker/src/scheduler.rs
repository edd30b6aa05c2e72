//! In-process scheduler for the digest flush and reminder scan.
//!
//! The HTTP job endpoints trigger the same runs; overlapping runs are safe
//! because queue rows are claimed atomically and reminder sends are
//! guarded by the daily log.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::digest::DigestComposer;
use crate::reminders::ReminderScanner;

/// Worker scheduler configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Digest flush interval
    pub flush_interval: Duration,
    /// Reminder scan interval
    pub reminder_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_secs(5 * 60),
            reminder_interval: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Background worker scheduler.
pub struct WorkerScheduler {
    config: WorkerConfig,
    digest: Arc<DigestComposer>,
    reminders: Arc<ReminderScanner>,
}

impl WorkerScheduler {
    pub fn new(config: WorkerConfig, digest: Arc<DigestComposer>, reminders: Arc<ReminderScanner>) -> Self {
        Self {
            config,
            digest,
            reminders,
        }
    }

    /// Starts all background workers.
    pub fn start(self: Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_digest_flush().await;
        }));

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_reminder_scan().await;
        }));

        info!(
            flush_interval_secs = self.config.flush_interval.as_secs(),
            reminder_interval_secs = self.config.reminder_interval.as_secs(),
            "Background workers started"
        );
        handles
    }

    async fn run_digest_flush(&self) {
        let mut ticker = interval(self.config.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match self.digest.flush().await {
                Ok(_) => {}
                Err(e) if e.http_status() == 503 => warn!("Digest flush skipped: {}", e),
                Err(e) => error!("Digest flush error: {}", e),
            }
        }
    }

    async fn run_reminder_scan(&self) {
        let mut ticker = interval(self.config.reminder_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match self.reminders.run_today().await {
                Ok(_) => {}
                Err(e) if e.http_status() == 503 => warn!("Reminder scan skipped: {}", e),
                Err(e) => error!("Reminder scan error: {}", e),
            }
        }
    }
}
