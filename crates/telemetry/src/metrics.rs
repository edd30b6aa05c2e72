//! In-process pipeline metrics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 10ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s, 30s, 60s
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [10, 50, 100, 250, 500, 1000, 2500, 5000, 10000, 30000, 60000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let idx = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BUCKET_BOUNDS.len() - 1);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns bucket counts.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the notifier.
#[derive(Debug, Default)]
pub struct Metrics {
    // Event queue
    pub items_enqueued: Counter,
    pub enqueue_failures: Counter,

    // Digest flush
    pub flush_runs: Counter,
    pub digests_sent: Counter,
    pub digest_send_failures: Counter,
    pub items_processed: Counter,
    pub items_suppressed: Counter,

    // Reminders
    pub reminder_runs: Counter,
    pub reminders_sent: Counter,
    pub reminders_skipped: Counter,
    pub reminder_failures: Counter,

    // Enrichment
    pub enrichment_cache_hits: Counter,
    pub enrichment_cache_misses: Counter,
    pub search_calls: Counter,
    pub search_failures: Counter,
    pub llm_calls: Counter,
    pub llm_failures: Counter,

    // Latency histograms
    pub flush_latency_ms: Histogram,
    pub reminder_latency_ms: Histogram,
    pub enrichment_latency_ms: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub items_enqueued: u64,
    pub enqueue_failures: u64,
    pub flush_runs: u64,
    pub digests_sent: u64,
    pub digest_send_failures: u64,
    pub items_processed: u64,
    pub items_suppressed: u64,
    pub reminder_runs: u64,
    pub reminders_sent: u64,
    pub reminders_skipped: u64,
    pub reminder_failures: u64,
    pub enrichment_cache_hits: u64,
    pub enrichment_cache_misses: u64,
    pub search_calls: u64,
    pub llm_calls: u64,
    pub flush_latency_mean_ms: f64,
    pub reminder_latency_mean_ms: f64,
    pub enrichment_latency_mean_ms: f64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            items_enqueued: self.items_enqueued.get(),
            enqueue_failures: self.enqueue_failures.get(),
            flush_runs: self.flush_runs.get(),
            digests_sent: self.digests_sent.get(),
            digest_send_failures: self.digest_send_failures.get(),
            items_processed: self.items_processed.get(),
            items_suppressed: self.items_suppressed.get(),
            reminder_runs: self.reminder_runs.get(),
            reminders_sent: self.reminders_sent.get(),
            reminders_skipped: self.reminders_skipped.get(),
            reminder_failures: self.reminder_failures.get(),
            enrichment_cache_hits: self.enrichment_cache_hits.get(),
            enrichment_cache_misses: self.enrichment_cache_misses.get(),
            search_calls: self.search_calls.get(),
            llm_calls: self.llm_calls.get(),
            flush_latency_mean_ms: self.flush_latency_ms.mean(),
            reminder_latency_mean_ms: self.reminder_latency_ms.mean(),
            enrichment_latency_mean_ms: self.enrichment_latency_ms.mean(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
