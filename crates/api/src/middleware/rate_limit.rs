//! Per-client token bucket rate limiting for public routes.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Token bucket rate limiter keyed by client.
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    config: RateLimitConfig,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Tokens replenished per second
    pub rate: f64,
    /// Bucket capacity
    pub burst: u32,
    /// Buckets idle this long are dropped by `cleanup_stale`
    pub idle_ttl: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            rate: 1.0,
            burst: 10,
            idle_ttl: Duration::from_secs(600),
        }
    }
}

struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(burst: u32, now: Instant) -> Self {
        Self {
            tokens: burst as f64,
            last_update: now,
        }
    }

    /// Take one token, or return whole seconds until one is available.
    fn try_acquire(&mut self, rate: f64, burst: u32, now: Instant) -> Result<(), u64> {
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.last_update = now;
        self.tokens = (self.tokens + elapsed * rate).min(burst as f64);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else if rate > 0.0 {
            Err(((1.0 - self.tokens) / rate).ceil().max(1.0) as u64)
        } else {
            Err(u64::MAX)
        }
    }
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Admit one request for `key`; `Err` carries a Retry-After in seconds.
    pub fn check(&self, key: &str) -> Result<(), u64> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<(), u64> {
        let mut buckets = self.buckets.lock();
        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.config.burst, now));
        bucket.try_acquire(self.config.rate, self.config.burst, now)
    }

    /// Drop buckets idle longer than the configured TTL.
    pub fn cleanup_stale(&self) {
        let now = Instant::now();
        let ttl = self.config.idle_ttl;
        self.buckets
            .lock()
            .retain(|_, bucket| now.duration_since(bucket.last_update) < ttl);
    }

    pub fn tracked_clients(&self) -> usize {
        self.buckets.lock().len()
    }
}

/// Shared rate limiter state.
pub type SharedRateLimiter = Arc<RateLimiter>;
