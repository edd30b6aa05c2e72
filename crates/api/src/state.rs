//! Application state shared across handlers.

use crate::middleware::rate_limit::{RateLimitConfig, RateLimiter, SharedRateLimiter};
use digest_core::UnsubscribeSigner;
use research::RegistryClient;
use std::sync::Arc;
use std::time::Duration;
use store::Store;
use worker::{DigestComposer, EnrichmentOrchestrator, EventQueue, ReminderScanner};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Persistence (Postgres in production, in-memory in dev and tests)
    pub store: Arc<dyn Store>,
    pub queue: EventQueue,
    pub digest: Arc<DigestComposer>,
    pub reminders: Arc<ReminderScanner>,
    /// `None` when search or LLM credentials are missing
    pub enrichment: Option<Arc<EnrichmentOrchestrator>>,
    /// `None` when registry credentials are missing
    pub registry: Option<RegistryClient>,
    pub signer: UnsubscribeSigner,
    /// Required `x-cron-secret` value for job triggers, if any
    pub cron_secret: Option<String>,
    /// Limits unsubscribe requests per client
    pub rate_limiter: SharedRateLimiter,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        digest: Arc<DigestComposer>,
        reminders: Arc<ReminderScanner>,
        signer: UnsubscribeSigner,
    ) -> Self {
        Self {
            queue: EventQueue::new(store.clone()),
            store,
            digest,
            reminders,
            enrichment: None,
            registry: None,
            signer,
            cron_secret: None,
            rate_limiter: Arc::new(RateLimiter::new(RateLimitConfig::default())),
        }
    }

    pub fn with_enrichment(mut self, enrichment: Option<Arc<EnrichmentOrchestrator>>) -> Self {
        self.enrichment = enrichment;
        self
    }

    pub fn with_registry(mut self, registry: Option<RegistryClient>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_cron_secret(mut self, secret: Option<String>) -> Self {
        self.cron_secret = secret.filter(|s| !s.is_empty());
        self
    }

    pub fn with_rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limiter = Arc::new(RateLimiter::new(config));
        self
    }

    /// Start the rate limiter cleanup background task.
    pub fn start_rate_limiter_cleanup(&self) -> tokio::task::JoinHandle<()> {
        let rate_limiter = self.rate_limiter.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300));
            loop {
                interval.tick().await;
                rate_limiter.cleanup_stale();
            }
        })
    }
}
