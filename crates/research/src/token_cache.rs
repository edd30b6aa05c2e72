//! Access-token cache with expiry.
//!
//! One instance is built at startup and handed to the clients that need
//! it. Concurrent misses share a single fetch.

use digest_core::{Error, Result};
use moka::future::Cache;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Default token lifetime (50 minutes), under the usual one-hour grant.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(50 * 60);

const TOKEN_KEY: &str = "access_token";

#[derive(Clone)]
pub struct TokenCache {
    cache: Cache<&'static str, String>,
    ttl: Duration,
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache").field("ttl", &self.ttl).finish()
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_TTL)
    }
}

impl TokenCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached token, if present and unexpired.
    pub async fn current(&self) -> Option<String> {
        self.cache.get(TOKEN_KEY).await
    }

    /// Return the cached token or run `fetch` to obtain a new one.
    pub async fn get_or_fetch<F>(&self, fetch: F) -> Result<String>
    where
        F: Future<Output = Result<String>>,
    {
        self.cache
            .try_get_with(TOKEN_KEY, async {
                debug!("Fetching new access token");
                fetch.await
            })
            .await
            .map_err(|e| match e.as_ref() {
                Error::Provider { code, provider, message, http_status } => Error::Provider {
                    code: *code,
                    provider: *provider,
                    message: message.clone(),
                    http_status: *http_status,
                },
                other => Error::internal(other.to_string()),
            })
    }

    /// Drop the cached token, e.g. after the server rejected it.
    pub async fn invalidate(&self) {
        self.cache.invalidate(TOKEN_KEY).await;
    }
}
