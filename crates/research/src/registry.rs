//! Company registry client (CIN / DIN lookups).

use digest_core::{Cin, Din, Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{non_empty, RegistryConfig};
use crate::http::{build_client, call_failed, decode, ensure_success};
use crate::token_cache::TokenCache;

const PROVIDER: &str = "registry";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Registry API client. Tokens come from the injected [`TokenCache`].
#[derive(Clone)]
pub struct RegistryClient {
    base_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
    tokens: TokenCache,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for RegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryClient")
            .field("base_url", &self.base_url)
            .field("token_url", &self.token_url)
            .finish_non_exhaustive()
    }
}

impl RegistryClient {
    pub fn new(
        base_url: impl Into<String>,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        tokens: TokenCache,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            tokens,
            http_client: build_client(timeout)?,
        })
    }

    /// Build from configuration. Returns `None` unless base URL and client
    /// credentials are all set.
    pub fn from_config(config: &RegistryConfig, tokens: TokenCache) -> Result<Option<Self>> {
        let (Some(base_url), Some(client_id), Some(client_secret)) = (
            non_empty(&config.base_url),
            non_empty(&config.client_id),
            non_empty(&config.client_secret),
        ) else {
            return Ok(None);
        };

        let token_url = non_empty(&config.token_url)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}/oauth/token", base_url.trim_end_matches('/')));

        Self::new(
            base_url,
            token_url,
            client_id,
            client_secret,
            tokens,
            Duration::from_secs(config.timeout_secs),
        )
        .map(Some)
    }

    pub async fn company(&self, cin: &Cin) -> Result<Value> {
        self.get_record(&format!("companies/{}", cin.as_str())).await
    }

    pub async fn director(&self, din: &Din) -> Result<Value> {
        self.get_record(&format!("directors/{}", din.as_str())).await
    }

    async fn access_token(&self) -> Result<String> {
        self.tokens.get_or_fetch(self.fetch_token()).await
    }

    async fn fetch_token(&self) -> Result<String> {
        let response = self
            .http_client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| call_failed(PROVIDER, e))?;
        let response = ensure_success(PROVIDER, response).await?;
        let token: TokenResponse = decode(PROVIDER, response).await?;
        info!("Obtained registry access token");
        Ok(token.access_token)
    }

    /// GET a record; a 401 drops the cached token and retries once.
    async fn get_record(&self, path: &str) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path);

        for attempt in 0..2 {
            let token = self.access_token().await?;
            debug!(url = %url, attempt, "Registry lookup");

            let response = self
                .http_client
                .get(&url)
                .bearer_auth(&token)
                .send()
                .await
                .map_err(|e| call_failed(PROVIDER, e))?;

            match response.status() {
                reqwest::StatusCode::UNAUTHORIZED if attempt == 0 => {
                    self.tokens.invalidate().await;
                    continue;
                }
                reqwest::StatusCode::NOT_FOUND => {
                    return Err(Error::not_found(format!("registry record {}", path)));
                }
                _ => {
                    let response = ensure_success(PROVIDER, response).await?;
                    return decode(PROVIDER, response).await;
                }
            }
        }

        Err(Error::unauthorized("registry rejected a fresh access token"))
    }
}
