//! Web search client.

use async_trait::async_trait;
use digest_core::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use telemetry::metrics;
use tracing::debug;

use crate::config::{non_empty, SearchConfig};
use crate::http::{build_client, call_failed, decode, ensure_success};

const PROVIDER: &str = "search";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    #[default]
    Basic,
    Advanced,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub results: Vec<SearchHit>,
}

impl SearchResponse {
    pub fn top(&self) -> Option<&SearchHit> {
        self.results.first()
    }
}

/// Web search provider.
#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(&self, query: &str, depth: SearchDepth) -> Result<SearchResponse>;
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: SearchDepth,
    max_results: u32,
    include_answer: bool,
}

/// Tavily-compatible `POST /search` client.
#[derive(Clone)]
pub struct TavilyClient {
    base_url: String,
    api_key: String,
    max_results: u32,
    http_client: reqwest::Client,
}

impl TavilyClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        max_results: u32,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            max_results,
            http_client: build_client(timeout)?,
        })
    }

    /// Build from configuration. Returns `None` when no API key is set.
    pub fn from_config(config: &SearchConfig) -> Result<Option<Self>> {
        let Some(api_key) = non_empty(&config.api_key) else {
            return Ok(None);
        };
        Self::new(
            &config.base_url,
            api_key,
            config.max_results,
            Duration::from_secs(config.timeout_secs),
        )
        .map(Some)
    }
}

#[async_trait]
impl SearchClient for TavilyClient {
    async fn search(&self, query: &str, depth: SearchDepth) -> Result<SearchResponse> {
        metrics().search_calls.inc();
        debug!(query = %query, "Searching");

        let request = SearchRequest {
            api_key: &self.api_key,
            query,
            search_depth: depth,
            max_results: self.max_results,
            include_answer: true,
        };

        let result = async {
            let response = self
                .http_client
                .post(format!("{}/search", self.base_url))
                .json(&request)
                .send()
                .await
                .map_err(|e| call_failed(PROVIDER, e))?;
            let response = ensure_success(PROVIDER, response).await?;
            decode::<SearchResponse>(PROVIDER, response).await
        }
        .await;

        if result.is_err() {
            metrics().search_failures.inc();
        }
        result
    }
}
