//! LLM chat completion client.

use async_trait::async_trait;
use digest_core::{Error, ProviderErrorCode, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use telemetry::metrics;
use tracing::debug;

use crate::config::{non_empty, LlmConfig};
use crate::http::{build_client, call_failed, decode, ensure_success};

const PROVIDER: &str = "llm";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat-style text completion.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Returns the assistant text of the first choice.
    async fn complete(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible `POST /chat/completions` client.
#[derive(Clone)]
pub struct ChatCompletionsClient {
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    http_client: reqwest::Client,
}

impl ChatCompletionsClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.2,
            http_client: build_client(timeout)?,
        })
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Build from configuration. Returns `None` when no API key is set.
    pub fn from_config(config: &LlmConfig) -> Result<Option<Self>> {
        let Some(api_key) = non_empty(&config.api_key) else {
            return Ok(None);
        };
        Self::new(
            &config.base_url,
            api_key,
            &config.model,
            Duration::from_secs(config.timeout_secs),
        )
        .map(|client| Some(client.with_temperature(config.temperature)))
    }
}

#[async_trait]
impl LlmClient for ChatCompletionsClient {
    async fn complete(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<String> {
        metrics().llm_calls.inc();
        debug!(model = %self.model, messages = messages.len(), "Requesting completion");

        let request = CompletionRequest {
            model: &self.model,
            messages,
            max_tokens,
            temperature: self.temperature,
        };

        let result = async {
            let response = self
                .http_client
                .post(format!("{}/chat/completions", self.base_url))
                .bearer_auth(&self.api_key)
                .json(&request)
                .send()
                .await
                .map_err(|e| call_failed(PROVIDER, e))?;
            let response = ensure_success(PROVIDER, response).await?;
            let parsed: CompletionResponse = decode(PROVIDER, response).await?;

            parsed
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .ok_or_else(|| {
                    Error::provider(
                        ProviderErrorCode::MalformedResponse,
                        PROVIDER,
                        "completion has no content",
                    )
                })
        }
        .await;

        if result.is_err() {
            metrics().llm_failures.inc();
        }
        result
    }
}
