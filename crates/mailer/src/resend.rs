//! Resend-compatible HTTP mailer.

use async_trait::async_trait;
use digest_core::{Error, ProviderErrorCode, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::MailerConfig;
use crate::sender::{EmailSender, OutgoingEmail, SendReceipt};

const PROVIDER: &str = "mailer";

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<&'static str, String>,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    id: Option<String>,
}

/// Mailer posting to `{base_url}/emails`.
#[derive(Clone)]
pub struct ResendMailer {
    base_url: String,
    api_key: String,
    from: String,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for ResendMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResendMailer")
            .field("base_url", &self.base_url)
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}

impl ResendMailer {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            from: from.into(),
            http_client,
        })
    }

    /// Build from configuration. Returns `None` when no API key is set.
    pub fn from_config(config: &MailerConfig) -> Result<Option<Self>> {
        let Some(api_key) = config.api_key.as_deref().filter(|k| !k.is_empty()) else {
            return Ok(None);
        };
        Self::new(
            &config.base_url,
            api_key,
            &config.from,
            Duration::from_secs(config.timeout_secs),
        )
        .map(Some)
    }
}

#[async_trait]
impl EmailSender for ResendMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt> {
        let url = format!("{}/emails", self.base_url);

        let mut headers = BTreeMap::new();
        if let Some(unsubscribe) = &email.unsubscribe_url {
            headers.insert("List-Unsubscribe", format!("<{}>", unsubscribe));
            headers.insert("List-Unsubscribe-Post", "List-Unsubscribe=One-Click".to_string());
        }

        let request = SendRequest {
            from: &self.from,
            to: &email.to,
            subject: &email.subject,
            html: &email.html,
            headers,
        };

        debug!(recipients = email.to.len(), subject = %email.subject, "Sending email");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Mail API request failed");
                Error::provider(ProviderErrorCode::CallFailed, PROVIDER, e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Mail API returned error");
            return Err(Error::provider(
                ProviderErrorCode::CallFailed,
                PROVIDER,
                format!("mail API returned {}: {}", status, body),
            ));
        }

        let parsed: SendResponse = response.json().await.map_err(|e| {
            Error::provider(ProviderErrorCode::MalformedResponse, PROVIDER, e.to_string())
        })?;

        Ok(SendReceipt { id: parsed.id })
    }
}
