//! Shared HTTP plumbing for provider clients.

use digest_core::{Error, ProviderErrorCode, Result};
use std::time::Duration;
use tracing::warn;

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::internal(format!("failed to build HTTP client: {}", e)))
}

pub(crate) fn call_failed(provider: &'static str, e: reqwest::Error) -> Error {
    warn!(provider, error = %e, "Provider request failed");
    Error::provider(ProviderErrorCode::CallFailed, provider, e.to_string())
}

/// Turn a non-2xx response into a provider error.
pub(crate) async fn ensure_success(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    warn!(provider, status = %status, body = %body, "Provider returned error");
    Err(Error::provider(
        ProviderErrorCode::CallFailed,
        provider,
        format!("returned {}: {}", status, body),
    ))
}

/// Decode a JSON body, mapping failures to a malformed-response error.
pub(crate) async fn decode<T: serde::de::DeserializeOwned>(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<T> {
    response.json().await.map_err(|e| {
        warn!(provider, error = %e, "Failed to parse provider response");
        Error::provider(ProviderErrorCode::MalformedResponse, provider, e.to_string())
    })
}
