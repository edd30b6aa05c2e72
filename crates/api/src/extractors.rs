//! Request extractors.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::response::ApiError;
use crate::state::AppState;

/// Header carrying the scheduler secret.
pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

/// Proof that a job request carried the scheduler secret.
///
/// When no secret is configured every caller is accepted.
#[derive(Debug, Clone, Copy)]
pub struct CronAuth;

#[async_trait]
impl FromRequestParts<AppState> for CronAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.cron_secret.as_deref() else {
            return Ok(CronAuth);
        };

        let provided = parts
            .headers
            .get(CRON_SECRET_HEADER)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default();

        if bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
            Ok(CronAuth)
        } else {
            warn!(path = %parts.uri.path(), "Rejected job trigger with bad scheduler secret");
            Err(ApiError::unauthorized("invalid scheduler secret"))
        }
    }
}

/// Client IP address.
#[derive(Debug, Clone)]
pub struct ClientIp(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // first hop of X-Forwarded-For, then X-Real-IP
        let forwarded = parts
            .headers
            .get("X-Forwarded-For")
            .and_then(|h| h.to_str().ok())
            .and_then(|xff| xff.split(',').next())
            .map(|ip| ip.trim().to_string())
            .filter(|ip| !ip.is_empty());

        let ip = forwarded.or_else(|| {
            parts
                .headers
                .get("X-Real-IP")
                .and_then(|h| h.to_str().ok())
                .map(str::to_string)
        });

        Ok(ClientIp(ip))
    }
}

impl ClientIp {
    /// Rate-limit key; unknown clients share one bucket.
    pub fn key(&self) -> &str {
        self.0.as_deref().unwrap_or("unknown")
    }
}
