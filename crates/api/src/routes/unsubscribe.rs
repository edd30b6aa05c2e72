//! One-click unsubscribe.
//!
//! GET renders a confirmation page so link scanners that prefetch URLs
//! cannot unsubscribe anyone. POST applies the change; mail clients that
//! honor `List-Unsubscribe-Post` call it directly.

use axum::{
    extract::{Query, State},
    http::StatusCode,
};
use digest_core::{EmailPreference, UnsubscribeClaims};
use serde::Deserialize;
use tracing::{info, warn};

use crate::extractors::ClientIp;
use crate::render::{escape_html, unsubscribe_form};
use crate::response::{ApiError, HtmlPage};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

fn invalid_link() -> HtmlPage {
    HtmlPage::error(
        StatusCode::BAD_REQUEST,
        "Invalid link",
        "<p>This unsubscribe link is invalid or has been altered.</p>",
    )
}

fn verify(state: &AppState, query: &TokenQuery) -> Option<UnsubscribeClaims> {
    let token = query.token.as_deref()?;
    state.signer.verify(token)
}

fn limit(state: &AppState, ip: &ClientIp) -> Result<(), ApiError> {
    state
        .rate_limiter
        .check(ip.key())
        .map_err(ApiError::rate_limited)
}

/// GET /unsubscribe?token=...
pub async fn confirm_handler(
    State(state): State<AppState>,
    ip: ClientIp,
    Query(query): Query<TokenQuery>,
) -> Result<HtmlPage, ApiError> {
    limit(&state, &ip)?;

    let Some(claims) = verify(&state, &query) else {
        return Ok(invalid_link());
    };
    let token = query.token.as_deref().unwrap_or_default();

    Ok(HtmlPage::ok(
        "Unsubscribe",
        unsubscribe_form(token, claims.kind.describe()),
    ))
}

/// POST /unsubscribe?token=...
pub async fn unsubscribe_handler(
    State(state): State<AppState>,
    ip: ClientIp,
    Query(query): Query<TokenQuery>,
) -> Result<HtmlPage, ApiError> {
    limit(&state, &ip)?;

    let Some(claims) = verify(&state, &query) else {
        warn!(client = ip.key(), "Rejected unsubscribe with invalid token");
        return Ok(invalid_link());
    };

    let mut preferences = state
        .store
        .load_preferences(std::slice::from_ref(&claims.user_id))
        .await?;
    let mut preference = preferences
        .remove(&claims.user_id)
        .unwrap_or_else(|| EmailPreference::subscribed(claims.user_id.clone()));

    preference.apply_unsubscribe(claims.kind);
    state.store.upsert_preference(&preference).await?;

    info!(user_id = %claims.user_id, kind = claims.kind.as_str(), "User unsubscribed");

    Ok(HtmlPage::ok(
        "Unsubscribed",
        format!(
            "<p>You will no longer receive {}.</p>",
            escape_html(claims.kind.describe())
        ),
    ))
}
