//! Scheduler trigger endpoints.
//!
//! An external cron can drive the pipelines instead of (or alongside) the
//! in-process scheduler. Both runs are safe to repeat: the flush claims
//! rows atomically and the reminder scan is idempotent per user and day.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;
use worker::{FlushReport, ReminderReport};

use crate::extractors::CronAuth;
use crate::response::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ReminderQuery {
    /// Scan date override, `YYYY-MM-DD`. Defaults to today (UTC).
    pub date: Option<NaiveDate>,
}

/// POST /jobs/digest-flush
pub async fn digest_flush_handler(
    State(state): State<AppState>,
    _auth: CronAuth,
) -> Result<Json<FlushReport>, ApiError> {
    let report = state.digest.flush().await?;
    info!(
        sent = report.sent,
        suppressed = report.suppressed,
        failed = report.failed,
        "Digest flush triggered"
    );
    Ok(Json(report))
}

/// POST /jobs/reminders
pub async fn reminders_handler(
    State(state): State<AppState>,
    _auth: CronAuth,
    Query(query): Query<ReminderQuery>,
) -> Result<Json<ReminderReport>, ApiError> {
    let today = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let report = state.reminders.run(today).await?;
    info!(
        %today,
        sent = report.sent,
        skipped = report.skipped_already_sent,
        "Reminder scan triggered"
    );
    Ok(Json(report))
}
