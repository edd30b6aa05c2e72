//! Status-change intake.

use axum::{extract::State, http::StatusCode, Json};
use digest_core::StatusChangeEvent;
use tracing::debug;
use validator::Validate;

use crate::response::{ApiError, EnqueueResponse};
use crate::state::AppState;

/// POST /notifications/status-change
///
/// Validates the event and appends it to the queue. Enqueue is
/// best-effort: a storage failure is logged and reported as
/// `queued: false`, never as an error, so the caller's own write is
/// not undone by a notification problem.
pub async fn status_change_handler(
    State(state): State<AppState>,
    Json(event): Json<StatusChangeEvent>,
) -> Result<(StatusCode, Json<EnqueueResponse>), ApiError> {
    event.validate()?;

    debug!(
        user_id = %event.user_id,
        requirement_id = %event.requirement_id,
        "Status change received"
    );

    let queued = state.queue.enqueue_status_change(event).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(EnqueueResponse {
            queued: queued.is_some(),
            id: queued.map(|item| item.id),
        }),
    ))
}
