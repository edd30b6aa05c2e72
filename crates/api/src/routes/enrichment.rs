//! Requirement enrichment endpoint.

use axum::{extract::State, Json};
use digest_core::{limits::MAX_ENRICHMENT_ITEMS, Annotation, RequirementInput};
use serde::{Deserialize, Serialize};
use validator::Validate;
use worker::EnrichOverrides;

use crate::response::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EnrichRequest {
    pub requirements: Vec<RequirementInput>,
    #[serde(default)]
    pub options: Option<EnrichOverrides>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EnrichResponse {
    pub annotations: Vec<Annotation>,
}

/// POST /enrichment
///
/// Always answers with one annotation per input, in input order. Items
/// that could not be researched carry fallback text. Request options can
/// only tighten the configured search cap and pool size.
pub async fn enrich_handler(
    State(state): State<AppState>,
    Json(request): Json<EnrichRequest>,
) -> Result<Json<EnrichResponse>, ApiError> {
    let orchestrator = state
        .enrichment
        .as_ref()
        .ok_or_else(|| ApiError::unavailable("enrichment providers are not configured"))?;

    if request.requirements.len() > MAX_ENRICHMENT_ITEMS {
        return Err(ApiError::validation(vec![format!(
            "requirements: at most {} items per request",
            MAX_ENRICHMENT_ITEMS
        )]));
    }
    for item in &request.requirements {
        item.validate()?;
    }
    let overrides = request.options.unwrap_or_default();
    overrides.validate()?;

    let options = orchestrator.defaults().with_overrides(&overrides);
    let annotations = orchestrator.enrich(&request.requirements, &options).await;

    Ok(Json(EnrichResponse { annotations }))
}
