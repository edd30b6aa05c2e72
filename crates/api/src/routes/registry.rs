//! Company registry proxy.

use axum::{
    extract::{Path, State},
    Json,
};
use digest_core::{Cin, Din};
use research::RegistryClient;
use serde_json::Value;

use crate::response::ApiError;
use crate::state::AppState;

fn client(state: &AppState) -> Result<&RegistryClient, ApiError> {
    state
        .registry
        .as_ref()
        .ok_or_else(|| ApiError::unavailable("registry is not configured"))
}

/// GET /registry/companies/:cin
pub async fn company_handler(
    State(state): State<AppState>,
    Path(cin): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let registry = client(&state)?;
    let cin = Cin::parse(&cin)?;
    Ok(Json(registry.company(&cin).await?))
}

/// GET /registry/directors/:din
pub async fn director_handler(
    State(state): State<AppState>,
    Path(din): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let registry = client(&state)?;
    let din = Din::parse(&din)?;
    Ok(Json(registry.director(&din).await?))
}
