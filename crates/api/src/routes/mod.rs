//! API routes.

pub mod enrichment;
pub mod health;
pub mod jobs;
pub mod notifications;
pub mod registry;
pub mod unsubscribe;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/notifications/status-change",
            post(notifications::status_change_handler),
        )
        .route("/jobs/digest-flush", post(jobs::digest_flush_handler))
        .route("/jobs/reminders", post(jobs::reminders_handler))
        .route(
            "/unsubscribe",
            get(unsubscribe::confirm_handler).post(unsubscribe::unsubscribe_handler),
        )
        .route("/enrichment", post(enrichment::enrich_handler))
        .route("/registry/companies/:cin", get(registry::company_handler))
        .route("/registry/directors/:din", get(registry::director_handler))
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/health/live", get(health::live_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}
