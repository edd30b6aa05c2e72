//! HTTP API layer for the compliance notifier.

pub mod extractors;
pub mod middleware;
pub mod render;
pub mod response;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
