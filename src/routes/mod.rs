pub mod api;
pub mod health;
pub mod sessions;
pub mod users;

use axum::{routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;

pub use api::{create_router as create_api_router, ApiState, TRANSFORM_SOURCE_HEADER};
pub use health::{health_check, ping, AppState};

/// Full application router: health endpoints at the root, the API under `/api`.
///
/// Requests still running after `request_timeout` are answered with 408.
pub fn create_app(
    api_state: ApiState,
    health_state: Arc<AppState>,
    request_timeout: Duration,
) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ping", get(ping))
        .with_state(health_state)
        .nest("/api", create_api_router(api_state))
        .layer(TimeoutLayer::new(request_timeout))
}
