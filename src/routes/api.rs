// VibeUp API routes
//
// - POST /transform  rewrite a message (model or fallback)
// - GET  /usage      today's budget snapshot
// - GET  /usage/anonymous  count of retained anonymous transformations
// - session and phrase history, see `sessions`
// - user profiles, see `users`
//
// Nested under /api by the binary.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderName, HeaderValue},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use tracing::info;

use crate::middleware::identify_caller;
use crate::models::{Caller, TransformRequest, UsageResponse};
use crate::routes::{sessions, users};
use crate::services::{SessionStore, TransformationGateway, UsageStore, UserStore};
use crate::utils::error::Result;

/// Response header naming where the transformation came from
pub const TRANSFORM_SOURCE_HEADER: &str = "x-transform-source";

#[derive(Clone)]
pub struct ApiState {
    pub gateway: Arc<TransformationGateway>,
    pub usage: Arc<dyn UsageStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub users: Arc<dyn UserStore>,
}

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/transform", post(handle_transform))
        .route("/usage", get(handle_usage))
        .route("/usage/anonymous", get(handle_anonymous_usage))
        .merge(sessions::routes())
        .merge(users::routes())
        .layer(middleware::from_fn(identify_caller))
        .with_state(state)
}

/// POST /transform
async fn handle_transform(
    State(state): State<ApiState>,
    caller: Caller,
    request: std::result::Result<Json<TransformRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = request?;
    info!(
        "📨 Transform request ({})",
        caller.user_id().unwrap_or("anonymous")
    );

    let outcome = state
        .gateway
        .transform(&caller, request.text.as_deref())
        .await?;

    let mut response = Json(outcome.result).into_response();
    response.headers_mut().insert(
        HeaderName::from_static(TRANSFORM_SOURCE_HEADER),
        HeaderValue::from_static(outcome.source.header_value()),
    );
    Ok(response)
}

/// GET /usage
async fn handle_usage(State(state): State<ApiState>) -> Result<Json<UsageResponse>> {
    let snapshot = state.usage.peek().await?;
    Ok(Json(UsageResponse::from(&snapshot)))
}

/// GET /usage/anonymous
async fn handle_anonymous_usage(State(state): State<ApiState>) -> Result<Json<JsonValue>> {
    let tracked = state.sessions.count_anonymous().await?;
    Ok(Json(json!({ "success": true, "data": { "tracked": tracked } })))
}
