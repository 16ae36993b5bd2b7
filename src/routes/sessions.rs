use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::info;

use crate::models::{Caller, NewPhrase, PhraseUpdate};
use crate::routes::api::ApiState;
use crate::services::DEFAULT_SESSION_LIMIT;
use crate::utils::error::{AppError, Result};

pub(crate) fn routes() -> Router<ApiState> {
    Router::new()
        .route("/sessions", get(list_sessions))
        .route("/sessions/:id", delete(delete_session))
        .route("/phrases", get(list_phrases).post(create_phrase))
        .route("/phrases/:id", delete(delete_phrase).put(update_phrase))
}

#[derive(Debug, Deserialize)]
struct SessionsQuery {
    limit: Option<usize>,
}

/// GET /sessions?limit=N
async fn list_sessions(
    State(state): State<ApiState>,
    caller: Caller,
    query: std::result::Result<Query<SessionsQuery>, QueryRejection>,
) -> Result<Json<JsonValue>> {
    let user_id = caller.require_user()?;
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_SESSION_LIMIT);

    let sessions = state.sessions.list_sessions(user_id, limit).await?;
    Ok(Json(json!({ "success": true, "data": sessions })))
}

/// DELETE /sessions/:id
async fn delete_session(
    State(state): State<ApiState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<JsonValue>> {
    let user_id = caller.require_user()?;

    if !state.sessions.delete_session(user_id, &id).await? {
        return Err(AppError::NotFound(format!("Session '{}' not found", id)));
    }

    info!("🗑️ Deleted session {} for {}", id, user_id);
    Ok(Json(json!({ "success": true, "data": { "id": id } })))
}

/// GET /phrases
async fn list_phrases(State(state): State<ApiState>, caller: Caller) -> Result<Json<JsonValue>> {
    let user_id = caller.require_user()?;

    let phrases = state.sessions.list_phrases(user_id).await?;
    Ok(Json(json!({ "success": true, "data": phrases })))
}

/// POST /phrases
async fn create_phrase(
    State(state): State<ApiState>,
    caller: Caller,
    new: std::result::Result<Json<NewPhrase>, JsonRejection>,
) -> Result<(StatusCode, Json<JsonValue>)> {
    let user_id = caller.require_user()?;
    let Json(new) = new?;

    if new.phrase.trim().is_empty() {
        return Err(AppError::BadRequest("Phrase is required".to_string()));
    }

    let phrase = state.sessions.create_phrase(user_id, new).await?;
    info!("📝 Saved phrase {} for {}", phrase.id, user_id);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": phrase })),
    ))
}

/// PUT /phrases/:id
async fn update_phrase(
    State(state): State<ApiState>,
    caller: Caller,
    Path(id): Path<String>,
    update: std::result::Result<Json<PhraseUpdate>, JsonRejection>,
) -> Result<Json<JsonValue>> {
    let user_id = caller.require_user()?;
    let Json(update) = update?;

    if update.has_blank_phrase() {
        return Err(AppError::BadRequest("Phrase must not be blank".to_string()));
    }

    let Some(phrase) = state.sessions.update_phrase(user_id, &id, update).await? else {
        return Err(AppError::NotFound(format!("Phrase '{}' not found", id)));
    };

    info!("✏️ Updated phrase {} for {}", id, user_id);
    Ok(Json(json!({ "success": true, "data": phrase })))
}

/// DELETE /phrases/:id
async fn delete_phrase(
    State(state): State<ApiState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<JsonValue>> {
    let user_id = caller.require_user()?;

    if !state.sessions.delete_phrase(user_id, &id).await? {
        return Err(AppError::NotFound(format!("Phrase '{}' not found", id)));
    }

    Ok(Json(json!({ "success": true, "data": { "id": id } })))
}
