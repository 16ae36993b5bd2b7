use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value as JsonValue};
use tracing::info;

use crate::models::{Caller, NewUser, UserUpdate};
use crate::routes::api::ApiState;
use crate::services::validate_email;
use crate::utils::error::{AppError, Result};

pub(crate) fn routes() -> Router<ApiState> {
    Router::new()
        .route("/users", post(upsert_user))
        .route("/users/:id", get(get_user).put(update_user))
}

/// Callers may only read or change their own profile
fn require_self<'a>(caller: &'a Caller, id: &str) -> Result<&'a str> {
    let user_id = caller.require_user()?;
    if user_id != id {
        return Err(AppError::Forbidden(
            "Profiles can only be accessed by their owner".to_string(),
        ));
    }
    Ok(user_id)
}

/// POST /users, creating or replacing the caller's profile
async fn upsert_user(
    State(state): State<ApiState>,
    caller: Caller,
    new: std::result::Result<Json<NewUser>, JsonRejection>,
) -> Result<Json<JsonValue>> {
    let user_id = caller.require_user()?;
    let Json(new) = new?;
    validate_email(&new.email)?;

    let user = state.users.upsert_user(user_id, new).await?;
    info!("👤 Saved profile for {}", user_id);

    Ok(Json(json!({ "success": true, "data": user })))
}

/// GET /users/:id
async fn get_user(
    State(state): State<ApiState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<JsonValue>> {
    let user_id = require_self(&caller, &id)?;

    let Some(user) = state.users.get_user(user_id).await? else {
        return Err(AppError::NotFound(format!("User '{}' not found", id)));
    };
    Ok(Json(json!({ "success": true, "data": user })))
}

/// PUT /users/:id
async fn update_user(
    State(state): State<ApiState>,
    caller: Caller,
    Path(id): Path<String>,
    update: std::result::Result<Json<UserUpdate>, JsonRejection>,
) -> Result<Json<JsonValue>> {
    let user_id = require_self(&caller, &id)?;
    let Json(update) = update?;
    if let Some(email) = &update.email {
        validate_email(email)?;
    }

    let Some(user) = state.users.update_user(user_id, update).await? else {
        return Err(AppError::NotFound(format!("User '{}' not found", id)));
    };

    info!("👤 Updated profile for {}", user_id);
    Ok(Json(json!({ "success": true, "data": user })))
}
