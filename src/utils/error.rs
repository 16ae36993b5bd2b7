use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application error type
#[derive(Debug, Clone)]
pub enum AppError {
    // Configuration errors
    ConfigError(String),

    // Storage errors
    RedisError(String),
    PersistenceFailure(String),

    // Caller errors
    Unauthorized(String),
    Forbidden(String),
    BadRequest(String),
    NotFound(String),
    InvalidInput(String),
    BudgetExhausted(String),

    // Language model errors (recovered by the fallback path)
    ModelUnavailable(String),
    MalformedModelOutput(String),

    // Internal errors
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            Self::RedisError(msg) => write!(f, "Redis error: {}", msg),
            Self::PersistenceFailure(msg) => write!(f, "Persistence failure: {}", msg),
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            Self::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            Self::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            Self::NotFound(msg) => write!(f, "Not found: {}", msg),
            Self::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Self::BudgetExhausted(msg) => write!(f, "Budget exhausted: {}", msg),
            Self::ModelUnavailable(msg) => write!(f, "Model unavailable: {}", msg),
            Self::MalformedModelOutput(msg) => write!(f, "Malformed model output: {}", msg),
            Self::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, error_type) = match &self {
            Self::ConfigError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                msg.clone(),
                "config_error",
            ),
            Self::RedisError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                msg.clone(),
                "redis_error",
            ),
            Self::PersistenceFailure(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                msg.clone(),
                "persistence_failure",
            ),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone(), "unauthorized"),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone(), "forbidden"),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), "bad_request"),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), "not_found"),
            Self::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone(), "invalid_input"),
            Self::BudgetExhausted(msg) => (
                StatusCode::TOO_MANY_REQUESTS,
                msg.clone(),
                "budget_exhausted",
            ),
            Self::ModelUnavailable(msg) => {
                (StatusCode::BAD_GATEWAY, msg.clone(), "model_unavailable")
            }
            Self::MalformedModelOutput(msg) => (
                StatusCode::BAD_GATEWAY,
                msg.clone(),
                "malformed_model_output",
            ),
            Self::InternalError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                msg.clone(),
                "internal_error",
            ),
        };

        let body = Json(json!({
            "error": {
                "message": error_message,
                "type": error_type,
                "status": status.as_u16(),
            }
        }));

        (status, body).into_response()
    }
}

// Conversion implementations for common error types
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        Self::RedisError(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        // Request URLs may carry credentials
        Self::ModelUnavailable(err.without_url().to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // Check if the underlying error is a Redis error
        if let Some(redis_err) = err.downcast_ref::<redis::RedisError>() {
            return Self::RedisError(redis_err.to_string());
        }
        match err.downcast::<reqwest::Error>() {
            Ok(reqwest_err) => Self::from(reqwest_err),
            Err(err) => Self::InternalError(format!("{:#}", err)),
        }
    }
}

// Extractor rejections use the same envelope as every other error
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidInput(rejection.body_text())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::InternalError(format!("JSON serialization error: {}", err))
    }
}

/// Result type alias for application errors
pub type Result<T> = std::result::Result<T, AppError>;
