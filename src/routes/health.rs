use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::redis::RedisPool;

/// Shared state of the health endpoints
#[derive(Clone)]
pub struct AppState {
    /// Present only when the Redis backend is selected
    pub redis: Option<RedisPool>,
    pub storage_backend: &'static str,
    pub model_configured: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub components: HealthComponents,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthComponents {
    pub storage: ComponentStatus,
    pub model: ComponentStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ComponentStatus {
    pub status: String,
    pub message: Option<String>,
}

impl ComponentStatus {
    fn healthy(message: impl Into<String>) -> Self {
        Self {
            status: "healthy".to_string(),
            message: Some(message.into()),
        }
    }
}

/// GET /health
///
/// A missing model credential is reported but does not degrade the service,
/// since every transform still gets the fallback answer.
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let storage = match &state.redis {
        Some(redis) => match redis.ping().await {
            Ok(_) => ComponentStatus::healthy(state.storage_backend),
            Err(e) => ComponentStatus {
                status: "unhealthy".to_string(),
                message: Some(format!("Redis ping failed: {}", e)),
            },
        },
        None => ComponentStatus::healthy(state.storage_backend),
    };

    let model = if state.model_configured {
        ComponentStatus::healthy("gemini")
    } else {
        ComponentStatus {
            status: "fallback".to_string(),
            message: Some("No Gemini credential configured".to_string()),
        }
    };

    let (status_code, overall_status) = if storage.status == "healthy" {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let response = HealthResponse {
        status: overall_status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        components: HealthComponents { storage, model },
    };

    (status_code, Json(response))
}

/// GET /ping
pub async fn ping() -> &'static str {
    "pong"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_without_model_is_healthy() {
        let state = Arc::new(AppState {
            redis: None,
            storage_backend: "memory",
            model_configured: false,
        });

        let (status, Json(body)) = health_check(State(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "healthy");
        assert_eq!(body.components.model.status, "fallback");
        assert_eq!(body.components.storage.message.as_deref(), Some("memory"));
    }

    #[tokio::test]
    async fn test_ping() {
        assert_eq!(ping().await, "pong");
    }
}
