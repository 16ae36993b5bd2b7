// Gemini adapter tests against a local stub server

mod common;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vibeup::services::{GeminiClient, GeminiConfig, TextModel};
use vibeup::utils::{AppError, HttpClient};

#[derive(Clone)]
struct StubState {
    status: StatusCode,
    reply: Value,
    delay: Duration,
    seen: Arc<Mutex<Vec<Seen>>>,
}

/// Request line, credential header and body of one upstream call
type Seen = (String, Option<String>, Value);

async fn stub_handler(
    State(state): State<StubState>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.seen.lock().unwrap().push((uri.to_string(), key, body));
    tokio::time::sleep(state.delay).await;
    (state.status, Json(state.reply.clone()))
}

/// Serve the stub on an ephemeral port and return a client aimed at it
async fn start_stub(
    status: StatusCode,
    reply: Value,
    delay: Duration,
) -> (GeminiClient, Arc<Mutex<Vec<Seen>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let state = StubState {
        status,
        reply,
        delay,
        seen: seen.clone(),
    };
    let app = Router::new().fallback(stub_handler).with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let mut settings = common::test_settings();
    settings.gemini.api_key = Some("test-key".to_string());
    settings.gemini.api_base_url = format!("http://{}", addr);
    settings.gemini.timeout_seconds = 1;

    let config = GeminiConfig::from_settings(&settings).unwrap();
    let client = GeminiClient::new(config, HttpClient::new(&settings).unwrap());
    (client, seen)
}

fn candidate(text: &str) -> Value {
    json!({
        "candidates": [{ "content": { "parts": [{ "text": text }], "role": "model" } }]
    })
}

#[tokio::test]
async fn test_successful_generation_returns_first_candidate() {
    let (client, seen) = start_stub(StatusCode::OK, candidate("payload"), Duration::ZERO).await;

    let text = client.generate("rewrite me").await.unwrap();
    assert_eq!(text, "payload");

    let seen = seen.lock().unwrap();
    let (uri, key, body) = &seen[0];
    assert_eq!(uri, "/models/gemini-1.5-flash:generateContent");
    assert_eq!(key.as_deref(), Some("test-key"));
    assert_eq!(body["contents"][0]["parts"][0]["text"], "rewrite me");
    assert_eq!(body["generationConfig"]["topK"], 40);
    assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
}

#[tokio::test]
async fn test_error_status_is_model_unavailable() {
    let (client, _) = start_stub(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": { "message": "boom" } }),
        Duration::ZERO,
    )
    .await;

    let result = client.generate("hello").await;
    assert!(matches!(result, Err(AppError::ModelUnavailable(msg)) if msg.contains("500")));
}

#[tokio::test]
async fn test_error_message_has_single_prefix_and_no_credential() {
    let (client, _) = start_stub(
        StatusCode::BAD_REQUEST,
        json!({ "error": { "message": "bad" } }),
        Duration::ZERO,
    )
    .await;

    let err = client.generate("hello").await.unwrap_err();
    let text = err.to_string();
    assert!(text.starts_with("Model unavailable: "));
    assert!(!text.contains("Model unavailable: Model unavailable"));
    assert!(!text.contains("test-key"));
}

#[tokio::test]
async fn test_missing_candidates_is_model_unavailable() {
    let (client, _) = start_stub(
        StatusCode::OK,
        json!({ "promptFeedback": { "blockReason": "SAFETY" } }),
        Duration::ZERO,
    )
    .await;

    let result = client.generate("hello").await;
    assert!(matches!(result, Err(AppError::ModelUnavailable(_))));
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    let (client, _) = start_stub(StatusCode::OK, candidate("late"), Duration::from_secs(3)).await;

    let result = client.generate("hello").await;
    assert!(matches!(result, Err(AppError::ModelUnavailable(_))));
}
