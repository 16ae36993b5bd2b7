use reqwest::{header::HeaderMap, Client};
use std::time::Duration;

use crate::config::Settings;
use crate::utils::{AppError, Result};

/// HTTP client wrapper for outbound model calls
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client bounded by the Gemini call timeout
    pub fn new(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.gemini.timeout_seconds);

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("vibeup/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Make a POST request with JSON body.
    ///
    /// Errors never carry the URL, so query parameters stay out of logs.
    pub async fn post_json<T: serde::Serialize>(
        &self,
        url: &str,
        headers: HeaderMap,
        body: &T,
    ) -> Result<reqwest::Response> {
        self.client
            .post(url)
            .headers(headers)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                AppError::ModelUnavailable(format!("POST request failed: {}", e.without_url()))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_settings;

    #[test]
    fn test_http_client_creation() {
        let settings = test_settings();
        let client = HttpClient::new(&settings);
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_post_json_to_closed_port_is_model_unavailable() {
        let settings = test_settings();
        let client = HttpClient::new(&settings).expect("Failed to create HTTP client");

        // Port 9 (discard) is not listening on loopback in test environments
        let result = client
            .post_json(
                "http://127.0.0.1:9/?key=hidden-token",
                HeaderMap::new(),
                &serde_json::json!({"ping": true}),
            )
            .await;

        match result {
            Err(AppError::ModelUnavailable(msg)) => assert!(!msg.contains("hidden-token")),
            other => panic!("expected ModelUnavailable, got {:?}", other.map(|r| r.status())),
        }
    }
}
