use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::utils::error::{AppError, Result};
use crate::utils::HttpClient;

/// A language model that turns a prompt into raw text
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Model identifier for logs
    fn name(&self) -> &str;

    /// One generation round-trip. Any failure is reported as `ModelUnavailable`.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Connection and sampling parameters for Gemini
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_base_url: String,
    pub model: String,
    pub api_key: String,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
    pub timeout_seconds: u64,
}

impl GeminiConfig {
    /// `None` when no credential is configured
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        let gemini = &settings.gemini;
        gemini.api_key.as_ref().map(|api_key| Self {
            api_base_url: gemini.api_base_url.trim_end_matches('/').to_string(),
            model: gemini.model.clone(),
            api_key: api_key.clone(),
            temperature: gemini.temperature,
            top_k: gemini.top_k,
            top_p: gemini.top_p,
            max_output_tokens: gemini.max_output_tokens,
            timeout_seconds: gemini.timeout_seconds,
        })
    }

    fn model_path(&self) -> String {
        if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        }
    }

    /// Endpoint without the credential, safe to log
    pub fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.api_base_url, self.model_path())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "topK")]
    top_k: u32,
    #[serde(rename = "topP")]
    top_p: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

/// Gemini request body
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

/// Gemini response, only the fields the pipeline reads
#[derive(Debug, Clone, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Clone, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
            .filter(|text| !text.trim().is_empty())
    }
}

/// Header carrying the credential, which keeps it out of request URLs
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini `generateContent` adapter
pub struct GeminiClient {
    config: GeminiConfig,
    http_client: HttpClient,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig, http_client: HttpClient) -> Self {
        Self {
            config,
            http_client,
        }
    }

    fn build_request(&self, prompt: &str) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                top_k: self.config.top_k,
                top_p: self.config.top_p,
                max_output_tokens: self.config.max_output_tokens,
            },
        }
    }

    async fn call(&self, prompt: &str) -> anyhow::Result<String> {
        let mut headers = HeaderMap::new();
        let mut api_key = HeaderValue::from_str(&self.config.api_key)
            .context("Gemini API key is not a valid header value")?;
        api_key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, api_key);

        let body = self.build_request(prompt);

        let response = timeout(
            Duration::from_secs(self.config.timeout_seconds),
            self.http_client.post_json(&self.config.endpoint(), headers, &body),
        )
        .await
        .context("Gemini request timed out")??;

        let status = response.status();
        debug!("📡 Gemini API response status: {}", status);

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("Gemini API error ({}): {}", status, error_body);
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .context("Failed to decode Gemini response envelope")?;

        parsed
            .first_text()
            .context("No candidate text in Gemini response")
    }
}

#[async_trait]
impl TextModel for GeminiClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.call(prompt).await.map_err(|e| {
            warn!("❌ Gemini call failed ({}): {:#}", self.config.endpoint(), e);
            // Transport errors already arrive as ModelUnavailable
            match e.downcast::<AppError>() {
                Ok(err @ AppError::ModelUnavailable(_)) => err,
                Ok(other) => AppError::ModelUnavailable(other.to_string()),
                Err(e) => AppError::ModelUnavailable(format!("{:#}", e)),
            }
        })
    }
}
