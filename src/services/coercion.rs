use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::fmt;

use crate::models::{KeyPhrase, TransformationResult, KEY_PHRASE_COUNT};
use crate::utils::AppError;

/// Opening fence, optional language tag, then any whitespace
static OPENING_FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```[A-Za-z0-9_-]*\s*").unwrap());

/// Any whitespace, then the closing fence
static CLOSING_FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*```$").unwrap());

/// The model payload did not have the expected shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoercionError {
    MalformedResponse(String),
}

impl fmt::Display for CoercionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedResponse(msg) => write!(f, "Malformed response: {}", msg),
        }
    }
}

impl std::error::Error for CoercionError {}

impl From<CoercionError> for AppError {
    fn from(err: CoercionError) -> Self {
        match err {
            CoercionError::MalformedResponse(msg) => AppError::MalformedModelOutput(msg),
        }
    }
}

/// Remove a leading fence (with optional language tag) and a trailing fence.
///
/// Each end is handled on its own, so a payload with only an opening or only
/// a closing fence is still cleaned.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(open) = OPENING_FENCE_RE.find(text) {
        text = &text[open.end()..];
    }
    if let Some(close) = CLOSING_FENCE_RE.find(text) {
        text = &text[..close.start()];
    }

    text.trim()
}

/// Parse the model payload into a typed result
pub fn coerce(raw: &str) -> Result<TransformationResult, CoercionError> {
    let cleaned = strip_code_fences(raw);

    let value: JsonValue = serde_json::from_str(cleaned)
        .map_err(|e| CoercionError::MalformedResponse(format!("not valid JSON: {}", e)))?;

    let object = value.as_object().ok_or_else(|| {
        CoercionError::MalformedResponse("top-level value is not an object".to_string())
    })?;

    let transformed_text = object
        .get("transformedText")
        .and_then(JsonValue::as_str)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| {
            CoercionError::MalformedResponse("missing or empty transformedText".to_string())
        })?;

    let entries = object
        .get("keyPhrases")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| CoercionError::MalformedResponse("keyPhrases is not a list".to_string()))?;

    let key_phrases = entries
        .iter()
        .take(KEY_PHRASE_COUNT)
        .map(|entry| KeyPhrase::new(string_field(entry, "phrase"), string_field(entry, "explanation")))
        .collect();

    Ok(TransformationResult::new(transformed_text, key_phrases))
}

/// Lenient sub-field read: anything but a string becomes empty
fn string_field(entry: &JsonValue, field: &str) -> String {
    entry
        .get(field)
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .to_string()
}
