use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::utils::AppError;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Default ceiling on input length, in characters
pub const DEFAULT_MAX_INPUT_CHARS: usize = 500;

/// Why an input was rejected before any model call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyInput,
    TooLong { length: usize, max: usize },
    InvalidEmail,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "Text is required"),
            Self::TooLong { max, .. } => write!(
                f,
                "Text too long. Please keep it under {} characters to manage costs.",
                max
            ),
            Self::InvalidEmail => write!(f, "Invalid email address"),
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

/// Input constraints checked ahead of the budget and the model
#[derive(Debug, Clone, Copy)]
pub struct RequestValidator {
    max_chars: usize,
}

impl Default for RequestValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INPUT_CHARS)
    }
}

impl RequestValidator {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// Returns the text exactly as received when it passes
    pub fn validate<'a>(&self, text: Option<&'a str>) -> Result<&'a str, ValidationError> {
        let text = text.ok_or(ValidationError::EmptyInput)?;
        let length = text.trim().chars().count();

        if length == 0 {
            return Err(ValidationError::EmptyInput);
        }
        if length > self.max_chars {
            return Err(ValidationError::TooLong {
                length,
                max: self.max_chars,
            });
        }

        Ok(text)
    }
}

/// Loose shape check: something, an `@`, a dotted domain, no whitespace
pub fn validate_email(email: &str) -> Result<&str, ValidationError> {
    if EMAIL_RE.is_match(email) {
        Ok(email)
    } else {
        Err(ValidationError::InvalidEmail)
    }
}
