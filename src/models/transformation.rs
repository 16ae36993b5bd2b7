use serde::{Deserialize, Serialize};

/// Number of key phrases every transformation result carries
pub const KEY_PHRASE_COUNT: usize = 3;

/// A short excerpt from the rewrite paired with why it reads better
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct KeyPhrase {
    pub phrase: String,
    pub explanation: String,
}

impl KeyPhrase {
    pub fn new(phrase: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into(),
            explanation: explanation.into(),
        }
    }

    /// Padding entries have neither a phrase nor an explanation
    pub fn is_blank(&self) -> bool {
        self.phrase.is_empty() && self.explanation.is_empty()
    }
}

/// Inbound body of `POST /api/transform`
#[derive(Debug, Clone, Deserialize)]
pub struct TransformRequest {
    #[serde(default)]
    pub text: Option<String>,
}

/// Rewrite plus exactly three key phrases
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformationResult {
    pub transformed_text: String,
    pub key_phrases: Vec<KeyPhrase>,
}

impl TransformationResult {
    /// Build a result, truncating or padding the phrases to exactly three
    pub fn new(transformed_text: impl Into<String>, key_phrases: Vec<KeyPhrase>) -> Self {
        let mut key_phrases = key_phrases;
        key_phrases.truncate(KEY_PHRASE_COUNT);
        key_phrases.resize_with(KEY_PHRASE_COUNT, KeyPhrase::default);

        Self {
            transformed_text: transformed_text.into(),
            key_phrases,
        }
    }

    /// Phrases that carry content (padding excluded)
    pub fn present_phrases(&self) -> impl Iterator<Item = &KeyPhrase> {
        self.key_phrases.iter().filter(|p| !p.is_blank())
    }
}
