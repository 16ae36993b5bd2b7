use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::KeyPhrase;

/// A saved transformation for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub original_text: String,
    pub transformed_text: String,
    pub key_phrases: Vec<KeyPhrase>,
    pub created_at: DateTime<Utc>,
}

/// Input of `SessionStore::create_session`
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: String,
    pub original_text: String,
    pub transformed_text: String,
    pub key_phrases: Vec<KeyPhrase>,
}

impl NewSession {
    pub fn into_session(self, now: DateTime<Utc>) -> Session {
        Session {
            id: Uuid::new_v4().to_string(),
            user_id: self.user_id,
            original_text: self.original_text,
            transformed_text: self.transformed_text,
            key_phrases: self.key_phrases,
            created_at: now,
        }
    }
}

/// A phrase the user chose to keep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnedPhrase {
    pub id: String,
    pub user_id: String,
    pub phrase: String,
    pub context: Option<String>,
    pub usage_example: Option<String>,
    pub learned_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /api/phrases`
#[derive(Debug, Clone, Deserialize)]
pub struct NewPhrase {
    pub phrase: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub usage_example: Option<String>,
    #[serde(default)]
    pub learned_date: Option<NaiveDate>,
}

impl NewPhrase {
    pub fn into_phrase(self, user_id: &str, now: DateTime<Utc>) -> LearnedPhrase {
        LearnedPhrase {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            phrase: self.phrase,
            context: self.context.filter(|c| !c.trim().is_empty()),
            usage_example: self.usage_example.filter(|u| !u.trim().is_empty()),
            learned_date: self.learned_date.unwrap_or_else(|| now.date_naive()),
            created_at: now,
        }
    }
}

/// Body of `PUT /api/phrases/:id`. Absent fields keep their value; a blank
/// `context` or `usage_example` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhraseUpdate {
    #[serde(default)]
    pub phrase: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub usage_example: Option<String>,
    #[serde(default)]
    pub learned_date: Option<NaiveDate>,
}

impl PhraseUpdate {
    /// A present phrase must not be blank
    pub fn has_blank_phrase(&self) -> bool {
        self.phrase
            .as_deref()
            .is_some_and(|phrase| phrase.trim().is_empty())
    }

    pub fn apply(self, phrase: &mut LearnedPhrase) {
        if let Some(text) = self.phrase {
            phrase.phrase = text;
        }
        if let Some(context) = self.context {
            phrase.context = Some(context).filter(|c| !c.trim().is_empty());
        }
        if let Some(example) = self.usage_example {
            phrase.usage_example = Some(example).filter(|u| !u.trim().is_empty());
        }
        if let Some(date) = self.learned_date {
            phrase.learned_date = date;
        }
    }
}

/// A transformation served to a caller without an identity, kept for
/// aggregate usage analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnonymousUsage {
    pub original_text: String,
    pub transformed_text: String,
    pub key_phrases: Vec<KeyPhrase>,
    pub created_at: DateTime<Utc>,
}
