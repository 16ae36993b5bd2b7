use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Profile of an identified caller. `id` is the `X-User-Id` value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub preferences: JsonValue,
    pub streak_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/users`
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    #[serde(default)]
    pub preferences: Option<JsonValue>,
    #[serde(default)]
    pub streak_count: Option<u32>,
}

impl NewUser {
    /// Create a profile, or overwrite an existing one keeping its `created_at`
    pub fn into_profile(
        self,
        id: &str,
        existing: Option<&UserProfile>,
        now: DateTime<Utc>,
    ) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            email: self.email,
            preferences: self.preferences.unwrap_or_else(empty_preferences),
            streak_count: self.streak_count.unwrap_or(0),
            created_at: existing.map(|user| user.created_at).unwrap_or(now),
            updated_at: now,
        }
    }
}

/// Body of `PUT /api/users/:id`. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub preferences: Option<JsonValue>,
    #[serde(default)]
    pub streak_count: Option<u32>,
}

impl UserUpdate {
    pub fn apply(self, user: &mut UserProfile, now: DateTime<Utc>) {
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(preferences) = self.preferences {
            user.preferences = preferences;
        }
        if let Some(streak) = self.streak_count {
            user.streak_count = streak;
        }
        user.updated_at = now;
    }
}

fn empty_preferences() -> JsonValue {
    JsonValue::Object(Default::default())
}
