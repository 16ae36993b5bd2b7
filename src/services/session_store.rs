use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::{AnonymousUsage, LearnedPhrase, NewPhrase, NewSession, PhraseUpdate, Session};
use crate::redis::RedisPool;
use crate::utils::{AppError, Result};

/// Default page size for session history
pub const DEFAULT_SESSION_LIMIT: usize = 10;

/// Anonymous transformations retained; older entries are dropped
pub const ANONYMOUS_USAGE_CAP: usize = 1000;

/// Persistence for saved transformations and learned phrases
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, new: NewSession) -> Result<Session>;

    /// Newest first
    async fn list_sessions(&self, user_id: &str, limit: usize) -> Result<Vec<Session>>;

    /// `false` when the session does not exist or belongs to someone else
    async fn delete_session(&self, user_id: &str, id: &str) -> Result<bool>;

    async fn create_phrase(&self, user_id: &str, new: NewPhrase) -> Result<LearnedPhrase>;

    /// Newest first
    async fn list_phrases(&self, user_id: &str) -> Result<Vec<LearnedPhrase>>;

    /// `None` when the phrase does not exist or belongs to someone else
    async fn update_phrase(
        &self,
        user_id: &str,
        id: &str,
        update: PhraseUpdate,
    ) -> Result<Option<LearnedPhrase>>;

    async fn delete_phrase(&self, user_id: &str, id: &str) -> Result<bool>;

    /// Keep a transformation served to an anonymous caller
    async fn track_anonymous(&self, usage: AnonymousUsage) -> Result<()>;

    /// Number of anonymous transformations currently retained
    async fn count_anonymous(&self) -> Result<u64>;
}

#[derive(Default)]
struct UserRecords {
    sessions: Vec<Session>,
    phrases: Vec<LearnedPhrase>,
}

/// In-process store, lost on restart
#[derive(Default)]
pub struct MemorySessionStore {
    users: RwLock<HashMap<String, UserRecords>>,
    anonymous: RwLock<VecDeque<AnonymousUsage>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create_session(&self, new: NewSession) -> Result<Session> {
        let session = new.into_session(Utc::now());
        let mut users = self.users.write().await;
        users
            .entry(session.user_id.clone())
            .or_default()
            .sessions
            .push(session.clone());
        Ok(session)
    }

    async fn list_sessions(&self, user_id: &str, limit: usize) -> Result<Vec<Session>> {
        let users = self.users.read().await;
        Ok(users
            .get(user_id)
            .map(|records| records.sessions.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_session(&self, user_id: &str, id: &str) -> Result<bool> {
        let mut users = self.users.write().await;
        let Some(records) = users.get_mut(user_id) else {
            return Ok(false);
        };
        let before = records.sessions.len();
        records.sessions.retain(|s| s.id != id);
        Ok(records.sessions.len() != before)
    }

    async fn create_phrase(&self, user_id: &str, new: NewPhrase) -> Result<LearnedPhrase> {
        let phrase = new.into_phrase(user_id, Utc::now());
        let mut users = self.users.write().await;
        users
            .entry(user_id.to_string())
            .or_default()
            .phrases
            .push(phrase.clone());
        Ok(phrase)
    }

    async fn list_phrases(&self, user_id: &str) -> Result<Vec<LearnedPhrase>> {
        let users = self.users.read().await;
        Ok(users
            .get(user_id)
            .map(|records| records.phrases.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    async fn update_phrase(
        &self,
        user_id: &str,
        id: &str,
        update: PhraseUpdate,
    ) -> Result<Option<LearnedPhrase>> {
        let mut users = self.users.write().await;
        let Some(phrase) = users
            .get_mut(user_id)
            .and_then(|records| records.phrases.iter_mut().find(|p| p.id == id))
        else {
            return Ok(None);
        };

        update.apply(phrase);
        Ok(Some(phrase.clone()))
    }

    async fn delete_phrase(&self, user_id: &str, id: &str) -> Result<bool> {
        let mut users = self.users.write().await;
        let Some(records) = users.get_mut(user_id) else {
            return Ok(false);
        };
        let before = records.phrases.len();
        records.phrases.retain(|p| p.id != id);
        Ok(records.phrases.len() != before)
    }

    async fn track_anonymous(&self, usage: AnonymousUsage) -> Result<()> {
        let mut anonymous = self.anonymous.write().await;
        anonymous.push_front(usage);
        anonymous.truncate(ANONYMOUS_USAGE_CAP);
        Ok(())
    }

    async fn count_anonymous(&self) -> Result<u64> {
        Ok(self.anonymous.read().await.len() as u64)
    }
}

/// Redis store: one JSON value per record plus a per-user sorted-set index
/// scored by creation time.
pub struct RedisSessionStore {
    redis: Arc<RedisPool>,
}

impl RedisSessionStore {
    pub fn new(redis: Arc<RedisPool>) -> Self {
        Self { redis }
    }

    fn session_key(id: &str) -> String {
        format!("vibeup:session:{}", id)
    }

    fn session_index_key(user_id: &str) -> String {
        format!("vibeup:user_sessions:{}", user_id)
    }

    fn phrase_key(id: &str) -> String {
        format!("vibeup:phrase:{}", id)
    }

    fn phrase_index_key(user_id: &str) -> String {
        format!("vibeup:user_phrases:{}", user_id)
    }

    const ANONYMOUS_USAGE_KEY: &'static str = "vibeup:anonymous_usage";

    async fn load_indexed<T: serde::de::DeserializeOwned>(
        &self,
        index_key: &str,
        stop: isize,
        record_key: fn(&str) -> String,
    ) -> Result<Vec<T>> {
        let ids = self.redis.zrevrange(index_key, 0, stop).await?;

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            // Index entries can briefly outlive their record during a delete
            if let Some(json) = self.redis.get::<String>(&record_key(&id)).await? {
                let record = serde_json::from_str(&json).map_err(|e| {
                    AppError::PersistenceFailure(format!("Corrupt record '{}': {}", id, e))
                })?;
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn delete_owned(
        &self,
        user_id: &str,
        id: &str,
        record_key: String,
        index_key: String,
    ) -> Result<bool> {
        let Some(json) = self.redis.get::<String>(&record_key).await? else {
            return Ok(false);
        };

        let value: serde_json::Value = serde_json::from_str(&json)?;
        if value.get("user_id").and_then(|v| v.as_str()) != Some(user_id) {
            return Ok(false);
        }

        self.redis.del(&record_key).await?;
        self.redis.zrem(&index_key, id).await?;
        Ok(true)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create_session(&self, new: NewSession) -> Result<Session> {
        let session = new.into_session(Utc::now());
        let json = serde_json::to_string(&session)?;

        self.redis
            .set(&Self::session_key(&session.id), &json)
            .await?;
        self.redis
            .zadd(
                &Self::session_index_key(&session.user_id),
                session.created_at.timestamp_millis() as f64,
                &session.id,
            )
            .await?;

        Ok(session)
    }

    async fn list_sessions(&self, user_id: &str, limit: usize) -> Result<Vec<Session>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let stop = isize::try_from(limit).unwrap_or(isize::MAX) - 1;
        self.load_indexed(&Self::session_index_key(user_id), stop, Self::session_key)
            .await
    }

    async fn delete_session(&self, user_id: &str, id: &str) -> Result<bool> {
        self.delete_owned(
            user_id,
            id,
            Self::session_key(id),
            Self::session_index_key(user_id),
        )
        .await
    }

    async fn create_phrase(&self, user_id: &str, new: NewPhrase) -> Result<LearnedPhrase> {
        let phrase = new.into_phrase(user_id, Utc::now());
        let json = serde_json::to_string(&phrase)?;

        self.redis.set(&Self::phrase_key(&phrase.id), &json).await?;
        self.redis
            .zadd(
                &Self::phrase_index_key(user_id),
                phrase.created_at.timestamp_millis() as f64,
                &phrase.id,
            )
            .await?;

        Ok(phrase)
    }

    async fn list_phrases(&self, user_id: &str) -> Result<Vec<LearnedPhrase>> {
        self.load_indexed(&Self::phrase_index_key(user_id), -1, Self::phrase_key)
            .await
    }

    async fn update_phrase(
        &self,
        user_id: &str,
        id: &str,
        update: PhraseUpdate,
    ) -> Result<Option<LearnedPhrase>> {
        let key = Self::phrase_key(id);
        let Some(json) = self.redis.get::<String>(&key).await? else {
            return Ok(None);
        };

        let mut phrase: LearnedPhrase = serde_json::from_str(&json).map_err(|e| {
            AppError::PersistenceFailure(format!("Corrupt record '{}': {}", id, e))
        })?;
        if phrase.user_id != user_id {
            return Ok(None);
        }

        update.apply(&mut phrase);
        self.redis.set(&key, &serde_json::to_string(&phrase)?).await?;
        Ok(Some(phrase))
    }

    async fn delete_phrase(&self, user_id: &str, id: &str) -> Result<bool> {
        self.delete_owned(
            user_id,
            id,
            Self::phrase_key(id),
            Self::phrase_index_key(user_id),
        )
        .await
    }

    async fn track_anonymous(&self, usage: AnonymousUsage) -> Result<()> {
        let json = serde_json::to_string(&usage)?;
        self.redis
            .lpush_capped(Self::ANONYMOUS_USAGE_KEY, &json, ANONYMOUS_USAGE_CAP)
            .await
    }

    async fn count_anonymous(&self) -> Result<u64> {
        self.redis.llen(Self::ANONYMOUS_USAGE_KEY).await
    }
}
