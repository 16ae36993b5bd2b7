use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::{NewUser, UserProfile, UserUpdate};
use crate::redis::RedisPool;
use crate::utils::{AppError, Result};

/// Persistence for user profiles, keyed by caller id
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert or replace. A replaced profile keeps its `created_at`.
    async fn upsert_user(&self, id: &str, new: NewUser) -> Result<UserProfile>;

    async fn get_user(&self, id: &str) -> Result<Option<UserProfile>>;

    /// `None` when no profile exists
    async fn update_user(&self, id: &str, update: UserUpdate) -> Result<Option<UserProfile>>;
}

/// In-process store, lost on restart
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, UserProfile>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn upsert_user(&self, id: &str, new: NewUser) -> Result<UserProfile> {
        let mut users = self.users.write().await;
        let profile = new.into_profile(id, users.get(id), Utc::now());
        users.insert(id.to_string(), profile.clone());
        Ok(profile)
    }

    async fn get_user(&self, id: &str) -> Result<Option<UserProfile>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn update_user(&self, id: &str, update: UserUpdate) -> Result<Option<UserProfile>> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(id) else {
            return Ok(None);
        };

        update.apply(user, Utc::now());
        Ok(Some(user.clone()))
    }
}

/// Redis store: one JSON value per profile
pub struct RedisUserStore {
    redis: Arc<RedisPool>,
}

impl RedisUserStore {
    pub fn new(redis: Arc<RedisPool>) -> Self {
        Self { redis }
    }

    fn user_key(id: &str) -> String {
        format!("vibeup:user:{}", id)
    }

    async fn save(&self, profile: &UserProfile) -> Result<()> {
        let json = serde_json::to_string(profile)?;
        self.redis.set(&Self::user_key(&profile.id), &json).await
    }
}

#[async_trait]
impl UserStore for RedisUserStore {
    async fn upsert_user(&self, id: &str, new: NewUser) -> Result<UserProfile> {
        let existing = self.get_user(id).await?;
        let profile = new.into_profile(id, existing.as_ref(), Utc::now());
        self.save(&profile).await?;
        Ok(profile)
    }

    async fn get_user(&self, id: &str) -> Result<Option<UserProfile>> {
        let Some(json) = self.redis.get::<String>(&Self::user_key(id)).await? else {
            return Ok(None);
        };

        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| AppError::PersistenceFailure(format!("Corrupt user '{}': {}", id, e)))
    }

    async fn update_user(&self, id: &str, update: UserUpdate) -> Result<Option<UserProfile>> {
        let Some(mut user) = self.get_user(id).await? else {
            return Ok(None);
        };

        update.apply(&mut user, Utc::now());
        self.save(&user).await?;
        Ok(Some(user))
    }
}
