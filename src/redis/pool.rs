use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::AsyncCommands;

use crate::config::Settings;
use crate::utils::{AppError, Result};

/// Redis connection pool wrapper
#[derive(Clone)]
pub struct RedisPool {
    pool: Pool,
}

impl RedisPool {
    /// Create a new Redis connection pool
    pub fn new(settings: &Settings) -> Result<Self> {
        let redis_url = settings.redis_url();

        let mut cfg = Config::from_url(redis_url);
        cfg.pool = Some(deadpool_redis::PoolConfig::new(settings.redis.pool_size));
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| AppError::RedisError(format!("Failed to create Redis pool: {}", e)))?;

        Ok(Self { pool })
    }

    /// Get a connection from the pool
    pub async fn get_connection(&self) -> Result<Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| AppError::RedisError(format!("Failed to get Redis connection: {}", e)))
    }

    /// Ping Redis to check connectivity
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.get_connection().await?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::RedisError(format!("Redis ping failed: {}", e)))?;
        Ok(())
    }

    /// Get a value from Redis
    pub async fn get<T: redis::FromRedisValue>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.get_connection().await?;
        conn.get(key)
            .await
            .map_err(|e| AppError::RedisError(format!("Failed to get key '{}': {}", key, e)))
    }

    /// Set a value in Redis
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.get_connection().await?;
        conn.set(key, value)
            .await
            .map_err(|e| AppError::RedisError(format!("Failed to set key '{}': {}", key, e)))
    }

    /// Delete a key
    pub async fn del(&self, key: &str) -> Result<()> {
        let mut conn = self.get_connection().await?;
        conn.del(key)
            .await
            .map_err(|e| AppError::RedisError(format!("Failed to delete key '{}': {}", key, e)))
    }

    /// Get all hash fields and values
    pub async fn hgetall(&self, key: &str) -> Result<Vec<(String, String)>> {
        let mut conn = self.get_connection().await?;
        conn.hgetall(key)
            .await
            .map_err(|e| AppError::RedisError(format!("Failed to hgetall for '{}': {}", key, e)))
    }

    /// Add member to a sorted set
    pub async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<()> {
        let mut conn = self.get_connection().await?;
        conn.zadd(key, member, score)
            .await
            .map_err(|e| AppError::RedisError(format!("Failed to zadd to '{}': {}", key, e)))
    }

    /// Remove member from a sorted set
    pub async fn zrem(&self, key: &str, member: &str) -> Result<()> {
        let mut conn = self.get_connection().await?;
        conn.zrem(key, member)
            .await
            .map_err(|e| AppError::RedisError(format!("Failed to zrem from '{}': {}", key, e)))
    }

    /// Members of a sorted set, highest score first
    pub async fn zrevrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        let mut conn = self.get_connection().await?;
        conn.zrevrange(key, start, stop).await.map_err(|e| {
            AppError::RedisError(format!("Failed to zrevrange for '{}': {}", key, e))
        })
    }

    /// Push to the head of a list and drop everything past `cap` entries
    pub async fn lpush_capped(&self, key: &str, value: &str, cap: usize) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let stop = isize::try_from(cap).unwrap_or(isize::MAX) - 1;
        redis::pipe()
            .atomic()
            .lpush(key, value)
            .ignore()
            .ltrim(key, 0, stop)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| AppError::RedisError(format!("Failed to lpush to '{}': {}", key, e)))
    }

    /// Length of a list
    pub async fn llen(&self, key: &str) -> Result<u64> {
        let mut conn = self.get_connection().await?;
        conn.llen(key)
            .await
            .map_err(|e| AppError::RedisError(format!("Failed to llen for '{}': {}", key, e)))
    }
}
