use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::config::Settings;
use crate::models::{RecordOutcome, UsageRecord, UsageSnapshot};
use crate::redis::RedisPool;
use crate::utils::{AppError, Clock, Result};

/// Budget parameters shared by every ledger backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsageLimits {
    pub daily_request_limit: u64,
    pub token_cost: f64,
}

impl Default for UsageLimits {
    fn default() -> Self {
        Self {
            daily_request_limit: 1000,
            token_cost: 0.0000001,
        }
    }
}

impl From<&Settings> for UsageLimits {
    fn from(settings: &Settings) -> Self {
        Self {
            daily_request_limit: settings.usage.daily_request_limit,
            token_cost: settings.usage.token_cost,
        }
    }
}

/// Daily request/token counter that caps spend on the language model.
///
/// The gateway checks `peek` before calling the model and `record`s only
/// after the call returns. The two steps are not atomic together, so
/// requests that pass `peek` concurrently can each be recorded and push
/// `request_count` past the limit by up to the number in flight. The limit is a
/// soft cap; `record` itself never loses an increment.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Current day's usage. Never mutates.
    async fn peek(&self) -> Result<UsageSnapshot>;

    /// Count one request worth `tokens`, resetting first if the day changed
    async fn record(&self, tokens: u64) -> Result<RecordOutcome>;

    /// Backend name for health reporting
    fn backend(&self) -> &'static str;
}

/// Single-process ledger.
///
/// Increments are serialized by a mutex, so nothing is lost inside one
/// process, but separate instances each keep their own count. Use
/// `RedisUsageStore` when more than one instance serves traffic.
pub struct MemoryUsageStore {
    limits: UsageLimits,
    clock: Arc<dyn Clock>,
    record: Mutex<UsageRecord>,
}

impl MemoryUsageStore {
    pub fn new(limits: UsageLimits, clock: Arc<dyn Clock>) -> Self {
        let today = clock.today();
        Self {
            limits,
            clock,
            record: Mutex::new(UsageRecord::empty(today)),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, UsageRecord>> {
        self.record
            .lock()
            .map_err(|_| AppError::InternalError("Usage ledger lock poisoned".to_string()))
    }
}

#[async_trait]
impl UsageStore for MemoryUsageStore {
    async fn peek(&self) -> Result<UsageSnapshot> {
        let today = self.clock.today();
        let record = self.lock()?;

        let current = if record.date == today {
            record.clone()
        } else {
            UsageRecord::empty(today)
        };

        Ok(UsageSnapshot::new(current, self.limits.daily_request_limit))
    }

    async fn record(&self, tokens: u64) -> Result<RecordOutcome> {
        let today = self.clock.today();
        let mut record = self.lock()?;

        if record.date != today {
            debug!(
                "📅 Usage ledger rollover: {} -> {}",
                record.date, today
            );
            *record = UsageRecord::empty(today);
        }

        record.apply(tokens, self.limits.token_cost);

        Ok(RecordOutcome::new(UsageSnapshot::new(
            record.clone(),
            self.limits.daily_request_limit,
        )))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// Redis-backed ledger shared by every instance.
///
/// Each day is its own hash (`vibeup:usage:YYYY-MM-DD`), so rollover needs no
/// reset step: a new day simply starts from an absent key.
pub struct RedisUsageStore {
    redis: Arc<RedisPool>,
    limits: UsageLimits,
    clock: Arc<dyn Clock>,
}

/// Day keys outlive their day long enough for late reads
const USAGE_KEY_TTL_SECONDS: i64 = 3 * 24 * 60 * 60;

impl RedisUsageStore {
    pub fn new(redis: Arc<RedisPool>, limits: UsageLimits, clock: Arc<dyn Clock>) -> Self {
        Self {
            redis,
            limits,
            clock,
        }
    }

    pub fn usage_key(date: NaiveDate) -> String {
        format!("vibeup:usage:{}", date.format("%Y-%m-%d"))
    }
}

#[async_trait]
impl UsageStore for RedisUsageStore {
    async fn peek(&self) -> Result<UsageSnapshot> {
        let today = self.clock.today();
        let fields = self.redis.hgetall(&Self::usage_key(today)).await?;

        let mut requests = 0u64;
        let mut tokens = 0u64;
        for (field, value) in fields {
            match field.as_str() {
                "requests" => requests = value.parse().unwrap_or(0),
                "tokens" => tokens = value.parse().unwrap_or(0),
                _ => {}
            }
        }

        let record = UsageRecord::from_counters(today, requests, tokens, self.limits.token_cost);
        Ok(UsageSnapshot::new(record, self.limits.daily_request_limit))
    }

    async fn record(&self, tokens: u64) -> Result<RecordOutcome> {
        let today = self.clock.today();
        let usage_key = Self::usage_key(today);
        let token_delta = i64::try_from(tokens).unwrap_or(i64::MAX);

        let mut conn = self.redis.get_connection().await?;

        // MULTI/EXEC keeps both counters consistent across instances
        let (requests, total_tokens): (i64, i64) = redis::pipe()
            .atomic()
            .hincr(&usage_key, "requests", 1)
            .hincr(&usage_key, "tokens", token_delta)
            .expire(&usage_key, USAGE_KEY_TTL_SECONDS)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| AppError::RedisError(format!("Failed to record usage: {}", e)))?;

        let record = UsageRecord::from_counters(
            today,
            requests.max(0) as u64,
            total_tokens.max(0) as u64,
            self.limits.token_cost,
        );

        Ok(RecordOutcome::new(UsageSnapshot::new(
            record,
            self.limits.daily_request_limit,
        )))
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
