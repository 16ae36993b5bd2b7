use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One day's worth of model usage
#[derive(Debug, Clone, PartialEq)]
pub struct UsageRecord {
    pub date: NaiveDate,
    pub request_count: u64,
    pub token_count: u64,
    pub estimated_cost: f64,
}

impl UsageRecord {
    /// Empty record for the given day
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            request_count: 0,
            token_count: 0,
            estimated_cost: 0.0,
        }
    }

    /// Record built from stored counters; cost is always derived from tokens
    pub fn from_counters(
        date: NaiveDate,
        request_count: u64,
        token_count: u64,
        token_cost: f64,
    ) -> Self {
        Self {
            date,
            request_count,
            token_count,
            estimated_cost: token_count as f64 * token_cost,
        }
    }

    /// Apply one request worth `tokens`
    pub fn apply(&mut self, tokens: u64, token_cost: f64) {
        self.request_count = self.request_count.saturating_add(1);
        self.token_count = self.token_count.saturating_add(tokens);
        self.estimated_cost = self.token_count as f64 * token_cost;
    }
}

/// Ledger state plus the budget derived from it
#[derive(Debug, Clone, PartialEq)]
pub struct UsageSnapshot {
    pub record: UsageRecord,
    pub limit: u64,
    pub remaining: u64,
}

impl UsageSnapshot {
    pub fn new(record: UsageRecord, limit: u64) -> Self {
        let remaining = limit.saturating_sub(record.request_count);
        Self {
            record,
            limit,
            remaining,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// Outcome of recording a request
#[derive(Debug, Clone, PartialEq)]
pub struct RecordOutcome {
    pub usage: UsageSnapshot,
    pub over_limit: bool,
}

impl RecordOutcome {
    pub fn new(usage: UsageSnapshot) -> Self {
        let over_limit = usage.record.request_count >= usage.limit;
        Self { usage, over_limit }
    }
}

/// Wire shape of `GET /api/usage`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageResponse {
    pub usage: UsageBody,
    pub limit: u64,
    pub remaining: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageBody {
    pub date: String,
    pub requests: u64,
    pub tokens: u64,
    pub cost: f64,
}

impl From<&UsageSnapshot> for UsageResponse {
    fn from(snapshot: &UsageSnapshot) -> Self {
        Self {
            usage: UsageBody {
                date: snapshot.record.date.format("%Y-%m-%d").to_string(),
                requests: snapshot.record.request_count,
                tokens: snapshot.record.token_count,
                cost: snapshot.record.estimated_cost,
            },
            limit: snapshot.limit,
            remaining: snapshot.remaining,
        }
    }
}
