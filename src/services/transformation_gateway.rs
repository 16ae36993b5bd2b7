use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::models::{AnonymousUsage, Caller, NewSession, TransformationResult};
use crate::services::coercion::coerce;
use crate::services::fallback::fallback;
use crate::services::gemini_client::TextModel;
use crate::services::prompt::transformation_prompt;
use crate::services::session_store::SessionStore;
use crate::services::usage_ledger::UsageStore;
use crate::services::validator::RequestValidator;
use crate::utils::{AppError, Result};

/// Why a canned answer was served instead of a model rewrite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    MissingCredential,
    LedgerUnavailable,
    ModelUnavailable,
    MalformedOutput,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::MissingCredential => "missing_credential",
            Self::LedgerUnavailable => "ledger_unavailable",
            Self::ModelUnavailable => "model_unavailable",
            Self::MalformedOutput => "malformed_output",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSource {
    Model,
    Fallback(FallbackReason),
}

impl ResultSource {
    /// Value of the `x-transform-source` response header
    pub fn header_value(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Fallback(_) => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutcome {
    pub result: TransformationResult,
    pub source: ResultSource,
}

/// Validate, check budget, call the model, coerce, record, persist.
///
/// Only `InvalidInput` and `BudgetExhausted` reach the caller as errors.
/// Every other failure degrades to the keyword fallback.
pub struct TransformationGateway {
    validator: RequestValidator,
    usage: Arc<dyn UsageStore>,
    model: Option<Arc<dyn TextModel>>,
    sessions: Arc<dyn SessionStore>,
}

impl TransformationGateway {
    pub fn new(
        validator: RequestValidator,
        usage: Arc<dyn UsageStore>,
        model: Option<Arc<dyn TextModel>>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            validator,
            usage,
            model,
            sessions,
        }
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub async fn transform(&self, caller: &Caller, text: Option<&str>) -> Result<TransformOutcome> {
        let text = self.validator.validate(text)?;

        match self.usage.peek().await {
            Ok(snapshot) if snapshot.is_exhausted() => {
                warn!(
                    "🚨 Daily limit reached: {}/{} requests",
                    snapshot.record.request_count, snapshot.limit
                );
                return Err(AppError::BudgetExhausted(
                    "Daily usage limit reached. Please try again tomorrow.".to_string(),
                ));
            }
            Ok(snapshot) => {
                debug!("📊 Budget check passed, {} requests remaining", snapshot.remaining);
            }
            Err(e) => {
                warn!("⚠️ Could not check usage limits, serving fallback: {}", e);
                return Ok(self
                    .finish_fallback(caller, text, FallbackReason::LedgerUnavailable)
                    .await);
            }
        }

        let Some(model) = &self.model else {
            debug!("🔑 No model credential configured, serving fallback");
            return Ok(self
                .finish_fallback(caller, text, FallbackReason::MissingCredential)
                .await);
        };

        let input_chars = text.chars().count() as u64;
        info!("🤖 Transforming {} chars with {}", input_chars, model.name());

        let raw = match model.generate(&transformation_prompt(text)).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("❌ Model call failed, serving fallback: {}", e);
                self.record_usage(input_chars).await;
                return Ok(self
                    .finish_fallback(caller, text, FallbackReason::ModelUnavailable)
                    .await);
            }
        };

        let result = match coerce(&raw) {
            Ok(result) => result,
            Err(e) => {
                warn!("❌ Model output rejected, serving fallback: {}", e);
                self.record_usage(input_chars).await;
                return Ok(self
                    .finish_fallback(caller, text, FallbackReason::MalformedOutput)
                    .await);
            }
        };

        let output_chars = result.transformed_text.chars().count() as u64;
        self.record_usage(input_chars + output_chars).await;

        info!("✅ Transformation complete");
        self.persist(caller, text, &result).await;

        Ok(TransformOutcome {
            result,
            source: ResultSource::Model,
        })
    }

    async fn finish_fallback(
        &self,
        caller: &Caller,
        text: &str,
        reason: FallbackReason,
    ) -> TransformOutcome {
        let result = fallback(text);
        info!("🛟 Serving fallback transformation ({})", reason);
        self.persist(caller, text, &result).await;

        TransformOutcome {
            result,
            source: ResultSource::Fallback(reason),
        }
    }

    async fn record_usage(&self, tokens: u64) {
        match self.usage.record(tokens).await {
            Ok(outcome) => {
                debug!(
                    "📊 Usage recorded: {} requests, {} tokens today",
                    outcome.usage.record.request_count, outcome.usage.record.token_count
                );
                if outcome.over_limit {
                    warn!("⚠️ Daily request limit is now reached");
                }
            }
            Err(e) => error!("❌ Failed to record usage: {}", e),
        }
    }

    /// Best effort: a storage failure is logged and never reaches the caller
    async fn persist(&self, caller: &Caller, text: &str, result: &TransformationResult) {
        let Some(user_id) = caller.user_id() else {
            let usage = AnonymousUsage {
                original_text: text.to_string(),
                transformed_text: result.transformed_text.clone(),
                key_phrases: result.present_phrases().cloned().collect(),
                created_at: Utc::now(),
            };
            if let Err(e) = self.sessions.track_anonymous(usage).await {
                warn!("⚠️ Failed to track anonymous usage: {}", e);
            }
            return;
        };

        let new = NewSession {
            user_id: user_id.to_string(),
            original_text: text.to_string(),
            transformed_text: result.transformed_text.clone(),
            key_phrases: result.present_phrases().cloned().collect(),
        };

        if let Err(e) = self.sessions.create_session(new).await {
            warn!("⚠️ Failed to save session for {}: {}", user_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecordOutcome, UsageSnapshot};
    use crate::services::fallback::FALLBACK_TABLE;
    use crate::services::session_store::MemorySessionStore;
    use crate::services::usage_ledger::{MemoryUsageStore, UsageLimits};
    use crate::utils::FixedClock;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubModel {
        reply: Result<String>,
        calls: AtomicUsize,
    }

    impl StubModel {
        fn replying(reply: Result<String>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TextModel for StubModel {
        fn name(&self) -> &str {
            "stub"
        }

        async fn generate(&self, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    struct BrokenLedger;

    #[async_trait]
    impl UsageStore for BrokenLedger {
        async fn peek(&self) -> Result<UsageSnapshot> {
            Err(AppError::RedisError("connection refused".to_string()))
        }

        async fn record(&self, _tokens: u64) -> Result<RecordOutcome> {
            Err(AppError::RedisError("connection refused".to_string()))
        }

        fn backend(&self) -> &'static str {
            "broken"
        }
    }

    fn ledger(limit: u64) -> Arc<MemoryUsageStore> {
        let clock = Arc::new(FixedClock::new(
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
        ));
        Arc::new(MemoryUsageStore::new(
            UsageLimits {
                daily_request_limit: limit,
                token_cost: 0.0000001,
            },
            clock,
        ))
    }

    fn gateway(
        usage: Arc<dyn UsageStore>,
        model: Option<Arc<dyn TextModel>>,
        sessions: Arc<MemorySessionStore>,
    ) -> TransformationGateway {
        TransformationGateway::new(RequestValidator::default(), usage, model, sessions)
    }

    const MODEL_REPLY: &str = r#"{"transformedText":"Could we align on priorities?","keyPhrases":[{"phrase":"align on","explanation":"Collaborative"}]}"#;

    #[tokio::test]
    async fn test_model_success_records_input_plus_output() {
        let usage = ledger(1000);
        let model = StubModel::replying(Ok(MODEL_REPLY.to_string()));
        let gw = gateway(usage.clone(), Some(model.clone()), Arc::new(MemorySessionStore::new()));

        let outcome = gw.transform(&Caller::Anonymous, Some("hello")).await.unwrap();

        assert_eq!(outcome.source, ResultSource::Model);
        assert_eq!(outcome.result.transformed_text, "Could we align on priorities?");
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);

        let snapshot = usage.peek().await.unwrap();
        assert_eq!(snapshot.record.request_count, 1);
        assert_eq!(snapshot.record.token_count, 5 + 29);
    }

    #[tokio::test]
    async fn test_invalid_input_never_falls_back() {
        let usage = ledger(1000);
        let model = StubModel::replying(Ok(MODEL_REPLY.to_string()));
        let gw = gateway(usage.clone(), Some(model.clone()), Arc::new(MemorySessionStore::new()));

        let empty = gw.transform(&Caller::Anonymous, Some("   ")).await;
        let long = "a".repeat(501);
        let too_long = gw.transform(&Caller::Anonymous, Some(&long)).await;

        assert!(matches!(empty, Err(AppError::InvalidInput(_))));
        assert!(matches!(too_long, Err(AppError::InvalidInput(_))));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
        assert_eq!(usage.peek().await.unwrap().record.request_count, 0);
    }

    #[tokio::test]
    async fn test_exhausted_budget_is_rejected_without_call() {
        let model = StubModel::replying(Ok(MODEL_REPLY.to_string()));
        let gw = gateway(ledger(0), Some(model.clone()), Arc::new(MemorySessionStore::new()));

        let result = gw.transform(&Caller::Anonymous, Some("hello")).await;

        assert!(matches!(result, Err(AppError::BudgetExhausted(_))));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_credential_serves_fallback_unmetered() {
        let usage = ledger(1000);
        let gw = gateway(usage.clone(), None, Arc::new(MemorySessionStore::new()));

        let outcome = gw
            .transform(&Caller::Anonymous, Some("I'm so annoyed by my boss"))
            .await
            .unwrap();

        assert_eq!(
            outcome.source,
            ResultSource::Fallback(FallbackReason::MissingCredential)
        );
        assert_eq!(outcome.result, FALLBACK_TABLE[0].to_result());
        assert_eq!(usage.peek().await.unwrap().record.request_count, 0);
    }

    #[tokio::test]
    async fn test_model_failure_is_counted_and_falls_back() {
        let usage = ledger(1000);
        let model = StubModel::replying(Err(AppError::ModelUnavailable("503".to_string())));
        let gw = gateway(usage.clone(), Some(model), Arc::new(MemorySessionStore::new()));

        let outcome = gw.transform(&Caller::Anonymous, Some("hello")).await.unwrap();

        assert_eq!(
            outcome.source,
            ResultSource::Fallback(FallbackReason::ModelUnavailable)
        );
        let snapshot = usage.peek().await.unwrap();
        assert_eq!(snapshot.record.request_count, 1);
        assert_eq!(snapshot.record.token_count, 5);
    }

    #[tokio::test]
    async fn test_malformed_output_falls_back() {
        let usage = ledger(1000);
        let model = StubModel::replying(Ok("{\"foo\":\"bar\"}".to_string()));
        let gw = gateway(usage.clone(), Some(model), Arc::new(MemorySessionStore::new()));

        let outcome = gw.transform(&Caller::Anonymous, Some("xyz")).await.unwrap();

        assert_eq!(
            outcome.source,
            ResultSource::Fallback(FallbackReason::MalformedOutput)
        );
        assert_eq!(usage.peek().await.unwrap().record.request_count, 1);
    }

    #[tokio::test]
    async fn test_unreachable_ledger_skips_model() {
        let model = StubModel::replying(Ok(MODEL_REPLY.to_string()));
        let gw = gateway(
            Arc::new(BrokenLedger),
            Some(model.clone()),
            Arc::new(MemorySessionStore::new()),
        );

        let outcome = gw.transform(&Caller::Anonymous, Some("hello")).await.unwrap();

        assert_eq!(
            outcome.source,
            ResultSource::Fallback(FallbackReason::LedgerUnavailable)
        );
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_identified_caller_gets_session() {
        let sessions = Arc::new(MemorySessionStore::new());
        let model = StubModel::replying(Ok(MODEL_REPLY.to_string()));
        let gw = gateway(ledger(1000), Some(model), sessions.clone());

        gw.transform(&Caller::User("user-1".to_string()), Some("hello"))
            .await
            .unwrap();
        gw.transform(&Caller::Anonymous, Some("hello")).await.unwrap();

        let saved = sessions.list_sessions("user-1", 10).await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].original_text, "hello");
        assert_eq!(saved[0].key_phrases.len(), 1);
    }

    #[tokio::test]
    async fn test_anonymous_caller_is_tracked_not_saved() {
        let sessions = Arc::new(MemorySessionStore::new());
        let gw = gateway(ledger(1000), None, sessions.clone());

        gw.transform(&Caller::Anonymous, Some("my boss is annoying"))
            .await
            .unwrap();

        assert_eq!(sessions.count_anonymous().await.unwrap(), 1);
        assert!(sessions.list_sessions("", 10).await.unwrap().is_empty());
    }

    #[test]
    fn test_source_header_values() {
        assert_eq!(ResultSource::Model.header_value(), "model");
        assert_eq!(
            ResultSource::Fallback(FallbackReason::MalformedOutput).header_value(),
            "fallback"
        );
    }
}
