#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use testcontainers::{clients::Cli, Container};
use testcontainers_modules::redis::Redis;
use vibeup::config::{
    GeminiSettings, LoggingSettings, RedisSettings, ServerSettings, StorageSettings,
    TransformSettings, UsageSettings,
};
use vibeup::routes::{create_app, ApiState, AppState};
use vibeup::services::{
    MemorySessionStore, MemoryUsageStore, MemoryUserStore, RequestValidator, TextModel,
    TransformationGateway, UsageLimits,
};
use vibeup::utils::{AppError, FixedClock, Result};
use vibeup::{RedisPool, Settings};

/// Global Docker client (reused across all tests)
static DOCKER: Lazy<Cli> = Lazy::new(Cli::default);

/// Settings that never touch the environment or config files
pub fn test_settings() -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
            request_timeout: 30000,
        },
        redis: RedisSettings {
            host: "127.0.0.1".to_string(),
            port: 6379,
            password: None,
            db: 0,
            pool_size: 4,
        },
        gemini: GeminiSettings {
            api_key: None,
            api_base_url: "http://127.0.0.1:9".to_string(),
            model: "gemini-1.5-flash".to_string(),
            temperature: 0.8,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 1024,
            timeout_seconds: 5,
        },
        usage: UsageSettings {
            daily_request_limit: 1000,
            token_cost: 0.0000001,
        },
        transform: TransformSettings {
            max_input_chars: 500,
        },
        storage: StorageSettings {
            backend: "memory".to_string(),
        },
        logging: LoggingSettings {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
    }
}

pub fn test_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

/// Model double that replays queued replies and counts calls
pub struct ScriptedModel {
    replies: Mutex<Vec<Result<String>>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    delay: Duration,
}

impl ScriptedModel {
    /// Replies are served in order; the last one repeats once the queue is drained
    pub fn new(replies: Vec<Result<String>>) -> Arc<Self> {
        Self::delayed(replies, Duration::ZERO)
    }

    /// Every call sleeps for `delay` before answering
    pub fn delayed(replies: Vec<Result<String>>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            delay,
        })
    }

    pub fn replying(reply: &str) -> Arc<Self> {
        Self::new(vec![Ok(reply.to_string())])
    }

    pub fn failing() -> Arc<Self> {
        Self::new(vec![Err(AppError::ModelUnavailable(
            "Gemini API error (503)".to_string(),
        ))])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TextModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut replies = self.replies.lock().unwrap();
        if replies.len() > 1 {
            replies.remove(0)
        } else {
            replies
                .first()
                .cloned()
                .unwrap_or_else(|| Err(AppError::ModelUnavailable("no reply".to_string())))
        }
    }
}

/// Well-formed model payload, fenced the way Gemini often returns it
pub const MODEL_REPLY: &str = "```json\n{\"transformedText\":\"Could we agree on priorities before the sprint starts?\",\"keyPhrases\":[{\"phrase\":\"agree on priorities\",\"explanation\":\"Collaborative and specific\"},{\"phrase\":\"before the sprint\",\"explanation\":\"Sets a clear timeframe\"}]}\n```";

/// In-memory wiring of every component
pub struct MemoryHarness {
    pub usage: Arc<MemoryUsageStore>,
    pub sessions: Arc<MemorySessionStore>,
    pub users: Arc<MemoryUserStore>,
    pub clock: Arc<FixedClock>,
    pub gateway: Arc<TransformationGateway>,
}

impl MemoryHarness {
    pub fn new(limit: u64, model: Option<Arc<ScriptedModel>>) -> Self {
        let clock = Arc::new(FixedClock::new(test_day()));
        let usage = Arc::new(MemoryUsageStore::new(
            UsageLimits {
                daily_request_limit: limit,
                token_cost: 0.0000001,
            },
            clock.clone(),
        ));
        let sessions = Arc::new(MemorySessionStore::new());
        let users = Arc::new(MemoryUserStore::new());

        let model = model.map(|m| m as Arc<dyn TextModel>);

        let gateway = Arc::new(TransformationGateway::new(
            RequestValidator::default(),
            usage.clone(),
            model,
            sessions.clone(),
        ));

        Self {
            usage,
            sessions,
            users,
            clock,
            gateway,
        }
    }

    pub fn router(&self) -> axum::Router {
        self.router_with_timeout(Duration::from_secs(30))
    }

    pub fn router_with_timeout(&self, request_timeout: Duration) -> axum::Router {
        let api_state = ApiState {
            gateway: self.gateway.clone(),
            usage: self.usage.clone(),
            sessions: self.sessions.clone(),
            users: self.users.clone(),
        };
        let health_state = Arc::new(AppState {
            redis: None,
            storage_backend: "memory",
            model_configured: self.gateway.has_model(),
        });
        create_app(api_state, health_state, request_timeout)
    }
}

/// Redis-backed test environment.
///
/// `REDIS_URL` or `USE_LOCAL_REDIS` point at an existing server; otherwise a
/// container is started and removed on drop.
pub struct RedisContext {
    pub redis: Arc<RedisPool>,
    pub settings: Settings,
    _container: Option<Container<'static, Redis>>,
}

impl RedisContext {
    pub async fn new() -> std::result::Result<Self, Box<dyn std::error::Error>> {
        let (container, host, port) = if let Ok(redis_url) = std::env::var("REDIS_URL") {
            let url_parts: Vec<&str> = redis_url
                .strip_prefix("redis://")
                .unwrap_or(&redis_url)
                .split(':')
                .collect();
            let host = url_parts.first().unwrap_or(&"127.0.0.1").to_string();
            let port = url_parts
                .get(1)
                .and_then(|p| p.parse().ok())
                .unwrap_or(6379);
            (None, host, port)
        } else if std::env::var("USE_LOCAL_REDIS").is_ok() {
            (None, "127.0.0.1".to_string(), 6379)
        } else {
            let container = DOCKER.run(Redis);
            let port = container.get_host_port_ipv4(6379);
            (Some(container), "127.0.0.1".to_string(), port)
        };

        let mut settings = test_settings();
        settings.storage.backend = "redis".to_string();
        settings.redis.host = host;
        settings.redis.port = port;

        let redis = RedisPool::new(&settings)?;
        redis.ping().await?;

        Ok(Self {
            redis: Arc::new(redis),
            settings,
            _container: container,
        })
    }
}
