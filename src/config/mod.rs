use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub redis: RedisSettings,
    pub gemini: GeminiSettings,
    pub usage: UsageSettings,
    pub transform: TransformSettings,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub request_timeout: u64, // milliseconds
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: u8,
    pub pool_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeminiSettings {
    /// Absent credential is allowed: every transformation is then served by the fallback table.
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub model: String,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UsageSettings {
    pub daily_request_limit: u64,
    pub token_cost: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TransformSettings {
    pub max_input_chars: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    pub backend: String, // "memory" or "redis"
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
    pub format: String, // "json" or "pretty"
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("server.request_timeout", 30000)?
            .set_default("redis.host", "localhost")?
            .set_default("redis.port", 6379)?
            .set_default("redis.db", 0)?
            .set_default("redis.pool_size", 10)?
            .set_default(
                "gemini.api_base_url",
                "https://generativelanguage.googleapis.com/v1beta",
            )?
            .set_default("gemini.model", "gemini-1.5-flash")?
            .set_default("gemini.temperature", 0.8)?
            .set_default("gemini.top_k", 40)?
            .set_default("gemini.top_p", 0.95)?
            .set_default("gemini.max_output_tokens", 1024)?
            .set_default("gemini.timeout_seconds", 30)?
            .set_default("usage.daily_request_limit", 1000)?
            .set_default("usage.token_cost", 0.0000001)?
            .set_default("transform.max_input_chars", 500)?
            .set_default("storage.backend", "memory")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load config file if exists
            .add_source(File::with_name("config/config").required(false))
            .add_source(File::with_name(&format!("config/config.{}", run_mode)).required(false));

        // Explicit environment overrides, one per key
        let overrides = [
            ("VIBEUP_SERVER__HOST", "server.host"),
            ("VIBEUP_SERVER__PORT", "server.port"),
            ("VIBEUP_SERVER__REQUEST_TIMEOUT", "server.request_timeout"),
            ("VIBEUP_REDIS__HOST", "redis.host"),
            ("VIBEUP_REDIS__PORT", "redis.port"),
            ("VIBEUP_REDIS__PASSWORD", "redis.password"),
            ("VIBEUP_REDIS__DB", "redis.db"),
            ("VIBEUP_REDIS__POOL_SIZE", "redis.pool_size"),
            ("VIBEUP_GEMINI__API_BASE_URL", "gemini.api_base_url"),
            ("VIBEUP_GEMINI__MODEL", "gemini.model"),
            ("VIBEUP_GEMINI__TIMEOUT_SECONDS", "gemini.timeout_seconds"),
            ("VIBEUP_USAGE__DAILY_REQUEST_LIMIT", "usage.daily_request_limit"),
            ("VIBEUP_USAGE__TOKEN_COST", "usage.token_cost"),
            ("VIBEUP_TRANSFORM__MAX_INPUT_CHARS", "transform.max_input_chars"),
            ("VIBEUP_STORAGE__BACKEND", "storage.backend"),
            ("VIBEUP_LOGGING__LEVEL", "logging.level"),
            ("VIBEUP_LOGGING__FORMAT", "logging.format"),
        ];
        for (var, key) in overrides {
            if let Ok(val) = env::var(var) {
                builder = builder.set_override(key, val)?;
            }
        }

        // The credential keeps its conventional unprefixed name
        if let Ok(val) = env::var("GEMINI_API_KEY") {
            builder = builder.set_override("gemini.api_key", val)?;
        }
        if let Ok(val) = env::var("VIBEUP_GEMINI__API_KEY") {
            builder = builder.set_override("gemini.api_key", val)?;
        }

        let config = builder.build()?;
        let mut settings: Settings = config.try_deserialize()?;

        // Treat a blank credential the same as a missing one
        if settings
            .gemini
            .api_key
            .as_deref()
            .map(|key| key.trim().is_empty())
            .unwrap_or(false)
        {
            settings.gemini.api_key = None;
        }

        Ok(settings)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.server.request_timeout == 0 {
            return Err("Request timeout must be greater than 0".to_string());
        }

        // Validate Redis pool size
        if self.redis.pool_size == 0 {
            return Err("Redis pool size must be greater than 0".to_string());
        }

        let valid_backends = ["memory", "redis"];
        if !valid_backends.contains(&self.storage.backend.as_str()) {
            return Err(format!(
                "Invalid storage backend '{}'. Must be one of: {}",
                self.storage.backend,
                valid_backends.join(", ")
            ));
        }

        if self.usage.daily_request_limit == 0 {
            return Err("Daily request limit must be greater than 0".to_string());
        }

        if self.usage.token_cost < 0.0 {
            return Err("Token cost must not be negative".to_string());
        }

        if self.transform.max_input_chars == 0 {
            return Err("Maximum input length must be greater than 0".to_string());
        }

        if !(0.0..=2.0).contains(&self.gemini.temperature) {
            return Err(format!(
                "Gemini temperature {} is outside 0.0..=2.0",
                self.gemini.temperature
            ));
        }

        if !(0.0..=1.0).contains(&self.gemini.top_p) {
            return Err(format!(
                "Gemini top_p {} is outside 0.0..=1.0",
                self.gemini.top_p
            ));
        }

        if self.gemini.timeout_seconds == 0 {
            return Err("Gemini timeout must be greater than 0".to_string());
        }

        // Validate logging level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid logging level '{}'. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            ));
        }

        Ok(())
    }

    /// Whether Redis backs the usage ledger and session store
    pub fn uses_redis(&self) -> bool {
        self.storage.backend == "redis"
    }

    /// Get Redis connection string
    pub fn redis_url(&self) -> String {
        match &self.redis.password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                password, self.redis.host, self.redis.port, self.redis.db
            ),
            None => format!(
                "redis://{}:{}/{}",
                self.redis.host, self.redis.port, self.redis.db
            ),
        }
    }

    /// Per-request deadline applied by the router
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.request_timeout)
    }

    /// Get server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
pub(crate) fn test_settings() -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 3000,
            request_timeout: 30000,
        },
        redis: RedisSettings {
            host: "localhost".to_string(),
            port: 6379,
            password: None,
            db: 0,
            pool_size: 10,
        },
        gemini: GeminiSettings {
            api_key: None,
            api_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
            temperature: 0.8,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 1024,
            timeout_seconds: 30,
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
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}
