pub mod coercion;
pub mod fallback;
pub mod gemini_client;
pub mod prompt;
pub mod session_store;
pub mod transformation_gateway;
pub mod usage_ledger;
pub mod user_store;
pub mod validator;

pub use coercion::{coerce, strip_code_fences, CoercionError};
pub use fallback::{fallback, select_entry, FallbackEntry, DEFAULT_ENTRY, FALLBACK_TABLE};
pub use gemini_client::{GeminiClient, GeminiConfig, TextModel};
pub use prompt::transformation_prompt;
pub use session_store::{
    MemorySessionStore, RedisSessionStore, SessionStore, ANONYMOUS_USAGE_CAP,
    DEFAULT_SESSION_LIMIT,
};
pub use transformation_gateway::{
    FallbackReason, ResultSource, TransformOutcome, TransformationGateway,
};
pub use usage_ledger::{MemoryUsageStore, RedisUsageStore, UsageLimits, UsageStore};
pub use user_store::{MemoryUserStore, RedisUserStore, UserStore};
pub use validator::{validate_email, RequestValidator, ValidationError, DEFAULT_MAX_INPUT_CHARS};
