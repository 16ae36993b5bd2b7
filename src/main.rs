use anyhow::Result;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use vibeup::routes::{create_app, ApiState, AppState};
use vibeup::services::{
    GeminiClient, GeminiConfig, MemorySessionStore, MemoryUsageStore, MemoryUserStore,
    RedisSessionStore, RedisUsageStore, RedisUserStore, RequestValidator, SessionStore, TextModel,
    TransformationGateway, UsageLimits, UsageStore, UserStore,
};
use vibeup::utils::{init_logger, Clock, HttpClient, SystemClock};
use vibeup::{RedisPool, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env from the working directory if present
    dotenvy::dotenv().ok();

    let settings = Settings::new()?;

    init_logger(&settings)?;

    info!("🚀 VibeUp starting...");
    info!("📋 Configuration loaded");

    if let Err(e) = settings.validate() {
        error!("❌ Configuration validation failed: {}", e);
        return Err(anyhow::anyhow!("Invalid configuration: {}", e));
    }
    info!("✅ Configuration validated");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let limits = UsageLimits::from(&settings);

    let (redis, usage, sessions, users): (
        Option<RedisPool>,
        Arc<dyn UsageStore>,
        Arc<dyn SessionStore>,
        Arc<dyn UserStore>,
    ) = if settings.uses_redis() {
        let redis = RedisPool::new(&settings)?;
        info!("🔌 Redis connection pool created");

        match redis.ping().await {
            Ok(_) => info!("✅ Redis connection established"),
            Err(e) => {
                error!("❌ Redis connection failed: {}", e);
                return Err(anyhow::anyhow!("Failed to connect to Redis: {}", e));
            }
        }

        let shared = Arc::new(redis.clone());
        let usage: Arc<dyn UsageStore> =
            Arc::new(RedisUsageStore::new(shared.clone(), limits, clock));
        let sessions: Arc<dyn SessionStore> = Arc::new(RedisSessionStore::new(shared.clone()));
        let users: Arc<dyn UserStore> = Arc::new(RedisUserStore::new(shared));
        (Some(redis), usage, sessions, users)
    } else {
        warn!("💾 Using in-memory storage: usage and history are per-process and lost on restart");
        let usage: Arc<dyn UsageStore> = Arc::new(MemoryUsageStore::new(limits, clock));
        let sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let users: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
        (None, usage, sessions, users)
    };

    let model: Option<Arc<dyn TextModel>> = match GeminiConfig::from_settings(&settings) {
        Some(config) => {
            let http_client = HttpClient::new(&settings)?;
            info!("🤖 Gemini model configured: {}", config.model);
            let client: Arc<dyn TextModel> = Arc::new(GeminiClient::new(config, http_client));
            Some(client)
        }
        None => {
            warn!("🔑 No Gemini API key configured, every transform will use the fallback table");
            None
        }
    };

    let health_state = Arc::new(AppState {
        redis,
        storage_backend: usage.backend(),
        model_configured: model.is_some(),
    });

    let gateway = Arc::new(TransformationGateway::new(
        RequestValidator::new(settings.transform.max_input_chars),
        usage.clone(),
        model,
        sessions.clone(),
    ));

    let api_state = ApiState {
        gateway,
        usage,
        sessions,
        users,
    };

    let app = create_app(api_state, health_state, settings.request_timeout())
        .layer(TraceLayer::new_for_http());

    let bind_addr = settings.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", bind_addr, e))?;

    info!("🚀 Server ready on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("👋 Shutting down...");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Signal received, starting graceful shutdown");
}
