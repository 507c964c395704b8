//! # Chainwatch API Server
//!
//! This is the main API server for Chainwatch, the multi-tenant
//! blockchain monitoring platform.
//!
//! ## Architecture
//!
//! The API server is built with Axum and provides:
//! - Tenant, monitor, trigger, and network management endpoints
//! - Authentication (JWT + API keys) with tenant isolation
//! - Plan-tier rate limiting and quota enforcement
//! - Audit logging and a DB-backed job queue feeding the worker
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p chainwatch-api
//! ```

use std::net::SocketAddr;

use chainwatch_api::{
    app::{build_router, AppState},
    config::Config,
};
use chainwatch_shared::{
    db::{
        migrations::{ensure_database_exists, run_migrations},
        pool::{close_pool, create_pool},
    },
    redis::RedisClient,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chainwatch_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Chainwatch API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;
    tracing::info!(environment = %config.api.environment, "Configuration loaded");

    ensure_database_exists(&config.database.url).await?;
    let pool = create_pool(config.database.clone()).await?;
    run_migrations(&pool).await?;

    // Redis is optional; without it the rate limiter fails open and
    // caching is skipped, but the API stays up.
    let redis = match config.redis.clone() {
        Some(redis_config) => match RedisClient::new(redis_config).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable; rate limiting and caching disabled");
                None
            }
        },
        None => {
            tracing::info!("REDIS_URL not set; rate limiting and caching disabled");
            None
        }
    };

    let bind_address = config.bind_address();
    let state = AppState::new(pool.clone(), redis, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    // ConnectInfo feeds the per-IP rate limit subject and audit trail
    // when no X-Forwarded-For header is present.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    close_pool(pool).await;
    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Resolves when the process receives SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
