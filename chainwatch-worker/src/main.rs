//! # Chainwatch Worker
//!
//! Background job runner binary. Claims due rows from the `jobs` table,
//! dispatches them to per-kind handlers, and records outcomes with retry
//! backoff.
//!
//! ## Architecture
//!
//! - Postgres-backed queue, claimed with `FOR UPDATE SKIP LOCKED`
//! - Handlers: monitor sync, audit retention sweep, webhook test delivery
//! - Redis cache invalidation when `REDIS_URL` is configured
//! - Graceful shutdown on SIGINT/SIGTERM with an in-flight drain
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p chainwatch-worker
//! ```

use chainwatch_shared::db::pool::{close_pool, create_pool};
use chainwatch_shared::redis::{Cache, RedisClient};
use chainwatch_worker::config::WorkerConfig;
use chainwatch_worker::runner::JobRunner;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chainwatch_worker=debug,chainwatch_shared=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Chainwatch Worker v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = WorkerConfig::from_env()?;

    // Migrations are the API's job; the worker assumes the schema is in
    // place and fails its health check otherwise.
    let pool = create_pool(config.database.clone()).await?;

    let cache = match &config.redis {
        Some(redis_config) => match RedisClient::new(redis_config.clone()).await {
            Ok(client) => Some(Cache::new(client)),
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable; cache invalidation disabled");
                None
            }
        },
        None => {
            tracing::info!("REDIS_URL not set; cache invalidation disabled");
            None
        }
    };

    let runner = JobRunner::new(
        pool.clone(),
        cache,
        config.runner.clone(),
        config.audit_retention_days,
    )?;

    let shutdown = runner.shutdown_token();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received");
        shutdown.cancel();
    });

    runner.run().await?;

    close_pool(pool).await;
    tracing::info!("Worker stopped");

    Ok(())
}

/// Resolves on SIGINT or SIGTERM
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
