/// Worker configuration management
///
/// Environment-driven, matching the API's surface where the two overlap
/// (`DATABASE_URL`, `DATABASE_MAX_CONNECTIONS`, `REDIS_URL`). Worker
/// knobs carry a `WORKER_` prefix:
///
/// - `WORKER_POLL_INTERVAL_SECS` (default 1)
/// - `WORKER_BATCH_SIZE` (default 5)
/// - `WORKER_MAX_CONCURRENT_JOBS` (default 10)
/// - `AUDIT_RETENTION_DAYS` (default 90)
use chainwatch_shared::db::pool::DatabaseConfig;
use chainwatch_shared::redis::RedisConfig;
use std::env;

use crate::runner::RunnerConfig;

/// Worker process configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Database connection settings
    pub database: DatabaseConfig,

    /// Redis settings; None disables cache invalidation
    pub redis: Option<RedisConfig>,

    /// Polling loop tuning
    pub runner: RunnerConfig,

    /// Default audit retention window in days
    pub audit_retention_days: i64,
}

impl WorkerConfig {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing or a variable fails
    /// to parse.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        // The worker holds a handful of jobs at a time; it does not need
        // the API's pool size.
        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()?;

        // Redis stays optional: without it cache invalidation is skipped.
        let redis = RedisConfig::from_env().ok();

        let poll_interval_secs = env::var("WORKER_POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "1".to_string())
            .parse::<u64>()?;

        let batch_size = env::var("WORKER_BATCH_SIZE")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<i64>()?;

        let max_concurrent_jobs = env::var("WORKER_MAX_CONCURRENT_JOBS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<usize>()?;

        if batch_size < 1 {
            anyhow::bail!("WORKER_BATCH_SIZE must be at least 1");
        }
        if max_concurrent_jobs < 1 {
            anyhow::bail!("WORKER_MAX_CONCURRENT_JOBS must be at least 1");
        }

        let audit_retention_days = env::var("AUDIT_RETENTION_DAYS")
            .unwrap_or_else(|_| "90".to_string())
            .parse::<i64>()?;

        if audit_retention_days < 1 {
            anyhow::bail!("AUDIT_RETENTION_DAYS must be at least 1");
        }

        Ok(Self {
            database: DatabaseConfig {
                url: database_url,
                max_connections,
                ..DatabaseConfig::default()
            },
            redis,
            runner: RunnerConfig {
                poll_interval_secs,
                batch_size,
                max_concurrent_jobs,
            },
            audit_retention_days,
        })
    }
}
