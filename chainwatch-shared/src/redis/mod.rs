/// Redis integration for rate limiting and caching
///
/// This module provides the Redis-backed pieces of the platform:
/// - Connection pooling with automatic reconnection
/// - Fixed-window rate limit counters
/// - Short-lived JSON cache for hot lookups
///
/// # Architecture
///
/// ```text
/// ┌─────────────┐
/// │  API server │ ──INCR──> ratelimit:{subject}:{path}:{window}
/// └─────────────┘
///        │
///        │ GET / SETEX
///        ▼
///  chainwatch:{kind}:{id}  (cached tenants, monitors, networks)
/// ```
///
/// # Example
///
/// ```no_run
/// use chainwatch_shared::redis::client::{RedisClient, RedisConfig};
/// use chainwatch_shared::redis::rate_limit::RateLimiter;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = RedisConfig::from_env()?;
/// let client = RedisClient::new(config).await?;
///
/// let limiter = RateLimiter::new(client);
/// let decision = limiter.check("user:abc", "/api/v1/monitors", 100, 3600).await?;
/// println!("allowed: {}", decision.allowed);
/// # Ok(())
/// # }
/// ```

pub mod cache;
pub mod client;
pub mod rate_limit;

// Re-export common types for convenience
pub use cache::{Cache, CacheError};
pub use client::{RedisClient, RedisClientError, RedisConfig, RedisStats};
pub use rate_limit::{RateLimitDecision, RateLimiter};
