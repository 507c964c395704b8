/// Fixed-window rate limiting backed by Redis
///
/// Counts requests per subject, per path, per time window. Window boundaries
/// are aligned to multiples of the period so that every instance of the API
/// sees the same window for the same timestamp.
///
/// # Storage
///
/// State is stored in Redis with keys: `ratelimit:{subject}:{path}:{window_start}`.
/// Each key is INCRed atomically and expires after one period, so stale
/// windows clean themselves up.
///
/// # Algorithm
///
/// Fixed window counting:
/// - Window start = now - (now % period)
/// - Each request increments the window's counter
/// - Request blocked once the counter exceeds the limit
/// - Counter resets when the next window begins
///
/// The caller decides what happens when Redis itself is unreachable; the
/// limiter only reports the error.
use redis::Script;
use std::time::{SystemTime, UNIX_EPOCH};

use super::client::{RedisClient, RedisClientError};

/// Atomically increments a window counter, setting its TTL on first use.
const FIXED_WINDOW_SCRIPT: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return count
"#;

/// Outcome of a rate limit check
///
/// Carries everything the HTTP layer needs for `X-RateLimit-*` headers
/// and 429 responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request is within the limit
    pub allowed: bool,

    /// Maximum requests allowed in the window
    pub limit: u32,

    /// Requests remaining in the current window
    pub remaining: u32,

    /// Unix timestamp when the current window ends
    pub reset_at: u64,

    /// Window length in seconds
    pub period_secs: u64,

    /// Seconds until the window resets (for Retry-After)
    pub retry_after: u64,
}

impl RateLimitDecision {
    /// Evaluates a post-increment counter value against a limit
    ///
    /// `count` is the counter value after this request was counted, so a
    /// count equal to the limit is still allowed.
    pub fn evaluate(count: u64, limit: u32, window_start: u64, period_secs: u64, now: u64) -> Self {
        let reset_at = window_start + period_secs;

        Self {
            allowed: count <= limit as u64,
            limit,
            remaining: (limit as u64).saturating_sub(count) as u32,
            reset_at,
            period_secs,
            retry_after: reset_at.saturating_sub(now),
        }
    }
}

/// Redis-backed fixed window rate limiter
///
/// Cheap to clone; all clones share the underlying connection manager.
#[derive(Clone)]
pub struct RateLimiter {
    client: RedisClient,
}

impl RateLimiter {
    /// Creates a rate limiter over an existing Redis client
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    /// Counts a request and reports whether it is within the limit
    ///
    /// `subject` identifies who is being limited (for example `user:{id}`,
    /// `key:{id}`, or `ip:{addr}`); `path` is the normalized request path.
    /// A zero `period_secs` is treated as one second.
    ///
    /// # Errors
    ///
    /// Returns an error if the Redis command fails. The request has not been
    /// counted in that case.
    pub async fn check(
        &self,
        subject: &str,
        path: &str,
        limit: u32,
        period_secs: u64,
    ) -> Result<RateLimitDecision, RedisClientError> {
        let period_secs = period_secs.max(1);
        let now = unix_now();
        let window = window_start(now, period_secs);
        let key = window_key(subject, path, window);

        let mut conn = self.client.get_connection();
        let count: i64 = Script::new(FIXED_WINDOW_SCRIPT)
            .key(&key)
            .arg(period_secs)
            .invoke_async(&mut conn)
            .await?;

        let decision = RateLimitDecision::evaluate(count as u64, limit, window, period_secs, now);

        if !decision.allowed {
            tracing::debug!(
                subject = %subject,
                path = %path,
                count = count,
                limit = limit,
                "Rate limit window exhausted"
            );
        }

        Ok(decision)
    }
}

/// Computes the aligned start of the window containing `now`
pub fn window_start(now: u64, period_secs: u64) -> u64 {
    now - (now % period_secs)
}

/// Builds the Redis key for one subject/path/window combination
pub fn window_key(subject: &str, path: &str, window_start: u64) -> String {
    format!("ratelimit:{}:{}:{}", subject, path, window_start)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}
