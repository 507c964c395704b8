/// Rate limiting middleware
///
/// Fixed-window limiting keyed by subject and path, with window state
/// in Redis so every API instance sees the same counters.
///
/// # Limits
///
/// - Anonymous callers: 50 requests/hour per client IP
/// - Authenticated callers: the tenant plan's hourly tier
///   (free 100, starter 500, pro 1000, enterprise 10000)
/// - Superusers: 10000 requests/hour regardless of plan
/// - A few endpoints carry their own stricter limits (login, monitor
///   sync); those override the subject's tier
///
/// # Subjects
///
/// Authenticated requests are counted per tenant, so every key and
/// session of a tenant draws from the same budget. Anonymous requests
/// are counted per client IP, taken from the first `X-Forwarded-For`
/// entry or the socket address.
///
/// # Headers
///
/// Responses that went through a limit check carry:
/// - `X-RateLimit-Limit`: requests allowed per window
/// - `X-RateLimit-Remaining`: requests left in the current window
/// - `X-RateLimit-Reset`: Unix timestamp when the window ends
/// - `X-RateLimit-Period`: window length in seconds
/// - `Retry-After`: seconds to wait (429 responses only)
///
/// # Failure mode
///
/// The limiter fails open: when Redis is not configured or a check
/// errors, the request proceeds without headers. Availability beats
/// strict enforcement here; the gap is logged.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};

use chainwatch_shared::auth::context::AuthContext;
use chainwatch_shared::models::tenant::{Tenant, TenantPlan};
use chainwatch_shared::quota::{
    PlanLimits, ANONYMOUS_RATE_LIMIT, DEFAULT_RATE_PERIOD_SECS, SUPERUSER_RATE_LIMIT,
};
use chainwatch_shared::redis::rate_limit::RateLimitDecision;

use crate::app::AppState;
use crate::error::ApiError;

use super::client_ip;

/// Paths that are never rate limited
const EXCLUDED_PATHS: [&str; 4] = ["/health", "/docs", "/openapi.json", "/favicon.ico"];

/// Per-endpoint limits that replace the subject's tier
///
/// Matched as (prefix, suffix, limit, period seconds); an empty suffix
/// means the path must equal the prefix exactly.
const ENDPOINT_OVERRIDES: [(&str, &str, u32, u64); 2] = [
    // Login brute force protection: 10 attempts per 15 minutes
    ("/api/v1/auth/login", "", 10, 900),
    // Manual monitor syncs are expensive upstream RPC work
    ("/api/v1/monitors/", "/sync", 10, 3600),
];

/// Normalizes a path for matching and window keys
///
/// Lowercases and strips trailing slashes so `/Health/` and `/health`
/// share one window.
pub fn sanitize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_ascii_lowercase()
    }
}

/// Whether a (sanitized) path is exempt from limiting
pub fn is_excluded(path: &str) -> bool {
    EXCLUDED_PATHS
        .iter()
        .any(|excluded| path == *excluded || path.starts_with(&format!("{}/", excluded)))
}

/// Looks up a per-endpoint override for a (sanitized) path
pub fn endpoint_override(path: &str) -> Option<(u32, u64)> {
    ENDPOINT_OVERRIDES
        .iter()
        .find(|(prefix, suffix, _, _)| matches_override(path, prefix, suffix))
        .map(|(_, _, limit, period)| (*limit, *period))
}

fn matches_override(path: &str, prefix: &str, suffix: &str) -> bool {
    if suffix.is_empty() {
        path == prefix
    } else {
        path.starts_with(prefix)
            && path.ends_with(suffix)
            && path.len() > prefix.len() + suffix.len()
    }
}

/// Picks the limit and window for a caller
fn limit_for(auth: Option<&AuthContext>, plan: Option<TenantPlan>) -> (u32, u64) {
    match auth {
        Some(auth) if auth.is_superuser => (SUPERUSER_RATE_LIMIT, DEFAULT_RATE_PERIOD_SECS),
        Some(_) => {
            let plan = plan.unwrap_or(TenantPlan::Free);
            (
                PlanLimits::for_plan(plan).rate_limit_per_hour,
                DEFAULT_RATE_PERIOD_SECS,
            )
        }
        None => (ANONYMOUS_RATE_LIMIT, DEFAULT_RATE_PERIOD_SECS),
    }
}

/// Builds the window subject for a caller
fn subject_for(auth: Option<&AuthContext>, req: &Request) -> String {
    match auth {
        Some(auth) => format!("tenant:{}", auth.tenant_id),
        None => format!("ip:{}", client_ip(req.headers(), req.extensions())),
    }
}

/// Middleware entry point
///
/// Runs after authentication so the subject and tier are known.
///
/// # Errors
///
/// - 429 Too Many Requests: the window's budget is exhausted
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = sanitize_path(req.uri().path());
    if is_excluded(&path) {
        return Ok(next.run(req).await);
    }

    let auth = req.extensions().get::<AuthContext>().cloned();
    let plan = req
        .extensions()
        .get::<Tenant>()
        .and_then(|tenant| tenant.get_plan());

    let (mut limit, mut period) = limit_for(auth.as_ref(), plan);
    if let Some((endpoint_limit, endpoint_period)) = endpoint_override(&path) {
        limit = endpoint_limit;
        period = endpoint_period;
    }

    let limiter = match &state.rate_limiter {
        Some(limiter) => limiter,
        None => return Ok(next.run(req).await),
    };

    let subject = subject_for(auth.as_ref(), &req);

    let decision = match limiter.check(&subject, &path, limit, period).await {
        Ok(decision) => decision,
        Err(e) => {
            tracing::warn!(
                subject = %subject,
                path = %path,
                error = %e,
                "Rate limit check failed; allowing request"
            );
            return Ok(next.run(req).await);
        }
    };

    if !decision.allowed {
        tracing::warn!(
            subject = %subject,
            path = %path,
            limit = limit,
            "Rate limit exceeded"
        );

        let mut response = ApiError::RateLimitExceeded {
            retry_after: decision.retry_after,
            message: format!(
                "Rate limit exceeded. Try again in {} seconds",
                decision.retry_after
            ),
        }
        .into_response();
        apply_rate_limit_headers(response.headers_mut(), &decision);
        return Ok(response);
    }

    let mut response = next.run(req).await;
    apply_rate_limit_headers(response.headers_mut(), &decision);
    Ok(response)
}

/// Stamps the standard rate limit headers onto a response
fn apply_rate_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert(
        "X-RateLimit-Limit",
        HeaderValue::from_str(&decision.limit.to_string()).unwrap(),
    );
    headers.insert(
        "X-RateLimit-Remaining",
        HeaderValue::from_str(&decision.remaining.to_string()).unwrap(),
    );
    headers.insert(
        "X-RateLimit-Reset",
        HeaderValue::from_str(&decision.reset_at.to_string()).unwrap(),
    );
    headers.insert(
        "X-RateLimit-Period",
        HeaderValue::from_str(&decision.period_secs.to_string()).unwrap(),
    );
}
