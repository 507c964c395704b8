/// Middleware modules for the API server
///
/// Layer order is fixed in `app::build_router`: request ids come first,
/// then request logging, security headers, and per-scope auth, tenant
/// resolution, and rate limiting. Auth must precede the other two so
/// they can read the [`AuthContext`](chainwatch_shared::auth::context::AuthContext)
/// from request extensions.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod request_log;
pub mod security;
pub mod tenant;

use axum::extract::ConnectInfo;
use axum::http::{Extensions, HeaderMap};
use std::net::SocketAddr;

/// Reads a single query string parameter without deserializing the rest
///
/// Good enough for the fixed, URL-safe parameters the middleware
/// accepts; handlers use `axum::extract::Query` for real query types.
pub(crate) fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    let query = query?;
    query.split('&').find_map(|pair| {
        let mut parts = pair.splitn(2, '=');
        match (parts.next(), parts.next()) {
            (Some(key), Some(value)) if key == name && !value.is_empty() => {
                Some(value.to_string())
            }
            _ => None,
        }
    })
}

/// Best-effort client address for logging and anonymous rate limiting
///
/// Prefers the first `X-Forwarded-For` entry (the original client when
/// a trusted proxy sits in front), then the socket address. Takes the
/// request pieces separately so extractors working from `Parts` can
/// share it.
pub(crate) fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|info| info.0.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}
