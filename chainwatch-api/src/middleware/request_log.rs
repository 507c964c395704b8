/// Request logging middleware
///
/// Emits one structured log line per request with the method, path,
/// status, elapsed time, and request id, and stamps the response with
/// an `X-Response-Time` header. Individual request headers are only
/// logged at DEBUG, and sensitive ones are redacted first; see
/// [`redact_header`].
///
/// Authenticated requests are attributed to their tenant: the auth
/// middleware leaves the [`AuthContext`] on the response extensions so
/// this layer can read it even though it runs outside authentication.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use std::time::Instant;

use chainwatch_shared::auth::context::AuthContext;

use super::request_id::RequestId;

/// Headers whose values never reach the logs
const REDACTED_HEADERS: [&str; 4] = ["authorization", "cookie", "x-api-key", "x-auth-token"];

/// Placeholder written in place of redacted values
const REDACTED_PLACEHOLDER: &str = "***REDACTED***";

/// Returns the loggable form of a request header value
///
/// Credential-bearing headers are matched case-insensitively and
/// replaced wholesale; everything else passes through unchanged.
pub fn redact_header(name: &str, value: &str) -> String {
    if REDACTED_HEADERS
        .iter()
        .any(|sensitive| name.eq_ignore_ascii_case(sensitive))
    {
        REDACTED_PLACEHOLDER.to_string()
    } else {
        value.to_string()
    }
}

/// Middleware entry point
pub async fn request_log_middleware(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();

    if tracing::enabled!(tracing::Level::DEBUG) {
        for (name, value) in req.headers() {
            let value = value.to_str().unwrap_or("<binary>");
            tracing::debug!(
                request_id = %request_id,
                header = %name,
                value = %redact_header(name.as_str(), value),
                "Request header"
            );
        }
    }

    let start = Instant::now();
    let mut response = next.run(req).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    let status = response.status();
    let tenant_id = response
        .extensions()
        .get::<AuthContext>()
        .map(|auth| auth.tenant_id.to_string());
    let tenant_id = tenant_id.as_deref().unwrap_or("-");

    if status.is_server_error() {
        tracing::error!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms = duration_ms,
            tenant_id = %tenant_id,
            "Request failed"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms = duration_ms,
            tenant_id = %tenant_id,
            "Request rejected"
        );
    } else {
        tracing::info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms = duration_ms,
            tenant_id = %tenant_id,
            "Request completed"
        );
    }

    if let Ok(value) = HeaderValue::from_str(&format!("{}ms", duration_ms)) {
        response.headers_mut().insert("x-response-time", value);
    }

    response
}
