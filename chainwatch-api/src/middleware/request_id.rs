/// Request ID middleware
///
/// Every request gets a request id: the inbound `X-Request-ID` header
/// when the client sent a plausible one, otherwise a fresh UUID v4. The
/// id is stored in request extensions for handlers and downstream
/// middleware, echoed on the response, and spliced into error bodies.
///
/// This middleware is the outermost layer so the id exists for the
/// whole pipeline.

use axum::{
    extract::Request,
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::error::{ErrorBody, ErrorResponse};

/// Header used for request id propagation
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest inbound id we accept; longer values get replaced
const MAX_REQUEST_ID_LENGTH: usize = 64;

/// Request id carried in request extensions
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Accepts the inbound id or generates a new one
fn incoming_or_generated(req: &Request) -> String {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LENGTH)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Rebuilds an error response body with the request id filled in
///
/// `ApiError::into_response` leaves an [`ErrorBody`] marker on the
/// response; non-error responses pass through untouched.
fn fill_error_request_id(response: Response, request_id: &str) -> Response {
    let marker = match response.extensions().get::<ErrorBody>() {
        Some(marker) => marker.clone(),
        None => return response,
    };

    let status = response.status();
    let mut rebuilt = (
        status,
        Json(ErrorResponse {
            error: marker.error,
            message: marker.message,
            details: marker.details,
            request_id: Some(request_id.to_string()),
        }),
    )
        .into_response();

    // Keep headers like Retry-After and WWW-Authenticate from the
    // original response; content headers belong to the new body.
    for (name, value) in response.headers() {
        if name == header::CONTENT_LENGTH || name == header::CONTENT_TYPE {
            continue;
        }
        rebuilt.headers_mut().insert(name.clone(), value.clone());
    }

    rebuilt
}

/// Middleware entry point
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let id = incoming_or_generated(&req);
    req.extensions_mut().insert(RequestId(id.clone()));

    let response = next.run(req).await;
    let mut response = fill_error_request_id(response, &id);

    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use axum::{body::Body, http::StatusCode, routing::get, Router};
    use tower::ServiceExt;

    fn test_router() -> Router {
        Router::new()
            .route(
                "/id",
                get(|axum::Extension(req_id): axum::Extension<RequestId>| async move { req_id.0 }),
            )
            .route(
                "/fail",
                get(|| async { Err::<(), _>(ApiError::NotFound("gone".to_string())) }),
            )
            .layer(axum::middleware::from_fn(request_id_middleware))
    }

    #[tokio::test]
    async fn test_generates_id_when_absent() {
        let app = test_router();
        let response = app
            .oneshot(Request::builder().uri("/id").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let header = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap();
        assert!(Uuid::parse_str(&header).is_ok());

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&body), header);
    }

    #[tokio::test]
    async fn test_honors_inbound_id() {
        let app = test_router();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/id")
                    .header(REQUEST_ID_HEADER, "client-supplied-id")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response
                .headers()
                .get(REQUEST_ID_HEADER)
                .map(|v| v.as_bytes()),
            Some("client-supplied-id".as_bytes())
        );
    }

    #[tokio::test]
    async fn test_oversized_inbound_id_replaced() {
        let app = test_router();
        let oversized = "x".repeat(MAX_REQUEST_ID_LENGTH + 1);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/id")
                    .header(REQUEST_ID_HEADER, &oversized)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let header = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert_ne!(header, oversized);
        assert!(Uuid::parse_str(header).is_ok());
    }

    #[tokio::test]
    async fn test_error_body_carries_request_id() {
        let app = test_router();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/fail")
                    .header(REQUEST_ID_HEADER, "err-trace-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "not_found");
        assert_eq!(json["request_id"], "err-trace-1");
    }
}
