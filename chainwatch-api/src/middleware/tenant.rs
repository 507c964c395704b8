/// Tenant resolution middleware
///
/// Combines the caller's [`AuthContext`] with an optional requested
/// tenant (the `X-Tenant-ID` header, or the `tenant_id` query parameter
/// as a fallback) into a [`TenantContext`] describing whose data this
/// request may touch. Runs after authentication.
///
/// Regular callers may only name their own tenant. Superusers may name
/// any tenant, which pins the context to that tenant; without an
/// override their context skips tenant filters entirely. Outside
/// production the effective tenant is echoed back as a response header
/// for debugging.

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use chainwatch_shared::auth::context::{AuthContext, TenantContext};

use crate::app::AppState;
use crate::error::ApiError;

use super::query_param;

/// Header naming the tenant a request wants to act on
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Middleware entry point
///
/// # Errors
///
/// - 400 Bad Request: the requested tenant id is not a UUID
/// - 403 Forbidden: a non-superuser named a tenant other than their own
pub async fn tenant_context_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let requested = requested_tenant(&req)?;
    let auth = req.extensions().get::<AuthContext>().cloned();

    let context = TenantContext::resolve(auth.as_ref(), requested)?;

    if context.overridden {
        tracing::info!(
            operator = ?auth.as_ref().and_then(|a| a.user_id),
            tenant_id = ?context.tenant_id,
            "Cross-tenant override applied"
        );
    }

    req.extensions_mut().insert(context.clone());

    let mut response = next.run(req).await;

    if !state.config.api.environment.is_production() {
        if let Some(tenant_id) = context.tenant_id {
            if let Ok(value) = HeaderValue::from_str(&tenant_id.to_string()) {
                response.headers_mut().insert(TENANT_HEADER, value);
            }
        }
    }

    Ok(response)
}

/// Reads the requested tenant from the header or the query string
fn requested_tenant(req: &Request) -> Result<Option<Uuid>, ApiError> {
    let raw = req
        .headers()
        .get(TENANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| query_param(req.uri().query(), "tenant_id"));

    match raw {
        None => Ok(None),
        Some(raw) => Uuid::parse_str(&raw)
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("Invalid tenant ID: {}", raw))),
    }
}
