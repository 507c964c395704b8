/// Audit trail recording for the request path
///
/// Handlers call [`record_audit`] after a successful mutation. Entries
/// are written from a background task so a slow insert never delays the
/// response; a failed insert is logged and dropped rather than failing
/// the request that already succeeded.

use axum::http::{header, request::Parts};
use axum::extract::FromRequestParts;
use serde_json::Value as JsonValue;
use sqlx::PgPool;

use chainwatch_shared::auth::context::{AuthContext, TenantContext};
use chainwatch_shared::models::audit::{AuditEntry, CreateAuditEntry};

use crate::middleware::client_ip;
use crate::middleware::request_id::RequestId;

/// audit_log columns are bounded; anything longer gets cut here
const MAX_USER_AGENT_LENGTH: usize = 512;

/// Request details attached to every audit entry
///
/// Extracted from request parts, so handlers list it as an argument
/// next to their other extractors. Extraction never fails; missing
/// pieces are simply `None`.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    /// Request id assigned by the request id middleware
    pub request_id: Option<String>,

    /// Best-effort client address
    pub client_ip: Option<String>,

    /// Client User-Agent header
    pub user_agent: Option<String>,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequestMeta
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let request_id = parts
            .extensions
            .get::<RequestId>()
            .map(|id| id.0.clone());

        let ip = client_ip(&parts.headers, &parts.extensions);
        let client_ip = (ip != "unknown").then_some(ip);

        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|ua| {
                if ua.len() > MAX_USER_AGENT_LENGTH {
                    ua.chars().take(MAX_USER_AGENT_LENGTH).collect()
                } else {
                    ua.to_string()
                }
            });

        Ok(Self {
            request_id,
            client_ip,
            user_agent,
        })
    }
}

/// Builds an audit entry from the request's contexts
///
/// The entry lands under the effective tenant. When a superuser
/// override is active, `target_tenant_id` records it. Handlers that
/// act on a tenant other than the effective one (suspension, for
/// example) adjust the returned entry's fields before recording.
pub fn audit_entry(
    auth: &AuthContext,
    tenant_ctx: &TenantContext,
    meta: &RequestMeta,
    action: &str,
    resource_type: &str,
    resource_id: Option<String>,
    details: JsonValue,
) -> CreateAuditEntry {
    CreateAuditEntry {
        tenant_id: tenant_ctx.tenant_id.unwrap_or(auth.tenant_id),
        actor_id: auth.user_id,
        action: action.to_string(),
        resource_type: resource_type.to_string(),
        resource_id,
        target_tenant_id: if tenant_ctx.overridden {
            tenant_ctx.tenant_id
        } else {
            None
        },
        details,
        client_ip: meta.client_ip.clone(),
        user_agent: meta.user_agent.clone(),
        request_id: meta.request_id.clone(),
    }
}

/// Writes an audit entry in the background
pub fn record_audit(db: &PgPool, entry: CreateAuditEntry) {
    let db = db.clone();
    tokio::spawn(async move {
        let action = entry.action.clone();
        if let Err(e) = AuditEntry::record(&db, entry).await {
            tracing::error!(action = %action, error = %e, "Failed to write audit entry");
        }
    });
}
