/// Audit trail endpoint
///
/// Read side of the audit log: every mutating request in the API writes
/// an entry, and this endpoint lets a tenant admin (or a superuser via
/// the tenant override header) page through them. The trail is
/// read-only over HTTP; retention is handled by a background sweep.

use crate::{
    app::AppState,
    error::ApiResult,
    routes::{authorize, clamp_pagination, Pagination},
};
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use chainwatch_shared::{
    auth::context::{AuthContext, TenantContext},
    models::{audit::AuditEntry, user::UserRole},
};

/// Audit entry payload
#[derive(Debug, Serialize)]
pub struct AuditEntryResponse {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub target_tenant_id: Option<Uuid>,
    pub details: JsonValue,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub request_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AuditEntry> for AuditEntryResponse {
    fn from(entry: AuditEntry) -> Self {
        Self {
            id: entry.id,
            tenant_id: entry.tenant_id,
            actor_id: entry.actor_id,
            action: entry.action,
            resource_type: entry.resource_type,
            resource_id: entry.resource_id,
            target_tenant_id: entry.target_tenant_id,
            details: entry.details,
            client_ip: entry.client_ip,
            user_agent: entry.user_agent,
            request_id: entry.request_id,
            created_at: entry.created_at,
        }
    }
}

/// List query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ListAuditQuery {
    /// Page number (1-based)
    pub page: Option<i64>,

    /// Items per page (max 100)
    pub per_page: Option<i64>,

    /// Only entries with this exact action, e.g. "monitor.create"
    pub action: Option<String>,
}

/// List audit entries response
#[derive(Debug, Serialize)]
pub struct ListAuditResponse {
    pub entries: Vec<AuditEntryResponse>,
    pub pagination: Pagination,
}

/// List the effective tenant's audit trail
///
/// Sessions need the admin role; API keys need the `audit:read` scope.
/// A superuser reads any tenant's trail by pinning it with the
/// `X-Tenant-ID` header.
///
/// # Endpoint
///
/// ```text
/// GET /api/v1/audit?page=1&per_page=20&action=monitor.create
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Not authenticated
/// - `403 Forbidden`: Missing role/scope
pub async fn list_audit(
    State(state): State<AppState>,
    auth: AuthContext,
    ctx: TenantContext,
    Query(query): Query<ListAuditQuery>,
) -> ApiResult<Json<ListAuditResponse>> {
    authorize(&auth, "audit:read", UserRole::Admin)?;
    let tenant_id = ctx.require_tenant()?;

    let (page, per_page, offset) = clamp_pagination(query.page, query.per_page);
    let action = query.action.as_deref();

    let entries = AuditEntry::list_by_tenant(&state.db, tenant_id, action, per_page, offset).await?;
    let total = AuditEntry::count_by_tenant(&state.db, tenant_id, action).await?;

    Ok(Json(ListAuditResponse {
        entries: entries.into_iter().map(AuditEntryResponse::from).collect(),
        pagination: Pagination::new(page, per_page, total),
    }))
}

// Trail contents for the write paths are asserted in
// tests/integration_test.rs alongside the mutations that produce them.
