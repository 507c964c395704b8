/// Audit log model and database operations
///
/// Append-only record of mutating API actions: who did what, to which
/// resource, from where. Entries are written out-of-band by the API (an
/// insert failure never fails the originating request) and pruned by the
/// worker's retention sweep.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE audit_log (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     tenant_id UUID NOT NULL,
///     actor_id UUID,
///     action VARCHAR(100) NOT NULL,
///     resource_type VARCHAR(50) NOT NULL,
///     resource_id VARCHAR(100),
///     target_tenant_id UUID,
///     details JSONB NOT NULL DEFAULT '{}',
///     client_ip VARCHAR(45),
///     user_agent VARCHAR(512),
///     request_id VARCHAR(64),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE INDEX idx_audit_log_tenant_created ON audit_log (tenant_id, created_at DESC);
/// ```
///
/// `tenant_id` is the tenant the action was executed in; `target_tenant_id`
/// is only set when a superuser acted on another tenant via an override.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

/// One audit log entry
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditEntry {
    /// Unique entry ID
    pub id: Uuid,

    /// Tenant the action was executed in
    pub tenant_id: Uuid,

    /// User or API key that performed the action (None for system actions)
    pub actor_id: Option<Uuid>,

    /// Action name (e.g. "monitor.create", "api_key.revoke")
    pub action: String,

    /// Resource type acted upon (e.g. "monitor", "api_key")
    pub resource_type: String,

    /// Resource identifier, if one exists
    pub resource_id: Option<String>,

    /// Set when a superuser acted on another tenant via an override
    pub target_tenant_id: Option<Uuid>,

    /// Free-form context (request payload summary, changed fields)
    pub details: JsonValue,

    /// Client IP address
    pub client_ip: Option<String>,

    /// Client User-Agent header
    pub user_agent: Option<String>,

    /// Request ID the action was performed under
    pub request_id: Option<String>,

    /// When the entry was written
    pub created_at: DateTime<Utc>,
}

/// Input for recording an audit entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuditEntry {
    /// Tenant the action was executed in
    pub tenant_id: Uuid,

    /// Acting user or API key
    pub actor_id: Option<Uuid>,

    /// Action name
    pub action: String,

    /// Resource type acted upon
    pub resource_type: String,

    /// Resource identifier
    pub resource_id: Option<String>,

    /// Overridden tenant, if any
    pub target_tenant_id: Option<Uuid>,

    /// Free-form context
    pub details: JsonValue,

    /// Client IP address
    pub client_ip: Option<String>,

    /// Client User-Agent header
    pub user_agent: Option<String>,

    /// Request ID
    pub request_id: Option<String>,
}

impl AuditEntry {
    /// Writes one audit entry
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails. Callers on the
    /// request path log this error rather than surfacing it.
    pub async fn record(pool: &PgPool, data: CreateAuditEntry) -> Result<Self, sqlx::Error> {
        let entry = sqlx::query_as::<_, AuditEntry>(
            r#"
            INSERT INTO audit_log
                (tenant_id, actor_id, action, resource_type, resource_id,
                 target_tenant_id, details, client_ip, user_agent, request_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, tenant_id, actor_id, action, resource_type, resource_id,
                      target_tenant_id, details, client_ip, user_agent, request_id,
                      created_at
            "#,
        )
        .bind(data.tenant_id)
        .bind(data.actor_id)
        .bind(data.action)
        .bind(data.resource_type)
        .bind(data.resource_id)
        .bind(data.target_tenant_id)
        .bind(data.details)
        .bind(data.client_ip)
        .bind(data.user_agent)
        .bind(data.request_id)
        .fetch_one(pool)
        .await?;

        Ok(entry)
    }

    /// Lists a tenant's audit trail, newest first
    ///
    /// `action` optionally filters to one action name.
    pub async fn list_by_tenant(
        pool: &PgPool,
        tenant_id: Uuid,
        action: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT id, tenant_id, actor_id, action, resource_type, resource_id,
                   target_tenant_id, details, client_ip, user_agent, request_id,
                   created_at
            FROM audit_log
            WHERE tenant_id = $1
              AND ($2::varchar IS NULL OR action = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(tenant_id)
        .bind(action)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(entries)
    }

    /// Counts a tenant's audit entries, honoring the action filter
    pub async fn count_by_tenant(
        pool: &PgPool,
        tenant_id: Uuid,
        action: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM audit_log
            WHERE tenant_id = $1
              AND ($2::varchar IS NULL OR action = $2)
            "#,
        )
        .bind(tenant_id)
        .bind(action)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Deletes entries older than the given cutoff
    ///
    /// Used by the retention sweep job. Returns the number of rows removed.
    pub async fn purge_older_than(
        pool: &PgPool,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM audit_log WHERE created_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
