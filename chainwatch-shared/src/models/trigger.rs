/// Trigger model and database operations
///
/// Triggers describe where notifications go when a monitor fires: a webhook
/// endpoint or an email recipient list. Delivery itself happens in the
/// worker; this module manages the configuration records.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE triggers (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     tenant_id UUID NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
///     name VARCHAR(255) NOT NULL,
///     kind VARCHAR(20) NOT NULL,
///     config JSONB NOT NULL DEFAULT '{}',
///     active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT triggers_kind_check CHECK (kind IN ('webhook', 'email'))
/// );
/// ```
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

/// Notification channel kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    /// HTTP POST to a configured URL, optionally signed with a shared secret
    #[serde(rename = "webhook")]
    Webhook,

    /// Email to a recipient list
    #[serde(rename = "email")]
    Email,
}

impl TriggerKind {
    /// Converts kind to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Webhook => "webhook",
            TriggerKind::Email => "email",
        }
    }

    /// Parses kind from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "webhook" => Some(TriggerKind::Webhook),
            "email" => Some(TriggerKind::Email),
            _ => None,
        }
    }
}

/// Trigger model representing one notification destination
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Trigger {
    /// Unique trigger ID
    pub id: Uuid,

    /// Tenant this trigger belongs to
    pub tenant_id: Uuid,

    /// Human-readable name
    pub name: String,

    /// Notification channel kind
    pub kind: String,

    /// Kind-specific configuration (JSONB)
    ///
    /// Webhook: {"url": "...", "secret": "..."}
    /// Email:   {"recipients": ["ops@acme.dev"]}
    pub config: JsonValue,

    /// Inactive triggers are skipped at delivery time
    pub active: bool,

    /// When the trigger was created
    pub created_at: DateTime<Utc>,

    /// When the trigger was last updated
    pub updated_at: DateTime<Utc>,
}

impl Trigger {
    /// Gets the parsed kind enum
    pub fn get_kind(&self) -> Option<TriggerKind> {
        TriggerKind::from_str(&self.kind)
    }
}

/// Input for creating a new trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTrigger {
    /// Tenant ID
    pub tenant_id: Uuid,

    /// Trigger name
    pub name: String,

    /// Notification channel kind
    pub kind: TriggerKind,

    /// Kind-specific configuration
    pub config: JsonValue,
}

/// Input for updating a trigger
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTrigger {
    /// New name
    pub name: Option<String>,

    /// Update configuration (merged with existing config)
    pub config: Option<JsonValue>,

    /// Enable or disable the trigger
    pub active: Option<bool>,
}

impl Trigger {
    /// Creates a trigger if the tenant is under its quota
    ///
    /// Same count-versus-ceiling shape as monitor creation; `fallback_max`
    /// applies when the tenant has no `tenant_limits` row.
    ///
    /// # Returns
    ///
    /// `Some(trigger)` on success, `None` if the tenant is at its ceiling.
    pub async fn create(
        pool: &PgPool,
        data: CreateTrigger,
        fallback_max: i32,
    ) -> Result<Option<Self>, sqlx::Error> {
        let trigger = sqlx::query_as::<_, Trigger>(
            r#"
            INSERT INTO triggers (tenant_id, name, kind, config)
            SELECT $1, $2, $3, $4
            WHERE (SELECT COUNT(*) FROM triggers WHERE tenant_id = $1)
                < COALESCE(
                    (SELECT max_triggers FROM tenant_limits WHERE tenant_id = $1),
                    $5
                )
            RETURNING id, tenant_id, name, kind, config, active, created_at, updated_at
            "#,
        )
        .bind(data.tenant_id)
        .bind(data.name)
        .bind(data.kind.as_str())
        .bind(data.config)
        .bind(fallback_max)
        .fetch_optional(pool)
        .await?;

        Ok(trigger)
    }

    /// Finds a trigger by ID with tenant isolation
    pub async fn find_by_id_and_tenant(
        pool: &PgPool,
        id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let trigger = sqlx::query_as::<_, Trigger>(
            r#"
            SELECT id, tenant_id, name, kind, config, active, created_at, updated_at
            FROM triggers
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(pool)
        .await?;

        Ok(trigger)
    }

    /// Lists triggers for a tenant with pagination
    pub async fn list_by_tenant(
        pool: &PgPool,
        tenant_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let triggers = sqlx::query_as::<_, Trigger>(
            r#"
            SELECT id, tenant_id, name, kind, config, active, created_at, updated_at
            FROM triggers
            WHERE tenant_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(tenant_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(triggers)
    }

    /// Counts triggers for a tenant
    pub async fn count_by_tenant(pool: &PgPool, tenant_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM triggers WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    /// Updates a trigger with tenant isolation
    ///
    /// Only non-None fields in `data` will be updated.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        tenant_id: Uuid,
        data: UpdateTrigger,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE triggers SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.config.is_some() {
            bind_count += 1;
            query.push_str(&format!(", config = config || ${}", bind_count));
        }
        if data.active.is_some() {
            bind_count += 1;
            query.push_str(&format!(", active = ${}", bind_count));
        }

        query.push_str(" WHERE id = $1 AND tenant_id = $2 RETURNING id, tenant_id, name, kind, config, active, created_at, updated_at");

        let mut q = sqlx::query_as::<_, Trigger>(&query).bind(id).bind(tenant_id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(config) = data.config {
            q = q.bind(config);
        }
        if let Some(active) = data.active {
            q = q.bind(active);
        }

        let trigger = q.fetch_optional(pool).await?;

        Ok(trigger)
    }

    /// Deletes a trigger with tenant isolation
    pub async fn delete(pool: &PgPool, id: Uuid, tenant_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM triggers WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
