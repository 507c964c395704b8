/// Monitor model and database operations
///
/// Monitors are the core tenant-scoped resource: a named watch over a set of
/// addresses on one network. The ingest pipeline consumes them; this side of
/// the platform only manages their lifecycle.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE monitors (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     tenant_id UUID NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
///     network_id UUID NOT NULL REFERENCES networks(id) ON DELETE RESTRICT,
///     name VARCHAR(255) NOT NULL,
///     addresses TEXT[] NOT NULL DEFAULT '{}',
///     paused BOOLEAN NOT NULL DEFAULT FALSE,
///     config JSONB NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE INDEX idx_monitors_tenant ON monitors (tenant_id, created_at DESC);
/// ```
///
/// # Example
///
/// ```no_run
/// use chainwatch_shared::models::monitor::{Monitor, CreateMonitor};
/// use chainwatch_shared::db::pool::{create_pool, DatabaseConfig};
/// use serde_json::json;
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let created = Monitor::create(&pool, CreateMonitor {
///     tenant_id: Uuid::new_v4(),
///     network_id: Uuid::new_v4(),
///     name: "Treasury watcher".to_string(),
///     addresses: vec!["0xdeadbeef".to_string()],
///     config: json!({"confirmations": 12}),
/// }, 10).await?;
///
/// match created {
///     Some(monitor) => println!("Created monitor: {}", monitor.id),
///     None => println!("Monitor quota reached"),
/// }
/// # Ok(())
/// # }
/// ```
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

/// Monitor model representing a watched address set
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Monitor {
    /// Unique monitor ID
    pub id: Uuid,

    /// Tenant this monitor belongs to
    pub tenant_id: Uuid,

    /// Network being watched
    pub network_id: Uuid,

    /// Human-readable name
    pub name: String,

    /// Addresses under watch
    pub addresses: Vec<String>,

    /// Paused monitors are skipped by the ingest side
    pub paused: bool,

    /// Monitor-specific configuration (JSONB)
    ///
    /// Example: {"confirmations": 12, "include_internal": false}
    pub config: JsonValue,

    /// When the monitor was created
    pub created_at: DateTime<Utc>,

    /// When the monitor was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMonitor {
    /// Tenant ID
    pub tenant_id: Uuid,

    /// Network to watch
    pub network_id: Uuid,

    /// Monitor name
    pub name: String,

    /// Addresses to watch
    pub addresses: Vec<String>,

    /// Monitor-specific configuration
    #[serde(default = "default_config")]
    pub config: JsonValue,
}

fn default_config() -> JsonValue {
    serde_json::json!({})
}

/// Input for updating a monitor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMonitor {
    /// New name
    pub name: Option<String>,

    /// Replace the watched address set
    pub addresses: Option<Vec<String>>,

    /// Pause or resume the monitor
    pub paused: Option<bool>,

    /// Update configuration (merged with existing config)
    pub config: Option<JsonValue>,
}

/// List filters for monitors
#[derive(Debug, Clone, Copy, Default)]
pub struct MonitorFilter {
    /// Only monitors on this network
    pub network_id: Option<Uuid>,

    /// Only paused (true) or running (false) monitors
    pub paused: Option<bool>,
}

impl Monitor {
    /// Creates a monitor if the tenant is under its quota
    ///
    /// The count-versus-ceiling check happens inside the inserting statement,
    /// so the quota cannot be bypassed by racing requests on separate
    /// connections beyond one statement's visibility. `fallback_max` is used
    /// when the tenant has no `tenant_limits` row.
    ///
    /// # Returns
    ///
    /// `Some(monitor)` on success, `None` if the tenant is at its ceiling.
    ///
    /// # Errors
    ///
    /// Returns an error if the network does not exist (foreign-key violation)
    /// or the database operation fails.
    pub async fn create(
        pool: &PgPool,
        data: CreateMonitor,
        fallback_max: i32,
    ) -> Result<Option<Self>, sqlx::Error> {
        let monitor = sqlx::query_as::<_, Monitor>(
            r#"
            INSERT INTO monitors (tenant_id, network_id, name, addresses, config)
            SELECT $1, $2, $3, $4, $5
            WHERE (SELECT COUNT(*) FROM monitors WHERE tenant_id = $1)
                < COALESCE(
                    (SELECT max_monitors FROM tenant_limits WHERE tenant_id = $1),
                    $6
                )
            RETURNING id, tenant_id, network_id, name, addresses, paused, config,
                      created_at, updated_at
            "#,
        )
        .bind(data.tenant_id)
        .bind(data.network_id)
        .bind(data.name)
        .bind(&data.addresses)
        .bind(data.config)
        .bind(fallback_max)
        .fetch_optional(pool)
        .await?;

        Ok(monitor)
    }

    /// Finds a monitor by ID with tenant isolation
    ///
    /// This is the only lookup API endpoints should use.
    pub async fn find_by_id_and_tenant(
        pool: &PgPool,
        id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let monitor = sqlx::query_as::<_, Monitor>(
            r#"
            SELECT id, tenant_id, network_id, name, addresses, paused, config,
                   created_at, updated_at
            FROM monitors
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(pool)
        .await?;

        Ok(monitor)
    }

    /// Lists monitors for a tenant with filters and pagination
    ///
    /// # Returns
    ///
    /// Monitors ordered by creation date (newest first)
    pub async fn list_by_tenant(
        pool: &PgPool,
        tenant_id: Uuid,
        filter: MonitorFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let monitors = sqlx::query_as::<_, Monitor>(
            r#"
            SELECT id, tenant_id, network_id, name, addresses, paused, config,
                   created_at, updated_at
            FROM monitors
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR network_id = $2)
              AND ($3::boolean IS NULL OR paused = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(tenant_id)
        .bind(filter.network_id)
        .bind(filter.paused)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(monitors)
    }

    /// Counts monitors for a tenant, honoring the same filters as the list
    pub async fn count_by_tenant(
        pool: &PgPool,
        tenant_id: Uuid,
        filter: MonitorFilter,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM monitors
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR network_id = $2)
              AND ($3::boolean IS NULL OR paused = $3)
            "#,
        )
        .bind(tenant_id)
        .bind(filter.network_id)
        .bind(filter.paused)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Updates a monitor with tenant isolation
    ///
    /// Only non-None fields in `data` will be updated. Config is merged with
    /// the existing config (jsonb || operator).
    ///
    /// # Returns
    ///
    /// The updated monitor, or None if it doesn't exist in this tenant
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        tenant_id: Uuid,
        data: UpdateMonitor,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE monitors SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.addresses.is_some() {
            bind_count += 1;
            query.push_str(&format!(", addresses = ${}", bind_count));
        }
        if data.paused.is_some() {
            bind_count += 1;
            query.push_str(&format!(", paused = ${}", bind_count));
        }
        if data.config.is_some() {
            bind_count += 1;
            query.push_str(&format!(", config = config || ${}", bind_count));
        }

        query.push_str(" WHERE id = $1 AND tenant_id = $2 RETURNING id, tenant_id, network_id, name, addresses, paused, config, created_at, updated_at");

        let mut q = sqlx::query_as::<_, Monitor>(&query).bind(id).bind(tenant_id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(addresses) = data.addresses {
            q = q.bind(addresses);
        }
        if let Some(paused) = data.paused {
            q = q.bind(paused);
        }
        if let Some(config) = data.config {
            q = q.bind(config);
        }

        let monitor = q.fetch_optional(pool).await?;

        Ok(monitor)
    }

    /// Deletes a monitor with tenant isolation
    pub async fn delete(pool: &PgPool, id: Uuid, tenant_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM monitors WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
