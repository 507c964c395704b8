/// Tenant model and database operations
///
/// This module provides the Tenant model for multi-tenant isolation.
/// Every user, API key, monitor, and trigger belongs to exactly one tenant.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tenants (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     slug VARCHAR(64) NOT NULL UNIQUE,
///     plan VARCHAR(50) NOT NULL DEFAULT 'free',
///     active BOOLEAN NOT NULL DEFAULT TRUE,
///     settings JSONB NOT NULL DEFAULT '{}',
///     suspended_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT tenants_plan_check CHECK (
///         plan IN ('free', 'starter', 'pro', 'enterprise')
///     )
/// );
///
/// CREATE TABLE tenant_limits (
///     tenant_id UUID PRIMARY KEY REFERENCES tenants(id) ON DELETE CASCADE,
///     max_monitors INTEGER NOT NULL,
///     max_triggers INTEGER NOT NULL,
///     max_api_calls_per_hour INTEGER NOT NULL,
///     max_storage_gb INTEGER NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use chainwatch_shared::models::tenant::{Tenant, CreateTenant, TenantPlan};
/// use chainwatch_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// // Create a new tenant
/// let new_tenant = CreateTenant {
///     name: "Acme Labs".to_string(),
///     slug: "acme-labs".to_string(),
///     plan: TenantPlan::Free,
/// };
///
/// let tenant = Tenant::create(&pool, new_tenant).await?;
/// println!("Created tenant: {}", tenant.id);
///
/// // Upgrade plan
/// Tenant::update_plan(&pool, tenant.id, TenantPlan::Pro).await?;
/// # Ok(())
/// # }
/// ```
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

/// Billing plan tiers
///
/// Plans determine quotas and rate-limit tiers. Variant order is the tier
/// order, so `Free < Starter < Pro < Enterprise` holds for comparisons.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "text")]
#[serde(rename_all = "lowercase")]
pub enum TenantPlan {
    /// Free plan (10 monitors, 100 requests/hour)
    #[serde(rename = "free")]
    Free,

    /// Starter plan (50 monitors, 500 requests/hour)
    #[serde(rename = "starter")]
    Starter,

    /// Professional plan (200 monitors, 1000 requests/hour)
    #[serde(rename = "pro")]
    Pro,

    /// Enterprise plan (1000 monitors, 10000 requests/hour)
    #[serde(rename = "enterprise")]
    Enterprise,
}

impl TenantPlan {
    /// Converts plan to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantPlan::Free => "free",
            TenantPlan::Starter => "starter",
            TenantPlan::Pro => "pro",
            TenantPlan::Enterprise => "enterprise",
        }
    }

    /// Parses plan from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "free" => Some(TenantPlan::Free),
            "starter" => Some(TenantPlan::Starter),
            "pro" => Some(TenantPlan::Pro),
            "enterprise" => Some(TenantPlan::Enterprise),
            _ => None,
        }
    }
}

/// Tenant model representing an organization/account
///
/// Tenants are the top-level entity for multi-tenant isolation.
/// All resources (monitors, triggers, API keys, users) belong to a tenant.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tenant {
    /// Unique tenant ID (UUID v4)
    pub id: Uuid,

    /// Organization/account name
    pub name: String,

    /// URL-safe unique identifier
    pub slug: String,

    /// Current billing plan
    pub plan: String,

    /// False while the tenant is suspended
    pub active: bool,

    /// Tenant-specific configuration (JSONB)
    ///
    /// Example: {"notification_email": "ops@acme.dev", "timezone": "UTC"}
    pub settings: JsonValue,

    /// When the tenant was suspended (None if active)
    pub suspended_at: Option<DateTime<Utc>>,

    /// When the tenant was created
    pub created_at: DateTime<Utc>,

    /// When the tenant was last updated
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    /// Gets the parsed plan enum
    pub fn get_plan(&self) -> Option<TenantPlan> {
        TenantPlan::from_str(&self.plan)
    }

    /// Whether the tenant is currently suspended
    pub fn is_suspended(&self) -> bool {
        !self.active
    }
}

/// Input for creating a new tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTenant {
    /// Organization/account name
    pub name: String,

    /// URL-safe unique identifier
    pub slug: String,

    /// Initial billing plan (defaults to Free)
    #[serde(default = "default_plan")]
    pub plan: TenantPlan,
}

fn default_plan() -> TenantPlan {
    TenantPlan::Free
}

/// Input for updating an existing tenant
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTenant {
    /// New name
    pub name: Option<String>,

    /// New plan
    pub plan: Option<TenantPlan>,

    /// Update settings (will be merged with existing settings)
    pub settings: Option<JsonValue>,
}

impl Tenant {
    /// Creates a new tenant in the database
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    /// * `data` - Tenant creation data
    ///
    /// # Returns
    ///
    /// The newly created tenant with generated ID and timestamps
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The slug already exists (unique constraint violation)
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: CreateTenant) -> Result<Self, sqlx::Error> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            INSERT INTO tenants (name, slug, plan)
            VALUES ($1, $2, $3)
            RETURNING id, name, slug, plan, active, settings, suspended_at,
                      created_at, updated_at
            "#,
        )
        .bind(data.name)
        .bind(data.slug)
        .bind(data.plan.as_str())
        .fetch_one(pool)
        .await?;

        Ok(tenant)
    }

    /// Finds a tenant by ID
    ///
    /// # Returns
    ///
    /// The tenant if found, None otherwise
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT id, name, slug, plan, active, settings, suspended_at,
                   created_at, updated_at
            FROM tenants
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(tenant)
    }

    /// Finds a tenant by slug
    pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Self>, sqlx::Error> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT id, name, slug, plan, active, settings, suspended_at,
                   created_at, updated_at
            FROM tenants
            WHERE slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(pool)
        .await?;

        Ok(tenant)
    }

    /// Updates an existing tenant
    ///
    /// Only non-None fields in `data` will be updated. Settings are merged
    /// with existing settings (not replaced).
    ///
    /// # Returns
    ///
    /// The updated tenant if found, None if tenant doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTenant,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE tenants SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.plan.is_some() {
            bind_count += 1;
            query.push_str(&format!(", plan = ${}", bind_count));
        }
        if data.settings.is_some() {
            bind_count += 1;
            // Merge settings with existing (jsonb || operator)
            query.push_str(&format!(", settings = settings || ${}", bind_count));
        }

        query.push_str(" WHERE id = $1 RETURNING id, name, slug, plan, active, settings, suspended_at, created_at, updated_at");

        let mut q = sqlx::query_as::<_, Tenant>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(plan) = data.plan {
            q = q.bind(plan.as_str());
        }
        if let Some(settings) = data.settings {
            q = q.bind(settings);
        }

        let tenant = q.fetch_optional(pool).await?;

        Ok(tenant)
    }

    /// Updates a tenant's plan
    ///
    /// Convenience method for the common upgrade/downgrade operation. The
    /// caller is responsible for refreshing `tenant_limits` afterwards.
    pub async fn update_plan(
        pool: &PgPool,
        id: Uuid,
        plan: TenantPlan,
    ) -> Result<Option<Self>, sqlx::Error> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            UPDATE tenants
            SET plan = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, slug, plan, active, settings, suspended_at,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(plan.as_str())
        .fetch_optional(pool)
        .await?;

        Ok(tenant)
    }

    /// Suspends a tenant
    ///
    /// Suspended tenants fail authentication until reactivated. Idempotent.
    pub async fn suspend(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            UPDATE tenants
            SET active = FALSE,
                suspended_at = COALESCE(suspended_at, NOW()),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, slug, plan, active, settings, suspended_at,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(tenant)
    }

    /// Lifts a suspension
    pub async fn reactivate(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            UPDATE tenants
            SET active = TRUE,
                suspended_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, slug, plan, active, settings, suspended_at,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(tenant)
    }

    /// Lists all tenants with pagination (superuser view)
    ///
    /// # Returns
    ///
    /// Vector of tenants, ordered by creation date (newest first)
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        let tenants = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT id, name, slug, plan, active, settings, suspended_at,
                   created_at, updated_at
            FROM tenants
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(tenants)
    }

    /// Counts total number of tenants
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tenants")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}

/// Per-tenant resource ceilings
///
/// Defaults follow the plan table; superusers can raise individual ceilings
/// without changing the plan. Current usage is computed from live counts by
/// the quota module, never stored here.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TenantLimits {
    /// Tenant these ceilings apply to
    pub tenant_id: Uuid,

    /// Maximum concurrent monitors
    pub max_monitors: i32,

    /// Maximum configured triggers
    pub max_triggers: i32,

    /// API call allowance per hour (rate-limit tier)
    pub max_api_calls_per_hour: i32,

    /// Storage allowance in gigabytes
    pub max_storage_gb: i32,

    /// When the limits row was created
    pub created_at: DateTime<Utc>,

    /// When the limits were last changed
    pub updated_at: DateTime<Utc>,
}

impl TenantLimits {
    /// Finds the ceilings for a tenant
    pub async fn find_by_tenant(
        pool: &PgPool,
        tenant_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let limits = sqlx::query_as::<_, TenantLimits>(
            r#"
            SELECT tenant_id, max_monitors, max_triggers, max_api_calls_per_hour,
                   max_storage_gb, created_at, updated_at
            FROM tenant_limits
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(pool)
        .await?;

        Ok(limits)
    }

    /// Creates or replaces a tenant's ceilings
    ///
    /// Tenants without a row fall back to their plan's defaults; a row is
    /// materialized when a plan changes or an operator sets custom ceilings.
    pub async fn upsert(
        pool: &PgPool,
        tenant_id: Uuid,
        max_monitors: i32,
        max_triggers: i32,
        max_api_calls_per_hour: i32,
        max_storage_gb: i32,
    ) -> Result<Self, sqlx::Error> {
        let limits = sqlx::query_as::<_, TenantLimits>(
            r#"
            INSERT INTO tenant_limits
                (tenant_id, max_monitors, max_triggers, max_api_calls_per_hour, max_storage_gb)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (tenant_id) DO UPDATE SET
                max_monitors = EXCLUDED.max_monitors,
                max_triggers = EXCLUDED.max_triggers,
                max_api_calls_per_hour = EXCLUDED.max_api_calls_per_hour,
                max_storage_gb = EXCLUDED.max_storage_gb,
                updated_at = NOW()
            RETURNING tenant_id, max_monitors, max_triggers, max_api_calls_per_hour,
                      max_storage_gb, created_at, updated_at
            "#,
        )
        .bind(tenant_id)
        .bind(max_monitors)
        .bind(max_triggers)
        .bind(max_api_calls_per_hour)
        .bind(max_storage_gb)
        .fetch_one(pool)
        .await?;

        Ok(limits)
    }
}
