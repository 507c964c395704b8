/// Quota enforcement for multi-tenant resource limits
///
/// This module provides quota enforcement based on tenant billing plans.
/// Quotas are enforced on:
/// - Monitors per tenant
/// - Triggers per tenant
///
/// Rate limiting (requests per hour) also derives its tier from the plan
/// table here, but is applied by the API rate-limit middleware against
/// Redis rather than by the enforcer.
///
/// # Quota Limits by Plan
///
/// **Free Plan:**
/// - Monitors: 10
/// - Triggers: 20
/// - API calls per hour: 1,000
/// - Storage: 1 GB
/// - Rate tier: 100 requests/hour
///
/// **Starter Plan:**
/// - Monitors: 50
/// - Triggers: 100
/// - API calls per hour: 10,000
/// - Storage: 10 GB
/// - Rate tier: 500 requests/hour
///
/// **Pro Plan:**
/// - Monitors: 200
/// - Triggers: 500
/// - API calls per hour: 100,000
/// - Storage: 100 GB
/// - Rate tier: 1,000 requests/hour
///
/// **Enterprise Plan:**
/// - Monitors: 1,000
/// - Triggers: 2,000
/// - API calls per hour: 1,000,000
/// - Storage: 1,000 GB
/// - Rate tier: 10,000 requests/hour
///
/// A row in `tenant_limits` overrides the plan ceilings for one tenant
/// (negotiated contracts); the rate tier always follows the plan.
///
/// # Example
///
/// ```no_run
/// use chainwatch_shared::quota::{QuotaEnforcer, QuotaType};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, tenant_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let enforcer = QuotaEnforcer::new(pool);
///
/// // Check if tenant can create another monitor
/// if !enforcer.check(tenant_id, QuotaType::Monitors).await?.allowed {
///     return Err("Monitor limit exceeded".into());
/// }
///
/// // Create monitor...
///
/// # Ok(())
/// # }
/// ```

use crate::models::tenant::{Tenant, TenantLimits, TenantPlan};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use uuid::Uuid;

/// Requests per hour granted to unauthenticated clients
pub const ANONYMOUS_RATE_LIMIT: u32 = 50;

/// Requests per hour granted to superusers regardless of plan
pub const SUPERUSER_RATE_LIMIT: u32 = 10_000;

/// Default rate-limit window length in seconds
pub const DEFAULT_RATE_PERIOD_SECS: u64 = 3600;

/// Quota enforcement error
#[derive(Debug)]
pub enum QuotaError {
    /// Quota limit exceeded
    LimitExceeded {
        quota_type: QuotaType,
        limit: u32,
        current: u32,
    },

    /// Database error
    DatabaseError(sqlx::Error),

    /// Tenant not found
    TenantNotFound(Uuid),
}

impl fmt::Display for QuotaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotaError::LimitExceeded {
                quota_type,
                limit,
                current,
            } => write!(
                f,
                "{} limit exceeded ({}/{})",
                quota_type.as_str(),
                current,
                limit
            ),
            QuotaError::DatabaseError(err) => write!(f, "Database error: {}", err),
            QuotaError::TenantNotFound(id) => write!(f, "Tenant not found: {}", id),
        }
    }
}

impl std::error::Error for QuotaError {}

impl From<sqlx::Error> for QuotaError {
    fn from(err: sqlx::Error) -> Self {
        QuotaError::DatabaseError(err)
    }
}

/// Type of quota to check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaType {
    /// Maximum monitors per tenant
    Monitors,

    /// Maximum triggers per tenant
    Triggers,
}

impl QuotaType {
    /// Human-readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            QuotaType::Monitors => "Monitors",
            QuotaType::Triggers => "Triggers",
        }
    }
}

/// Resource ceilings for a billing plan
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlanLimits {
    /// Maximum monitors per tenant
    pub max_monitors: u32,

    /// Maximum triggers per tenant
    pub max_triggers: u32,

    /// Maximum API calls per hour
    pub max_api_calls_per_hour: u32,

    /// Maximum storage in gigabytes
    pub max_storage_gb: u32,

    /// Requests per hour the rate limiter grants this plan
    pub rate_limit_per_hour: u32,
}

impl PlanLimits {
    /// Gets the ceilings for a tenant plan
    pub fn for_plan(plan: TenantPlan) -> Self {
        match plan {
            TenantPlan::Free => PlanLimits {
                max_monitors: 10,
                max_triggers: 20,
                max_api_calls_per_hour: 1_000,
                max_storage_gb: 1,
                rate_limit_per_hour: 100,
            },
            TenantPlan::Starter => PlanLimits {
                max_monitors: 50,
                max_triggers: 100,
                max_api_calls_per_hour: 10_000,
                max_storage_gb: 10,
                rate_limit_per_hour: 500,
            },
            TenantPlan::Pro => PlanLimits {
                max_monitors: 200,
                max_triggers: 500,
                max_api_calls_per_hour: 100_000,
                max_storage_gb: 100,
                rate_limit_per_hour: 1_000,
            },
            TenantPlan::Enterprise => PlanLimits {
                max_monitors: 1_000,
                max_triggers: 2_000,
                max_api_calls_per_hour: 1_000_000,
                max_storage_gb: 1_000,
                rate_limit_per_hour: 10_000,
            },
        }
    }

    /// Gets the ceiling for a specific quota type
    pub fn get(&self, quota_type: QuotaType) -> u32 {
        match quota_type {
            QuotaType::Monitors => self.max_monitors,
            QuotaType::Triggers => self.max_triggers,
        }
    }
}

/// Result of a quota check
#[derive(Debug, Clone, Serialize)]
pub struct QuotaCheckResult {
    /// Whether the request is within quota
    pub allowed: bool,

    /// Current usage
    pub current: u32,

    /// Maximum allowed
    pub limit: u32,

    /// Remaining quota
    pub remaining: u32,
}

impl QuotaCheckResult {
    /// Creates a result indicating quota is available
    pub fn allowed(current: u32, limit: u32) -> Self {
        QuotaCheckResult {
            allowed: true,
            current,
            limit,
            remaining: limit.saturating_sub(current),
        }
    }

    /// Creates a result indicating quota is exceeded
    pub fn exceeded(current: u32, limit: u32) -> Self {
        QuotaCheckResult {
            allowed: false,
            current,
            limit,
            remaining: 0,
        }
    }
}

/// Live resource usage for a tenant
///
/// Counted from the owning tables on demand, never persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TenantUsage {
    /// Monitors currently defined
    pub monitors: u32,

    /// Triggers currently defined
    pub triggers: u32,
}

/// Quota enforcement service
///
/// Checks resource usage against plan-based limits, honoring per-tenant
/// overrides from `tenant_limits`. Cheap to clone; all clones share the
/// underlying pool.
#[derive(Clone)]
pub struct QuotaEnforcer {
    db: PgPool,
}

impl QuotaEnforcer {
    /// Creates a new quota enforcer
    pub fn new(db: PgPool) -> Self {
        QuotaEnforcer { db }
    }

    /// Checks if a tenant is within quota for a specific resource
    ///
    /// # Arguments
    ///
    /// * `tenant_id` - Tenant to check
    /// * `quota_type` - Type of quota to check
    ///
    /// # Returns
    ///
    /// Result with quota status
    ///
    /// # Errors
    ///
    /// Returns error if database query fails or tenant not found
    pub async fn check(
        &self,
        tenant_id: Uuid,
        quota_type: QuotaType,
    ) -> Result<QuotaCheckResult, QuotaError> {
        let limits = self.get_limits(tenant_id).await?;
        let limit = limits.get(quota_type);

        let current = match quota_type {
            QuotaType::Monitors => self.count_monitors(tenant_id).await?,
            QuotaType::Triggers => self.count_triggers(tenant_id).await?,
        };

        if current >= limit {
            Ok(QuotaCheckResult::exceeded(current, limit))
        } else {
            Ok(QuotaCheckResult::allowed(current, limit))
        }
    }

    /// Enforces quota with an error on limit exceeded
    ///
    /// Convenience method that returns an error if quota is exceeded.
    ///
    /// # Errors
    ///
    /// Returns `QuotaError::LimitExceeded` if quota is exceeded
    pub async fn enforce(
        &self,
        tenant_id: Uuid,
        quota_type: QuotaType,
    ) -> Result<(), QuotaError> {
        let result = self.check(tenant_id, quota_type).await?;

        if !result.allowed {
            return Err(QuotaError::LimitExceeded {
                quota_type,
                limit: result.limit,
                current: result.current,
            });
        }

        Ok(())
    }

    /// Gets the effective ceilings for a tenant
    ///
    /// Plan defaults come from the tier table, replaced by the tenant's
    /// `tenant_limits` row where one exists. The rate tier always follows
    /// the plan.
    ///
    /// # Errors
    ///
    /// Returns error if database query fails or tenant not found
    pub async fn get_limits(&self, tenant_id: Uuid) -> Result<PlanLimits, QuotaError> {
        let tenant = Tenant::find_by_id(&self.db, tenant_id)
            .await?
            .ok_or(QuotaError::TenantNotFound(tenant_id))?;

        let plan = tenant.get_plan().unwrap_or(TenantPlan::Free);
        let mut limits = PlanLimits::for_plan(plan);

        if let Some(row) = TenantLimits::find_by_tenant(&self.db, tenant_id).await? {
            limits.max_monitors = row.max_monitors.max(0) as u32;
            limits.max_triggers = row.max_triggers.max(0) as u32;
            limits.max_api_calls_per_hour = row.max_api_calls_per_hour.max(0) as u32;
            limits.max_storage_gb = row.max_storage_gb.max(0) as u32;
        }

        Ok(limits)
    }

    /// Gets live usage counts for a tenant
    ///
    /// # Errors
    ///
    /// Returns error if database queries fail
    pub async fn get_usage(&self, tenant_id: Uuid) -> Result<TenantUsage, QuotaError> {
        Ok(TenantUsage {
            monitors: self.count_monitors(tenant_id).await?,
            triggers: self.count_triggers(tenant_id).await?,
        })
    }

    /// Counts monitors defined by a tenant
    async fn count_monitors(&self, tenant_id: Uuid) -> Result<u32, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM monitors
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .fetch_one(&self.db)
        .await?;

        Ok(count as u32)
    }

    /// Counts triggers defined by a tenant
    async fn count_triggers(&self, tenant_id: Uuid) -> Result<u32, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM triggers
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .fetch_one(&self.db)
        .await?;

        Ok(count as u32)
    }
}
