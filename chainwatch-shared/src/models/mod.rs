/// Database models for Chainwatch
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `tenant`: Customer accounts, plans, and per-tenant limit overrides
/// - `user`: User accounts scoped to a tenant
/// - `api_key`: API keys for programmatic access
/// - `network`: Blockchain networks monitors can watch
/// - `monitor`: Address watchers owned by a tenant
/// - `trigger`: Notification channels fired by monitors
/// - `audit`: Append-only audit trail of mutating actions
/// - `job`: Postgres-backed background work queue
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
/// let new_tenant = CreateTenant {
///     name: "Acme Corp".to_string(),
///     slug: "acme-corp".to_string(),
///     plan: TenantPlan::Starter,
/// };
///
/// let tenant = Tenant::create(&pool, new_tenant).await?;
/// # Ok(())
/// # }
/// ```

pub mod api_key;
pub mod audit;
pub mod job;
pub mod monitor;
pub mod network;
pub mod tenant;
pub mod trigger;
pub mod user;
