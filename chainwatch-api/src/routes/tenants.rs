/// Tenant endpoints
///
/// Split in two surfaces: self-service under `/tenants/me` for the
/// caller's own tenant, and platform administration under `/tenants`
/// for superusers. Any mutation here invalidates the cached tenant
/// record so the auth middleware sees the change on the next request;
/// suspension in particular must not keep serving from a stale cache.
///
/// # Endpoints
///
/// - `GET   /api/v1/tenants/me` - Own tenant with usage and ceilings
/// - `PATCH /api/v1/tenants/me` - Rename / adjust settings (admin role)
/// - `GET   /api/v1/tenants` - List tenants (superuser)
/// - `POST  /api/v1/tenants` - Create tenant (superuser)
/// - `PATCH /api/v1/tenants/:id` - Update tenant, incl. plan (superuser)
/// - `POST  /api/v1/tenants/:id/suspend` - Suspend (superuser)
/// - `POST  /api/v1/tenants/:id/reactivate` - Reactivate (superuser)

use crate::{
    app::AppState,
    audit::{audit_entry, record_audit, RequestMeta},
    error::{validation_error, ApiError, ApiResult},
    routes::{auth::slugify, clamp_pagination, require_json_object, require_superuser, Pagination},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;
use validator::Validate;

use chainwatch_shared::{
    auth::context::{AuthContext, AuthMethod, TenantContext},
    models::{
        tenant::{CreateTenant, Tenant, TenantLimits, TenantPlan, UpdateTenant},
        user::UserRole,
    },
    quota::PlanLimits,
    redis::cache::tenant_key,
};

/// Tenant payload
#[derive(Debug, Clone, Serialize)]
pub struct TenantResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub plan: String,
    pub active: bool,
    pub settings: JsonValue,
    pub suspended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Tenant> for TenantResponse {
    fn from(tenant: Tenant) -> Self {
        Self {
            id: tenant.id,
            name: tenant.name,
            slug: tenant.slug,
            plan: tenant.plan,
            active: tenant.active,
            settings: tenant.settings,
            suspended_at: tenant.suspended_at,
            created_at: tenant.created_at,
            updated_at: tenant.updated_at,
        }
    }
}

/// Current resource consumption
#[derive(Debug, Serialize)]
pub struct UsageBlock {
    pub monitors: u32,
    pub triggers: u32,
}

/// Effective ceilings for the tenant's plan (or custom overrides)
#[derive(Debug, Serialize)]
pub struct LimitsBlock {
    pub max_monitors: u32,
    pub max_triggers: u32,
    pub max_api_calls_per_hour: u32,
    pub max_storage_gb: u32,
    pub rate_limit_per_hour: u32,
}

impl From<PlanLimits> for LimitsBlock {
    fn from(limits: PlanLimits) -> Self {
        Self {
            max_monitors: limits.max_monitors,
            max_triggers: limits.max_triggers,
            max_api_calls_per_hour: limits.max_api_calls_per_hour,
            max_storage_gb: limits.max_storage_gb,
            rate_limit_per_hour: limits.rate_limit_per_hour,
        }
    }
}

/// Own-tenant response with usage against ceilings
#[derive(Debug, Serialize)]
pub struct TenantProfileResponse {
    pub tenant: TenantResponse,
    pub usage: UsageBlock,
    pub limits: LimitsBlock,
}

/// Self-service update request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateMyTenantRequest {
    /// New display name
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    /// Settings changes (merged key-by-key)
    pub settings: Option<JsonValue>,
}

/// List query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ListTenantsQuery {
    /// Page number (1-based)
    pub page: Option<i64>,

    /// Items per page (max 100)
    pub per_page: Option<i64>,
}

/// List tenants response
#[derive(Debug, Serialize)]
pub struct ListTenantsResponse {
    pub tenants: Vec<TenantResponse>,
    pub pagination: Pagination,
}

/// Platform tenant creation request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTenantRequest {
    /// Display name
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    /// URL-safe identifier; derived from the name when absent
    #[validate(length(max = 50, message = "Slug must be at most 50 characters"))]
    pub slug: Option<String>,

    /// Plan tier (defaults to free)
    pub plan: Option<TenantPlan>,
}

/// Platform tenant update request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTenantRequest {
    /// New display name
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    /// New plan tier; resets the tenant's ceilings to the plan defaults
    pub plan: Option<TenantPlan>,

    /// Settings changes (merged key-by-key)
    pub settings: Option<JsonValue>,
}

/// Get the caller's tenant
///
/// Returns the tenant record together with current usage and the
/// effective ceilings, so dashboards can render quota bars from one
/// call. Open to any authenticated caller on the tenant.
///
/// # Endpoint
///
/// ```text
/// GET /api/v1/tenants/me
/// ```
///
/// # Response
///
/// ```json
/// {
///   "tenant": {"id": "...", "name": "...", "plan": "pro", ...},
///   "usage": {"monitors": 12, "triggers": 4},
///   "limits": {"max_monitors": 50, "max_triggers": 100, ...}
/// }
/// ```
pub async fn get_my_tenant(
    State(state): State<AppState>,
    _auth: AuthContext,
    ctx: TenantContext,
) -> ApiResult<Json<TenantProfileResponse>> {
    let tenant_id = ctx.require_tenant()?;

    let tenant = Tenant::find_by_id(&state.db, tenant_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tenant not found".to_string()))?;

    let usage = state.quota.get_usage(tenant_id).await?;
    let limits = state.quota.get_limits(tenant_id).await?;

    Ok(Json(TenantProfileResponse {
        tenant: TenantResponse::from(tenant),
        usage: UsageBlock {
            monitors: usage.monitors,
            triggers: usage.triggers,
        },
        limits: LimitsBlock::from(limits),
    }))
}

/// Update the caller's tenant
///
/// Name and settings only; plan changes go through the platform
/// surface. Requires an admin session, not an API key.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `403 Forbidden`: API key caller, or session below admin
pub async fn update_my_tenant(
    State(state): State<AppState>,
    auth: AuthContext,
    ctx: TenantContext,
    meta: RequestMeta,
    Json(req): Json<UpdateMyTenantRequest>,
) -> ApiResult<Json<TenantResponse>> {
    if auth.method != AuthMethod::Jwt {
        return Err(ApiError::Forbidden(
            "This endpoint requires a user session".to_string(),
        ));
    }
    if !auth.has_role(UserRole::Admin) {
        return Err(ApiError::Forbidden(
            "Updating the tenant requires the admin role".to_string(),
        ));
    }

    let tenant_id = ctx.require_tenant()?;

    req.validate().map_err(validation_error)?;
    require_json_object(req.settings.as_ref(), "settings")?;

    let updated = Tenant::update(
        &state.db,
        tenant_id,
        UpdateTenant {
            name: req.name,
            plan: None,
            settings: req.settings,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Tenant not found".to_string()))?;

    invalidate_tenant_cache(&state, tenant_id).await;

    record_audit(
        &state.db,
        audit_entry(
            &auth,
            &ctx,
            &meta,
            "tenant.update",
            "tenant",
            Some(tenant_id.to_string()),
            json!({ "name": updated.name }),
        ),
    );

    Ok(Json(TenantResponse::from(updated)))
}

/// List all tenants
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a superuser
pub async fn list_tenants(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<ListTenantsQuery>,
) -> ApiResult<Json<ListTenantsResponse>> {
    require_superuser(&auth)?;

    let (page, per_page, offset) = clamp_pagination(query.page, query.per_page);

    let tenants = Tenant::list(&state.db, per_page, offset).await?;
    let total = Tenant::count(&state.db).await?;

    Ok(Json(ListTenantsResponse {
        tenants: tenants.into_iter().map(TenantResponse::from).collect(),
        pagination: Pagination::new(page, per_page, total),
    }))
}

/// Create a tenant without self-registration
///
/// Used for sales-led onboarding; no user account is created, the
/// tenant invites its owner separately.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `403 Forbidden`: Caller is not a superuser
/// - `409 Conflict`: Slug already taken
pub async fn create_tenant(
    State(state): State<AppState>,
    auth: AuthContext,
    ctx: TenantContext,
    meta: RequestMeta,
    Json(req): Json<CreateTenantRequest>,
) -> ApiResult<(StatusCode, Json<TenantResponse>)> {
    require_superuser(&auth)?;
    req.validate().map_err(validation_error)?;

    let slug = slugify(req.slug.as_deref().unwrap_or(&req.name));
    if slug.is_empty() {
        return Err(validation_error_for_slug());
    }

    if Tenant::find_by_slug(&state.db, &slug).await?.is_some() {
        return Err(ApiError::Conflict(format!(
            "A tenant with slug '{}' already exists",
            slug
        )));
    }

    let tenant = Tenant::create(
        &state.db,
        CreateTenant {
            name: req.name,
            slug,
            plan: req.plan.unwrap_or(TenantPlan::Free),
        },
    )
    .await?;

    let mut entry = audit_entry(
        &auth,
        &ctx,
        &meta,
        "tenant.create",
        "tenant",
        Some(tenant.id.to_string()),
        json!({ "slug": tenant.slug, "plan": tenant.plan }),
    );
    entry.tenant_id = tenant.id;
    entry.target_tenant_id = Some(tenant.id);
    record_audit(&state.db, entry);

    Ok((StatusCode::CREATED, Json(TenantResponse::from(tenant))))
}

/// Update any tenant
///
/// A plan change also rewrites the tenant's `tenant_limits` row to the
/// new plan's defaults, dropping any custom ceilings.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `403 Forbidden`: Caller is not a superuser
/// - `404 Not Found`: Unknown tenant
pub async fn update_tenant(
    State(state): State<AppState>,
    auth: AuthContext,
    ctx: TenantContext,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTenantRequest>,
) -> ApiResult<Json<TenantResponse>> {
    require_superuser(&auth)?;
    req.validate().map_err(validation_error)?;
    require_json_object(req.settings.as_ref(), "settings")?;

    let plan_change = req.plan;

    let updated = Tenant::update(
        &state.db,
        id,
        UpdateTenant {
            name: req.name,
            plan: req.plan,
            settings: req.settings,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Tenant not found".to_string()))?;

    if let Some(plan) = plan_change {
        let defaults = PlanLimits::for_plan(plan);
        TenantLimits::upsert(
            &state.db,
            id,
            defaults.max_monitors as i32,
            defaults.max_triggers as i32,
            defaults.max_api_calls_per_hour as i32,
            defaults.max_storage_gb as i32,
        )
        .await?;
    }

    invalidate_tenant_cache(&state, id).await;

    let mut entry = audit_entry(
        &auth,
        &ctx,
        &meta,
        "tenant.update",
        "tenant",
        Some(id.to_string()),
        json!({ "plan": updated.plan }),
    );
    entry.tenant_id = id;
    entry.target_tenant_id = Some(id);
    record_audit(&state.db, entry);

    Ok(Json(TenantResponse::from(updated)))
}

/// Suspend a tenant
///
/// All of the tenant's credentials fail authentication until
/// reactivation. Idempotent.
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a superuser
/// - `404 Not Found`: Unknown tenant
pub async fn suspend_tenant(
    State(state): State<AppState>,
    auth: AuthContext,
    ctx: TenantContext,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TenantResponse>> {
    require_superuser(&auth)?;

    let tenant = Tenant::suspend(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tenant not found".to_string()))?;

    invalidate_tenant_cache(&state, id).await;

    tracing::info!(tenant_id = %id, operator = ?auth.user_id, "Tenant suspended");

    let mut entry = audit_entry(
        &auth,
        &ctx,
        &meta,
        "tenant.suspend",
        "tenant",
        Some(id.to_string()),
        json!({}),
    );
    entry.tenant_id = id;
    entry.target_tenant_id = Some(id);
    record_audit(&state.db, entry);

    Ok(Json(TenantResponse::from(tenant)))
}

/// Reactivate a suspended tenant
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a superuser
/// - `404 Not Found`: Unknown tenant
pub async fn reactivate_tenant(
    State(state): State<AppState>,
    auth: AuthContext,
    ctx: TenantContext,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TenantResponse>> {
    require_superuser(&auth)?;

    let tenant = Tenant::reactivate(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tenant not found".to_string()))?;

    invalidate_tenant_cache(&state, id).await;

    tracing::info!(tenant_id = %id, operator = ?auth.user_id, "Tenant reactivated");

    let mut entry = audit_entry(
        &auth,
        &ctx,
        &meta,
        "tenant.reactivate",
        "tenant",
        Some(id.to_string()),
        json!({}),
    );
    entry.tenant_id = id;
    entry.target_tenant_id = Some(id);
    record_audit(&state.db, entry);

    Ok(Json(TenantResponse::from(tenant)))
}

fn validation_error_for_slug() -> ApiError {
    ApiError::ValidationError(vec![crate::error::ValidationErrorDetail {
        field: "slug".to_string(),
        message: "Slug must contain at least one alphanumeric character".to_string(),
    }])
}

/// Drops the cached tenant record after a mutation
///
/// The auth middleware serves tenants from this cache; a stale entry
/// would let a suspended tenant keep authenticating until the TTL runs
/// out.
async fn invalidate_tenant_cache(state: &AppState, tenant_id: Uuid) {
    if let Some(cache) = &state.cache {
        if let Err(e) = cache.delete(&tenant_key(tenant_id)).await {
            tracing::warn!(tenant_id = %tenant_id, error = %e, "Tenant cache invalidation failed");
        }
    }
}

// Suspension taking effect on the next request, plan-change limit
// resets, and the superuser gate are covered in tests/integration_test.rs.
