/// Monitor endpoints
///
/// Monitors are the tenant-facing core of the product: a named set of
/// addresses watched on one network. All operations are tenant scoped;
/// creation is gated by the tenant's monitor quota inside the inserting
/// statement so concurrent requests cannot overshoot the ceiling.
///
/// The default first page of the list is cached; every mutation
/// invalidates the affected entries.
///
/// # Endpoints
///
/// - `GET    /api/v1/monitors` - List monitors (paginated, filterable)
/// - `POST   /api/v1/monitors` - Create monitor
/// - `GET    /api/v1/monitors/:id` - Get monitor
/// - `PATCH  /api/v1/monitors/:id` - Update monitor
/// - `DELETE /api/v1/monitors/:id` - Delete monitor
/// - `POST   /api/v1/monitors/:id/sync` - Request an out-of-band sync

use crate::{
    app::AppState,
    audit::{audit_entry, record_audit, RequestMeta},
    error::{validation_error, ApiError, ApiResult},
    routes::{authorize, clamp_pagination, require_json_object, Pagination, DEFAULT_PER_PAGE},
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
    auth::context::{AuthContext, TenantContext},
    models::{
        job::{kinds, Job},
        monitor::{CreateMonitor, Monitor, MonitorFilter, UpdateMonitor},
        network::Network,
        user::UserRole,
    },
    quota::{QuotaError, QuotaType},
    redis::cache::{monitor_key, monitor_list_key, LIST_TTL_SECS, MONITOR_TTL_SECS},
};

/// Monitor payload returned by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorResponse {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub network_id: Uuid,
    pub name: String,
    pub addresses: Vec<String>,
    pub paused: bool,
    pub config: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Monitor> for MonitorResponse {
    fn from(monitor: Monitor) -> Self {
        Self {
            id: monitor.id,
            tenant_id: monitor.tenant_id,
            network_id: monitor.network_id,
            name: monitor.name,
            addresses: monitor.addresses,
            paused: monitor.paused,
            config: monitor.config,
            created_at: monitor.created_at,
            updated_at: monitor.updated_at,
        }
    }
}

/// List query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ListMonitorsQuery {
    /// Page number (1-based)
    pub page: Option<i64>,

    /// Items per page (max 100)
    pub per_page: Option<i64>,

    /// Only monitors on this network
    #[serde(alias = "network")]
    pub network_id: Option<Uuid>,

    /// Only paused (true) or running (false) monitors
    pub paused: Option<bool>,
}

/// List monitors response
#[derive(Debug, Serialize, Deserialize)]
pub struct ListMonitorsResponse {
    pub monitors: Vec<MonitorResponse>,
    pub pagination: Pagination,
}

/// Create monitor request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMonitorRequest {
    /// Monitor name
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    /// Network to watch, by id
    pub network_id: Option<Uuid>,

    /// Network to watch, by slug (used when `network_id` is absent)
    pub network_slug: Option<String>,

    /// Addresses to watch
    #[validate(length(min = 1, max = 100, message = "Provide 1-100 addresses"))]
    pub addresses: Vec<String>,

    /// Monitor-specific configuration
    pub config: Option<JsonValue>,
}

/// Update monitor request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateMonitorRequest {
    /// New name
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    /// Replace the watched address set
    #[validate(length(min = 1, max = 100, message = "Provide 1-100 addresses"))]
    pub addresses: Option<Vec<String>>,

    /// Pause or resume the monitor
    pub paused: Option<bool>,

    /// Configuration changes (merged key-by-key into the current config)
    pub config: Option<JsonValue>,
}

/// Delete monitor response
#[derive(Debug, Serialize)]
pub struct DeleteMonitorResponse {
    pub deleted: bool,
}

/// Sync request response
#[derive(Debug, Serialize)]
pub struct SyncMonitorResponse {
    /// Queued background job
    pub job_id: Uuid,

    /// Job status at enqueue time
    pub status: String,
}

/// List monitors for the effective tenant
///
/// # Endpoint
///
/// ```text
/// GET /api/v1/monitors?page=1&per_page=20&network_id=...&paused=false
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Not authenticated
/// - `403 Forbidden`: Missing `monitors:read` scope
pub async fn list_monitors(
    State(state): State<AppState>,
    auth: AuthContext,
    ctx: TenantContext,
    Query(query): Query<ListMonitorsQuery>,
) -> ApiResult<Json<ListMonitorsResponse>> {
    authorize(&auth, "monitors:read", UserRole::Viewer)?;
    let tenant_id = ctx.require_tenant()?;

    let (page, per_page, offset) = clamp_pagination(query.page, query.per_page);
    let filter = MonitorFilter {
        network_id: query.network_id,
        paused: query.paused,
    };

    // Only the default first page is cached; filtered and deep pages go
    // straight to the database.
    let cacheable = page == 1
        && per_page == DEFAULT_PER_PAGE
        && filter.network_id.is_none()
        && filter.paused.is_none();

    if cacheable {
        if let Some(cache) = &state.cache {
            match cache
                .get_json::<ListMonitorsResponse>(&monitor_list_key(tenant_id))
                .await
            {
                Ok(Some(cached)) => return Ok(Json(cached)),
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "Monitor list cache read failed"),
            }
        }
    }

    let monitors = Monitor::list_by_tenant(&state.db, tenant_id, filter, per_page, offset).await?;
    let total = Monitor::count_by_tenant(&state.db, tenant_id, filter).await?;

    let response = ListMonitorsResponse {
        monitors: monitors.into_iter().map(MonitorResponse::from).collect(),
        pagination: Pagination::new(page, per_page, total),
    };

    if cacheable {
        if let Some(cache) = &state.cache {
            if let Err(e) = cache
                .set_json(&monitor_list_key(tenant_id), &response, LIST_TTL_SECS)
                .await
            {
                tracing::debug!(error = %e, "Monitor list cache write failed");
            }
        }
    }

    Ok(Json(response))
}

/// Create a monitor
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/monitors
/// Content-Type: application/json
///
/// {
///   "name": "Treasury watch",
///   "network_slug": "ethereum-mainnet",
///   "addresses": ["0x742d35Cc6634C0532925a3b844Bc454e4438f44e"],
///   "config": {"confirmations": 12}
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, or the network is inactive
/// - `403 Forbidden`: Missing role/scope, or monitor quota reached
/// - `404 Not Found`: Unknown network
pub async fn create_monitor(
    State(state): State<AppState>,
    auth: AuthContext,
    ctx: TenantContext,
    meta: RequestMeta,
    Json(req): Json<CreateMonitorRequest>,
) -> ApiResult<(StatusCode, Json<MonitorResponse>)> {
    authorize(&auth, "monitors:write", UserRole::Member)?;
    let tenant_id = ctx.require_tenant()?;

    req.validate().map_err(validation_error)?;
    require_json_object(req.config.as_ref(), "config")?;

    let network = resolve_network(&state, req.network_id, req.network_slug.as_deref()).await?;
    if !network.active {
        return Err(ApiError::BadRequest(format!(
            "Network '{}' is not active",
            network.slug
        )));
    }

    let limits = state.quota.get_limits(tenant_id).await?;

    let created = Monitor::create(
        &state.db,
        CreateMonitor {
            tenant_id,
            network_id: network.id,
            name: req.name,
            addresses: req.addresses,
            config: req.config.unwrap_or_else(|| json!({})),
        },
        limits.max_monitors as i32,
    )
    .await?;

    let monitor = match created {
        Some(monitor) => monitor,
        None => {
            let usage = state.quota.get_usage(tenant_id).await?;
            return Err(QuotaError::LimitExceeded {
                quota_type: QuotaType::Monitors,
                limit: limits.max_monitors,
                current: usage.monitors,
            }
            .into());
        }
    };

    invalidate_monitor_cache(&state, tenant_id, monitor.id).await;

    record_audit(
        &state.db,
        audit_entry(
            &auth,
            &ctx,
            &meta,
            "monitor.create",
            "monitor",
            Some(monitor.id.to_string()),
            json!({ "name": monitor.name, "network_id": monitor.network_id }),
        ),
    );

    Ok((StatusCode::CREATED, Json(MonitorResponse::from(monitor))))
}

/// Get a single monitor
///
/// # Errors
///
/// - `404 Not Found`: No such monitor in this tenant
pub async fn get_monitor(
    State(state): State<AppState>,
    auth: AuthContext,
    ctx: TenantContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MonitorResponse>> {
    authorize(&auth, "monitors:read", UserRole::Viewer)?;
    let tenant_id = ctx.require_tenant()?;

    if let Some(cache) = &state.cache {
        match cache.get_json::<MonitorResponse>(&monitor_key(id)).await {
            // A cached monitor from another tenant is treated as a miss;
            // isolation wins over cache hits.
            Ok(Some(cached)) if cached.tenant_id == tenant_id => return Ok(Json(cached)),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Monitor cache read failed"),
        }
    }

    let monitor = Monitor::find_by_id_and_tenant(&state.db, id, tenant_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Monitor not found".to_string()))?;

    let response = MonitorResponse::from(monitor);

    if let Some(cache) = &state.cache {
        if let Err(e) = cache
            .set_json(&monitor_key(id), &response, MONITOR_TTL_SECS)
            .await
        {
            tracing::debug!(error = %e, "Monitor cache write failed");
        }
    }

    Ok(Json(response))
}

/// Update a monitor
///
/// Partial update: absent fields keep their values; `config` is merged
/// key-by-key rather than replaced.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `403 Forbidden`: Missing role/scope
/// - `404 Not Found`: No such monitor in this tenant
pub async fn update_monitor(
    State(state): State<AppState>,
    auth: AuthContext,
    ctx: TenantContext,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateMonitorRequest>,
) -> ApiResult<Json<MonitorResponse>> {
    authorize(&auth, "monitors:write", UserRole::Member)?;
    let tenant_id = ctx.require_tenant()?;

    req.validate().map_err(validation_error)?;
    require_json_object(req.config.as_ref(), "config")?;

    let updated = Monitor::update(
        &state.db,
        id,
        tenant_id,
        UpdateMonitor {
            name: req.name,
            addresses: req.addresses,
            paused: req.paused,
            config: req.config,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Monitor not found".to_string()))?;

    invalidate_monitor_cache(&state, tenant_id, id).await;

    record_audit(
        &state.db,
        audit_entry(
            &auth,
            &ctx,
            &meta,
            "monitor.update",
            "monitor",
            Some(id.to_string()),
            json!({ "paused": updated.paused }),
        ),
    );

    Ok(Json(MonitorResponse::from(updated)))
}

/// Delete a monitor
///
/// Triggers attached to the monitor are removed with it.
///
/// # Errors
///
/// - `403 Forbidden`: Missing role/scope
/// - `404 Not Found`: No such monitor in this tenant
pub async fn delete_monitor(
    State(state): State<AppState>,
    auth: AuthContext,
    ctx: TenantContext,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeleteMonitorResponse>> {
    authorize(&auth, "monitors:write", UserRole::Member)?;
    let tenant_id = ctx.require_tenant()?;

    let deleted = Monitor::delete(&state.db, id, tenant_id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Monitor not found".to_string()));
    }

    invalidate_monitor_cache(&state, tenant_id, id).await;

    record_audit(
        &state.db,
        audit_entry(
            &auth,
            &ctx,
            &meta,
            "monitor.delete",
            "monitor",
            Some(id.to_string()),
            json!({}),
        ),
    );

    Ok(Json(DeleteMonitorResponse { deleted }))
}

/// Request an out-of-band sync of a monitor
///
/// Queues a background job that re-walks the monitor's addresses
/// against the network; returns immediately with the job id. This
/// endpoint carries its own strict rate limit.
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/monitors/:id/sync
/// ```
///
/// # Response
///
/// `202 Accepted` with:
///
/// ```json
/// {
///   "job_id": "uuid",
///   "status": "queued"
/// }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: Missing role/scope
/// - `404 Not Found`: No such monitor in this tenant
pub async fn sync_monitor(
    State(state): State<AppState>,
    auth: AuthContext,
    ctx: TenantContext,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<SyncMonitorResponse>)> {
    authorize(&auth, "monitors:write", UserRole::Member)?;
    let tenant_id = ctx.require_tenant()?;

    let monitor = Monitor::find_by_id_and_tenant(&state.db, id, tenant_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Monitor not found".to_string()))?;

    let job = Job::enqueue(
        &state.db,
        kinds::MONITOR_SYNC,
        json!({
            "monitor_id": monitor.id,
            "tenant_id": tenant_id,
            "requested_by": auth.user_id,
        }),
    )
    .await?;

    record_audit(
        &state.db,
        audit_entry(
            &auth,
            &ctx,
            &meta,
            "monitor.sync",
            "monitor",
            Some(monitor.id.to_string()),
            json!({ "job_id": job.id }),
        ),
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(SyncMonitorResponse {
            job_id: job.id,
            status: job.status,
        }),
    ))
}

/// Resolves the target network from id or slug
async fn resolve_network(
    state: &AppState,
    network_id: Option<Uuid>,
    network_slug: Option<&str>,
) -> ApiResult<Network> {
    let network = match (network_id, network_slug) {
        (Some(id), _) => Network::find_by_id(&state.db, id).await?,
        (None, Some(slug)) => Network::find_by_slug(&state.db, slug).await?,
        (None, None) => {
            return Err(ApiError::BadRequest(
                "Either network_id or network_slug is required".to_string(),
            ))
        }
    };

    network.ok_or_else(|| ApiError::NotFound("Network not found".to_string()))
}

/// Drops the cache entries a monitor mutation invalidates
async fn invalidate_monitor_cache(state: &AppState, tenant_id: Uuid, monitor_id: Uuid) {
    if let Some(cache) = &state.cache {
        if let Err(e) = cache.invalidate_monitor(tenant_id, monitor_id).await {
            tracing::warn!(
                tenant_id = %tenant_id,
                monitor_id = %monitor_id,
                error = %e,
                "Monitor cache invalidation failed"
            );
        }
    }
}

// Integration tests covering quota enforcement, pagination, and cache
// invalidation are in tests/integration_test.rs.
