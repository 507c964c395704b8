/// Trigger endpoints
///
/// Triggers are the notification channels a tenant attaches to monitor
/// activity: webhook deliveries or email. Creation is quota-gated the
/// same way monitors are.
///
/// # Endpoints
///
/// - `GET    /api/v1/triggers` - List triggers (paginated)
/// - `POST   /api/v1/triggers` - Create trigger
/// - `GET    /api/v1/triggers/:id` - Get trigger
/// - `PATCH  /api/v1/triggers/:id` - Update trigger
/// - `DELETE /api/v1/triggers/:id` - Delete trigger
/// - `POST   /api/v1/triggers/:id/test` - Queue a test delivery

use crate::{
    app::AppState,
    audit::{audit_entry, record_audit, RequestMeta},
    error::{validation_error, ApiError, ApiResult, ValidationErrorDetail},
    routes::{authorize, clamp_pagination, require_json_object, Pagination},
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
        trigger::{CreateTrigger, Trigger, TriggerKind, UpdateTrigger},
        user::UserRole,
    },
    quota::{QuotaError, QuotaType},
};

/// Trigger payload
#[derive(Debug, Clone, Serialize)]
pub struct TriggerResponse {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub kind: String,
    pub config: JsonValue,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Trigger> for TriggerResponse {
    fn from(trigger: Trigger) -> Self {
        Self {
            id: trigger.id,
            tenant_id: trigger.tenant_id,
            name: trigger.name,
            kind: trigger.kind,
            config: trigger.config,
            active: trigger.active,
            created_at: trigger.created_at,
            updated_at: trigger.updated_at,
        }
    }
}

/// List query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ListTriggersQuery {
    /// Page number (1-based)
    pub page: Option<i64>,

    /// Items per page (max 100)
    pub per_page: Option<i64>,
}

/// List triggers response
#[derive(Debug, Serialize)]
pub struct ListTriggersResponse {
    pub triggers: Vec<TriggerResponse>,
    pub pagination: Pagination,
}

/// Create trigger request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTriggerRequest {
    /// Trigger name
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    /// Channel kind: "webhook" or "email"
    pub kind: TriggerKind,

    /// Channel configuration. Webhooks need a `url` (and may carry a
    /// `secret` for signing); email needs a non-empty `recipients` list.
    pub config: JsonValue,
}

/// Update trigger request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTriggerRequest {
    /// New name
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    /// Configuration changes (merged key-by-key)
    pub config: Option<JsonValue>,

    /// Enable or disable the trigger
    pub active: Option<bool>,
}

/// Delete trigger response
#[derive(Debug, Serialize)]
pub struct DeleteTriggerResponse {
    pub deleted: bool,
}

/// Test delivery response
#[derive(Debug, Serialize)]
pub struct TestTriggerResponse {
    /// Queued background job
    pub job_id: Uuid,

    /// Job status at enqueue time
    pub status: String,
}

/// List triggers for the effective tenant
///
/// # Errors
///
/// - `401 Unauthorized`: Not authenticated
/// - `403 Forbidden`: Missing `triggers:read` scope
pub async fn list_triggers(
    State(state): State<AppState>,
    auth: AuthContext,
    ctx: TenantContext,
    Query(query): Query<ListTriggersQuery>,
) -> ApiResult<Json<ListTriggersResponse>> {
    authorize(&auth, "triggers:read", UserRole::Viewer)?;
    let tenant_id = ctx.require_tenant()?;

    let (page, per_page, offset) = clamp_pagination(query.page, query.per_page);

    let triggers = Trigger::list_by_tenant(&state.db, tenant_id, per_page, offset).await?;
    let total = Trigger::count_by_tenant(&state.db, tenant_id).await?;

    Ok(Json(ListTriggersResponse {
        triggers: triggers.into_iter().map(TriggerResponse::from).collect(),
        pagination: Pagination::new(page, per_page, total),
    }))
}

/// Create a trigger
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/triggers
/// Content-Type: application/json
///
/// {
///   "name": "Ops webhook",
///   "kind": "webhook",
///   "config": {"url": "https://ops.example.com/hooks/chainwatch", "secret": "..."}
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `403 Forbidden`: Missing role/scope, or trigger quota reached
pub async fn create_trigger(
    State(state): State<AppState>,
    auth: AuthContext,
    ctx: TenantContext,
    meta: RequestMeta,
    Json(req): Json<CreateTriggerRequest>,
) -> ApiResult<(StatusCode, Json<TriggerResponse>)> {
    authorize(&auth, "triggers:write", UserRole::Member)?;
    let tenant_id = ctx.require_tenant()?;

    req.validate().map_err(validation_error)?;
    require_json_object(Some(&req.config), "config")?;
    validate_trigger_config(req.kind, &req.config)?;

    let limits = state.quota.get_limits(tenant_id).await?;

    let created = Trigger::create(
        &state.db,
        CreateTrigger {
            tenant_id,
            name: req.name,
            kind: req.kind,
            config: req.config,
        },
        limits.max_triggers as i32,
    )
    .await?;

    let trigger = match created {
        Some(trigger) => trigger,
        None => {
            let usage = state.quota.get_usage(tenant_id).await?;
            return Err(QuotaError::LimitExceeded {
                quota_type: QuotaType::Triggers,
                limit: limits.max_triggers,
                current: usage.triggers,
            }
            .into());
        }
    };

    record_audit(
        &state.db,
        audit_entry(
            &auth,
            &ctx,
            &meta,
            "trigger.create",
            "trigger",
            Some(trigger.id.to_string()),
            json!({ "name": trigger.name, "kind": trigger.kind }),
        ),
    );

    Ok((StatusCode::CREATED, Json(TriggerResponse::from(trigger))))
}

/// Get a single trigger
///
/// # Errors
///
/// - `404 Not Found`: No such trigger in this tenant
pub async fn get_trigger(
    State(state): State<AppState>,
    auth: AuthContext,
    ctx: TenantContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TriggerResponse>> {
    authorize(&auth, "triggers:read", UserRole::Viewer)?;
    let tenant_id = ctx.require_tenant()?;

    let trigger = Trigger::find_by_id_and_tenant(&state.db, id, tenant_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Trigger not found".to_string()))?;

    Ok(Json(TriggerResponse::from(trigger)))
}

/// Update a trigger
///
/// Partial update; `config` is merged key-by-key, and the merged result
/// is re-checked against the trigger's kind.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `404 Not Found`: No such trigger in this tenant
pub async fn update_trigger(
    State(state): State<AppState>,
    auth: AuthContext,
    ctx: TenantContext,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTriggerRequest>,
) -> ApiResult<Json<TriggerResponse>> {
    authorize(&auth, "triggers:write", UserRole::Member)?;
    let tenant_id = ctx.require_tenant()?;

    req.validate().map_err(validation_error)?;
    require_json_object(req.config.as_ref(), "config")?;

    let updated = Trigger::update(
        &state.db,
        id,
        tenant_id,
        UpdateTrigger {
            name: req.name,
            config: req.config,
            active: req.active,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Trigger not found".to_string()))?;

    // The merge can only add or replace keys, but a caller could still
    // blank out the url or recipients; reject the result if so.
    if let Some(kind) = updated.get_kind() {
        validate_trigger_config(kind, &updated.config)?;
    }

    record_audit(
        &state.db,
        audit_entry(
            &auth,
            &ctx,
            &meta,
            "trigger.update",
            "trigger",
            Some(id.to_string()),
            json!({ "active": updated.active }),
        ),
    );

    Ok(Json(TriggerResponse::from(updated)))
}

/// Delete a trigger
///
/// # Errors
///
/// - `404 Not Found`: No such trigger in this tenant
pub async fn delete_trigger(
    State(state): State<AppState>,
    auth: AuthContext,
    ctx: TenantContext,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeleteTriggerResponse>> {
    authorize(&auth, "triggers:write", UserRole::Member)?;
    let tenant_id = ctx.require_tenant()?;

    let deleted = Trigger::delete(&state.db, id, tenant_id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Trigger not found".to_string()));
    }

    record_audit(
        &state.db,
        audit_entry(
            &auth,
            &ctx,
            &meta,
            "trigger.delete",
            "trigger",
            Some(id.to_string()),
            json!({}),
        ),
    );

    Ok(Json(DeleteTriggerResponse { deleted }))
}

/// Queue a test delivery for a webhook trigger
///
/// The worker POSTs a small signed payload to the configured URL so the
/// tenant can verify connectivity before wiring the trigger to a
/// monitor.
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
/// - `400 Bad Request`: Trigger is not a webhook
/// - `404 Not Found`: No such trigger in this tenant
pub async fn test_trigger(
    State(state): State<AppState>,
    auth: AuthContext,
    ctx: TenantContext,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<TestTriggerResponse>)> {
    authorize(&auth, "triggers:write", UserRole::Member)?;
    let tenant_id = ctx.require_tenant()?;

    let trigger = Trigger::find_by_id_and_tenant(&state.db, id, tenant_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Trigger not found".to_string()))?;

    if trigger.get_kind() != Some(TriggerKind::Webhook) {
        return Err(ApiError::BadRequest(
            "Test deliveries are only supported for webhook triggers".to_string(),
        ));
    }

    let job = Job::enqueue(
        &state.db,
        kinds::WEBHOOK_TEST,
        json!({
            "trigger_id": trigger.id,
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
            "trigger.test",
            "trigger",
            Some(trigger.id.to_string()),
            json!({ "job_id": job.id }),
        ),
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(TestTriggerResponse {
            job_id: job.id,
            status: job.status,
        }),
    ))
}

/// Checks that a trigger config carries what its kind needs
fn validate_trigger_config(kind: TriggerKind, config: &JsonValue) -> Result<(), ApiError> {
    let problem = match kind {
        TriggerKind::Webhook => {
            let url = config.get("url").and_then(|v| v.as_str()).unwrap_or("");
            if url.starts_with("http://") || url.starts_with("https://") {
                None
            } else {
                Some("Webhook triggers need an http(s) url in config")
            }
        }
        TriggerKind::Email => {
            let recipients = config
                .get("recipients")
                .and_then(|v| v.as_array())
                .map(|a| !a.is_empty() && a.iter().all(|r| r.as_str().is_some_and(|s| s.contains('@'))))
                .unwrap_or(false);
            if recipients {
                None
            } else {
                Some("Email triggers need a non-empty recipients list in config")
            }
        }
    };

    match problem {
        None => Ok(()),
        Some(message) => Err(ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "config".to_string(),
            message: message.to_string(),
        }])),
    }
}


// CRUD flows, quota enforcement, and test-delivery queueing are covered
// in tests/integration_test.rs.
