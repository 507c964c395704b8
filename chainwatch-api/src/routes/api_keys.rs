/// API key management endpoints
///
/// Keys authenticate machines against the tenant that issued them. The
/// plaintext key is returned exactly once, at creation; afterwards only
/// the prefix and last four characters are visible.
///
/// Creating and revoking keys is session work gated on the Admin role,
/// so a leaked key cannot be used to mint more keys.
///
/// # Endpoints
///
/// - `POST   /api/v1/api-keys` - Create API key (Admin)
/// - `GET    /api/v1/api-keys` - List API keys (masked)
/// - `DELETE /api/v1/api-keys/:id` - Revoke API key (Admin)

use crate::{
    app::AppState,
    audit::{audit_entry, record_audit, RequestMeta},
    error::{validation_error, ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use chainwatch_shared::{
    auth::{
        api_key as api_key_util,
        context::{AuthContext, TenantContext},
    },
    models::{
        api_key::{ApiKey, CreateApiKey},
        user::UserRole,
    },
};

/// Create API key request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateApiKeyRequest {
    /// Key name/description
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    /// Comma-separated scopes (e.g., "monitors:read,monitors:write")
    ///
    /// Available scopes:
    /// - `*`: All permissions
    /// - `monitors:*` / `monitors:read` / `monitors:write`
    /// - `triggers:*` / `triggers:read` / `triggers:write`
    /// - `networks:read`
    /// - `audit:read`
    #[validate(length(min = 1, message = "At least one scope is required"))]
    pub scopes: String,

    /// Optional expiration date (ISO 8601)
    pub expires_at: Option<DateTime<Utc>>,
}

/// Create API key response
#[derive(Debug, Serialize)]
pub struct CreateApiKeyResponse {
    /// API key ID
    pub id: Uuid,

    /// The plaintext API key (ONLY returned on creation)
    ///
    /// This is the only time the plaintext key is shown. It cannot be
    /// retrieved later; only its hash is stored.
    pub key: String,

    /// Key name
    pub name: String,

    /// Scopes
    pub scopes: Vec<String>,

    /// Created at
    pub created_at: DateTime<Utc>,

    /// Expires at
    pub expires_at: Option<DateTime<Utc>>,
}

/// API key list item (masked)
#[derive(Debug, Serialize)]
pub struct ApiKeyListItem {
    /// API key ID
    pub id: Uuid,

    /// Key name
    pub name: String,

    /// First characters of the issued key
    pub key_prefix: String,

    /// Last four characters of the issued key
    pub last_four: String,

    /// Scopes
    pub scopes: Vec<String>,

    /// Whether the key is revoked
    pub revoked: bool,

    /// How many requests the key has authenticated
    pub usage_count: i64,

    /// Created at
    pub created_at: DateTime<Utc>,

    /// Last used at
    pub last_used_at: Option<DateTime<Utc>>,

    /// Expires at
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<ApiKey> for ApiKeyListItem {
    fn from(key: ApiKey) -> Self {
        Self {
            id: key.id,
            name: key.name,
            key_prefix: key.key_prefix,
            last_four: key.last_four,
            scopes: key.scopes,
            revoked: key.revoked,
            usage_count: key.usage_count,
            created_at: key.created_at,
            last_used_at: key.last_used_at,
            expires_at: key.expires_at,
        }
    }
}

/// List API keys response
#[derive(Debug, Serialize)]
pub struct ListApiKeysResponse {
    /// API keys, newest first
    pub keys: Vec<ApiKeyListItem>,
}

/// Revoke API key response
#[derive(Debug, Serialize)]
pub struct RevokeApiKeyResponse {
    /// Whether the key was revoked by this call
    pub revoked: bool,
}

/// Create an API key
///
/// Returns the plaintext key exactly once.
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/api-keys
/// Authorization: Bearer <jwt_token>
/// Content-Type: application/json
///
/// {
///   "name": "Deploy pipeline",
///   "scopes": "monitors:read,monitors:write",
///   "expires_at": "2026-01-01T00:00:00Z"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, or expiry in the past
/// - `401 Unauthorized`: Not authenticated
/// - `403 Forbidden`: Caller is not an admin, or is an API key
pub async fn create_api_key(
    State(state): State<AppState>,
    auth: AuthContext,
    ctx: TenantContext,
    meta: RequestMeta,
    Json(req): Json<CreateApiKeyRequest>,
) -> ApiResult<(StatusCode, Json<CreateApiKeyResponse>)> {
    if !auth.has_role(UserRole::Admin) {
        return Err(ApiError::Forbidden(
            "Creating API keys requires the admin role".to_string(),
        ));
    }

    req.validate().map_err(validation_error)?;

    let scopes = api_key_util::parse_scopes(&req.scopes);
    if scopes.is_empty() {
        return Err(ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "scopes".to_string(),
            message: "At least one scope is required".to_string(),
        }]));
    }

    if let Some(expires_at) = req.expires_at {
        if expires_at <= Utc::now() {
            return Err(ApiError::ValidationError(vec![ValidationErrorDetail {
                field: "expires_at".to_string(),
                message: "Expiration must be in the future".to_string(),
            }]));
        }
    }

    let tenant_id = ctx.require_tenant()?;
    let user_id = auth
        .user_id
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;

    let (api_key, plaintext_key) = ApiKey::create(
        &state.db,
        CreateApiKey {
            tenant_id,
            user_id,
            name: req.name,
            scopes,
            expires_at: req.expires_at,
        },
    )
    .await?;

    record_audit(
        &state.db,
        audit_entry(
            &auth,
            &ctx,
            &meta,
            "api_key.create",
            "api_key",
            Some(api_key.id.to_string()),
            json!({ "name": api_key.name, "scopes": api_key.scopes }),
        ),
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateApiKeyResponse {
            id: api_key.id,
            key: plaintext_key,
            name: api_key.name,
            scopes: api_key.scopes,
            created_at: api_key.created_at,
            expires_at: api_key.expires_at,
        }),
    ))
}

/// List the tenant's API keys, masked
///
/// # Endpoint
///
/// ```text
/// GET /api/v1/api-keys
/// Authorization: Bearer <jwt_token>
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Not authenticated
pub async fn list_api_keys(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> ApiResult<Json<ListApiKeysResponse>> {
    let tenant_id = ctx.require_tenant()?;
    let api_keys = ApiKey::list_by_tenant(&state.db, tenant_id).await?;

    let keys = api_keys.into_iter().map(ApiKeyListItem::from).collect();

    Ok(Json(ListApiKeysResponse { keys }))
}

/// Revoke an API key
///
/// Revocation is permanent; a revoked key never authenticates again.
///
/// # Endpoint
///
/// ```text
/// DELETE /api/v1/api-keys/:id
/// Authorization: Bearer <jwt_token>
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Not authenticated
/// - `403 Forbidden`: Caller is not an admin
/// - `404 Not Found`: No such key in this tenant
pub async fn revoke_api_key(
    State(state): State<AppState>,
    auth: AuthContext,
    ctx: TenantContext,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RevokeApiKeyResponse>> {
    if !auth.has_role(UserRole::Admin) {
        return Err(ApiError::Forbidden(
            "Revoking API keys requires the admin role".to_string(),
        ));
    }

    let tenant_id = ctx.require_tenant()?;
    let revoked = ApiKey::revoke(&state.db, id, tenant_id).await?;

    if !revoked {
        return Err(ApiError::NotFound("API key not found".to_string()));
    }

    record_audit(
        &state.db,
        audit_entry(
            &auth,
            &ctx,
            &meta,
            "api_key.revoke",
            "api_key",
            Some(id.to_string()),
            json!({}),
        ),
    );

    Ok(Json(RevokeApiKeyResponse { revoked }))
}

// Integration tests covering key creation, masking, and revocation are
// in tests/integration_test.rs.
