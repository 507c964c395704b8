/// Network catalog endpoints
///
/// Networks are platform-wide, not tenant-scoped: every tenant sees the
/// same active set, and only superusers can change it. The active list
/// is cached because every monitor creation resolves against it.
///
/// # Endpoints
///
/// - `GET    /api/v1/networks` - List networks
/// - `POST   /api/v1/networks` - Register a network (superuser)
/// - `PATCH  /api/v1/networks/:id` - Update a network (superuser)
/// - `DELETE /api/v1/networks/:id` - Remove a network (superuser)

use crate::{
    app::AppState,
    audit::{audit_entry, record_audit, RequestMeta},
    error::{validation_error, ApiError, ApiResult, ValidationErrorDetail},
    routes::{authorize, require_superuser},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use chainwatch_shared::{
    auth::context::{AuthContext, TenantContext},
    models::{
        network::{CreateNetwork, Network, UpdateNetwork},
        user::UserRole,
    },
    redis::cache::{network_list_key, NETWORK_TTL_SECS},
};

/// Network payload
///
/// The RPC endpoint stays server-side; tenants only ever see the
/// catalog metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkResponse {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub chain_id: i64,
    pub block_time_ms: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Network> for NetworkResponse {
    fn from(network: Network) -> Self {
        Self {
            id: network.id,
            slug: network.slug,
            name: network.name,
            chain_id: network.chain_id,
            block_time_ms: network.block_time_ms,
            active: network.active,
            created_at: network.created_at,
            updated_at: network.updated_at,
        }
    }
}

/// List query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ListNetworksQuery {
    /// Include inactive networks (superuser only; ignored otherwise)
    pub include_inactive: Option<bool>,
}

/// List networks response
#[derive(Debug, Serialize, Deserialize)]
pub struct ListNetworksResponse {
    pub networks: Vec<NetworkResponse>,
}

/// Register network request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateNetworkRequest {
    /// URL-safe identifier, e.g. "ethereum-mainnet"
    #[validate(length(min = 1, max = 50, message = "Slug must be 1-50 characters"))]
    pub slug: String,

    /// Display name
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    /// Chain id
    pub chain_id: i64,

    /// RPC endpoint for the ingest side
    #[validate(url(message = "rpc_url must be a valid URL"))]
    pub rpc_url: String,

    /// Expected block interval in milliseconds
    pub block_time_ms: Option<i32>,
}

/// Update network request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateNetworkRequest {
    /// New display name
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    /// New RPC endpoint
    #[validate(url(message = "rpc_url must be a valid URL"))]
    pub rpc_url: Option<String>,

    /// New block interval in milliseconds
    pub block_time_ms: Option<i32>,

    /// Enable or disable the network
    pub active: Option<bool>,
}

/// Delete network response
#[derive(Debug, Serialize)]
pub struct DeleteNetworkResponse {
    pub deleted: bool,
}

/// List networks
///
/// Tenants see active networks only; a superuser can pass
/// `include_inactive=true` to see the full catalog.
///
/// # Endpoint
///
/// ```text
/// GET /api/v1/networks
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Not authenticated
/// - `403 Forbidden`: Missing `networks:read` scope
pub async fn list_networks(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<ListNetworksQuery>,
) -> ApiResult<Json<ListNetworksResponse>> {
    authorize(&auth, "networks:read", UserRole::Viewer)?;

    if query.include_inactive == Some(true) && auth.is_superuser {
        let networks = Network::list_all(&state.db).await?;
        return Ok(Json(ListNetworksResponse {
            networks: networks.into_iter().map(NetworkResponse::from).collect(),
        }));
    }

    if let Some(cache) = &state.cache {
        match cache
            .get_json::<ListNetworksResponse>(&network_list_key())
            .await
        {
            Ok(Some(cached)) => return Ok(Json(cached)),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Network list cache read failed"),
        }
    }

    let networks = Network::list_active(&state.db).await?;
    let response = ListNetworksResponse {
        networks: networks.into_iter().map(NetworkResponse::from).collect(),
    };

    if let Some(cache) = &state.cache {
        if let Err(e) = cache
            .set_json(&network_list_key(), &response, NETWORK_TTL_SECS)
            .await
        {
            tracing::debug!(error = %e, "Network list cache write failed");
        }
    }

    Ok(Json(response))
}

/// Register a network
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/networks
/// Content-Type: application/json
///
/// {
///   "slug": "base-mainnet",
///   "name": "Base",
///   "chain_id": 8453,
///   "rpc_url": "https://mainnet.base.org",
///   "block_time_ms": 2000
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `403 Forbidden`: Caller is not a superuser
/// - `409 Conflict`: Slug already taken
pub async fn create_network(
    State(state): State<AppState>,
    auth: AuthContext,
    ctx: TenantContext,
    meta: RequestMeta,
    Json(req): Json<CreateNetworkRequest>,
) -> ApiResult<(StatusCode, Json<NetworkResponse>)> {
    require_superuser(&auth)?;
    req.validate().map_err(validation_error)?;
    validate_slug(&req.slug)?;

    if Network::find_by_slug(&state.db, &req.slug).await?.is_some() {
        return Err(ApiError::Conflict(format!(
            "A network with slug '{}' already exists",
            req.slug
        )));
    }

    let network = Network::create(
        &state.db,
        CreateNetwork {
            slug: req.slug,
            name: req.name,
            chain_id: req.chain_id,
            rpc_url: req.rpc_url,
            block_time_ms: req.block_time_ms.unwrap_or(12_000),
        },
    )
    .await?;

    invalidate_network_cache(&state).await;

    record_audit(
        &state.db,
        audit_entry(
            &auth,
            &ctx,
            &meta,
            "network.create",
            "network",
            Some(network.id.to_string()),
            json!({ "slug": network.slug, "chain_id": network.chain_id }),
        ),
    );

    Ok((StatusCode::CREATED, Json(NetworkResponse::from(network))))
}

/// Update a network
///
/// The slug and chain id are immutable; deactivating a network hides it
/// from tenants and blocks new monitors, but existing monitors keep
/// their reference.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `403 Forbidden`: Caller is not a superuser
/// - `404 Not Found`: Unknown network
pub async fn update_network(
    State(state): State<AppState>,
    auth: AuthContext,
    ctx: TenantContext,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateNetworkRequest>,
) -> ApiResult<Json<NetworkResponse>> {
    require_superuser(&auth)?;
    req.validate().map_err(validation_error)?;

    let updated = Network::update(
        &state.db,
        id,
        UpdateNetwork {
            name: req.name,
            rpc_url: req.rpc_url,
            block_time_ms: req.block_time_ms,
            active: req.active,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Network not found".to_string()))?;

    invalidate_network_cache(&state).await;

    record_audit(
        &state.db,
        audit_entry(
            &auth,
            &ctx,
            &meta,
            "network.update",
            "network",
            Some(id.to_string()),
            json!({ "active": updated.active }),
        ),
    );

    Ok(Json(NetworkResponse::from(updated)))
}

/// Remove a network
///
/// Fails while monitors still reference it; deactivate first and let
/// tenants migrate.
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a superuser
/// - `404 Not Found`: Unknown network
/// - `409 Conflict`: Monitors still reference the network
pub async fn delete_network(
    State(state): State<AppState>,
    auth: AuthContext,
    ctx: TenantContext,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeleteNetworkResponse>> {
    require_superuser(&auth)?;

    let deleted = match Network::delete(&state.db, id).await {
        Ok(deleted) => deleted,
        // The monitors table holds a RESTRICT foreign key on network_id.
        Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
            return Err(ApiError::Conflict(
                "Network still has monitors attached".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    if !deleted {
        return Err(ApiError::NotFound("Network not found".to_string()));
    }

    invalidate_network_cache(&state).await;

    record_audit(
        &state.db,
        audit_entry(
            &auth,
            &ctx,
            &meta,
            "network.delete",
            "network",
            Some(id.to_string()),
            json!({}),
        ),
    );

    Ok(Json(DeleteNetworkResponse { deleted }))
}

/// Slug shape check for admin-supplied slugs
fn validate_slug(slug: &str) -> Result<(), ApiError> {
    let well_formed = slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !slug.starts_with('-')
        && !slug.ends_with('-');

    if well_formed {
        Ok(())
    } else {
        Err(ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "slug".to_string(),
            message: "Slug may only contain lowercase letters, digits, and hyphens".to_string(),
        }]))
    }
}

/// Drops the cached network list after a catalog change
async fn invalidate_network_cache(state: &AppState) {
    if let Some(cache) = &state.cache {
        if let Err(e) = cache.delete(&network_list_key()).await {
            tracing::warn!(error = %e, "Network list cache invalidation failed");
        }
    }
}


// Superuser gating and cache behavior are covered end-to-end in
// tests/integration_test.rs.
