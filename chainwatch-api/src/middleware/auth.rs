/// Authentication middleware
///
/// Resolves the caller's credential into an [`AuthContext`] before any
/// tenant or rate limit decision runs. Credential sources are checked
/// in order:
///
/// 1. `Authorization: Bearer <jwt>` (user sessions)
/// 2. `X-API-Key` header
/// 3. `api_key` query parameter (for integrations that cannot set headers)
///
/// API keys are narrowed by prefix and last four characters, then each
/// candidate's hash is compared in constant time. Expired keys get a
/// distinct message so callers know to rotate rather than retry.
///
/// On success the tenant that owns the credential is loaded (cache
/// first), suspended tenants are refused with 403, and both the
/// [`AuthContext`] and the [`Tenant`] land in request extensions for
/// downstream layers and handlers.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use chainwatch_shared::auth::api_key::{
    extract_last_four, extract_prefix, validate_api_key_format, verify_api_key,
};
use chainwatch_shared::auth::context::AuthContext;
use chainwatch_shared::auth::jwt::validate_access_token;
use chainwatch_shared::models::api_key::ApiKey;
use chainwatch_shared::models::tenant::Tenant;
use chainwatch_shared::redis::cache::{tenant_key, TENANT_TTL_SECS};

use crate::app::AppState;
use crate::error::ApiError;

use super::query_param;

/// Requires a valid credential; rejects the request otherwise
///
/// # Errors
///
/// - 401 Unauthorized: missing, malformed, invalid, or expired credential
/// - 403 Forbidden: valid credential but the tenant is suspended
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = match authenticate(&state, &req).await? {
        Some(auth) => auth,
        None => return Err(ApiError::Unauthorized("Authentication required".to_string())),
    };

    let tenant = load_tenant(&state, auth.tenant_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Tenant not found".to_string()))?;

    if tenant.is_suspended() {
        return Err(ApiError::Forbidden("Tenant account is suspended".to_string()));
    }

    req.extensions_mut().insert(auth.clone());
    req.extensions_mut().insert(tenant);

    let mut response = next.run(req).await;

    // The request log runs outside this layer and reads attribution
    // from the response.
    response.extensions_mut().insert(auth);

    Ok(response)
}

/// Authenticates when a credential is present, stays anonymous otherwise
///
/// Invalid credentials are swallowed rather than rejected; routes using
/// this layer (documentation, for one) decide visibility themselves and
/// must not leak whether a credential was close.
pub async fn optional_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    if let Ok(Some(auth)) = authenticate(&state, &req).await {
        let tenant = match load_tenant(&state, auth.tenant_id).await {
            Ok(Some(tenant)) if !tenant.is_suspended() => Some(tenant),
            _ => None,
        };

        if let Some(tenant) = tenant {
            req.extensions_mut().insert(auth.clone());
            req.extensions_mut().insert(tenant);

            let mut response = next.run(req).await;
            response.extensions_mut().insert(auth);
            return response;
        }
    }

    next.run(req).await
}

/// Resolves a credential from the request, if any
///
/// Request reads happen before the returned future is built: the request
/// body type is not `Sync`, so capturing `&Request` across an await would
/// make the future non-`Send` and unusable under `middleware::from_fn`.
fn authenticate<'a>(
    state: &'a AppState,
    req: &Request,
) -> impl std::future::Future<Output = Result<Option<AuthContext>, ApiError>> + Send + 'a {
    let bearer = bearer_token(req.headers()).map(str::to_string);
    let api_key = api_key_credential(req);

    async move {
        if let Some(token) = bearer {
            let claims = validate_access_token(&token, &state.config.jwt.secret)?;
            return Ok(Some(AuthContext::from_jwt(&claims)));
        }

        if let Some(key) = api_key {
            let auth = authenticate_api_key(state, &key).await?;
            return Ok(Some(auth));
        }

        Ok(None)
    }
}

/// Extracts a bearer token from the Authorization header
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|v| !v.is_empty())
}

/// Extracts an API key from the header or the query string
///
/// Issued keys contain only URL-safe characters, so the query value
/// needs no decoding.
fn api_key_credential(req: &Request) -> Option<String> {
    req.headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| query_param(req.uri().query(), "api_key"))
}

/// Verifies a presented API key against stored candidates
async fn authenticate_api_key(state: &AppState, key: &str) -> Result<AuthContext, ApiError> {
    if !validate_api_key_format(key) {
        return Err(ApiError::Unauthorized("Invalid API key format".to_string()));
    }

    let prefix = extract_prefix(key);
    let last_four = extract_last_four(key);

    let candidates = ApiKey::find_candidates(&state.db, &prefix, &last_four).await?;

    // Every candidate hash gets the same constant-time comparison, so
    // timing reveals nothing about how close a guess was.
    let mut matched = None;
    for candidate in candidates {
        if verify_api_key(key, &candidate.key_hash) && matched.is_none() {
            matched = Some(candidate);
        }
    }

    let matched = match matched {
        Some(matched) => matched,
        None => return Err(ApiError::Unauthorized("Invalid API key".to_string())),
    };

    if matched.is_expired() {
        tracing::info!(api_key_id = %matched.id, "Rejected expired API key");
        return Err(ApiError::Unauthorized("API key has expired".to_string()));
    }

    // Usage tracking is best effort; a failed counter update must not
    // fail the request.
    if let Err(e) = ApiKey::record_usage(&state.db, matched.id).await {
        tracing::warn!(api_key_id = %matched.id, error = %e, "Failed to record API key usage");
    }

    Ok(AuthContext::from_api_key(&matched))
}

/// Loads a tenant, consulting the cache before the database
pub(crate) async fn load_tenant(
    state: &AppState,
    tenant_id: Uuid,
) -> Result<Option<Tenant>, ApiError> {
    if let Some(cache) = &state.cache {
        match cache.get_json::<Tenant>(&tenant_key(tenant_id)).await {
            Ok(Some(tenant)) => return Ok(Some(tenant)),
            Ok(None) => {}
            Err(e) => tracing::warn!(tenant_id = %tenant_id, error = %e, "Tenant cache read failed"),
        }
    }

    let tenant = Tenant::find_by_id(&state.db, tenant_id).await?;

    if let (Some(cache), Some(tenant)) = (&state.cache, &tenant) {
        if let Err(e) = cache
            .set_json(&tenant_key(tenant_id), tenant, TENANT_TTL_SECS)
            .await
        {
            tracing::debug!(tenant_id = %tenant_id, error = %e, "Tenant cache write failed");
        }
    }

    Ok(tenant)
}
