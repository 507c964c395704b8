/// Authentication endpoints
///
/// This module provides account authentication:
/// - Registration (new tenant + owner account)
/// - Login
/// - Token refresh
/// - Current session lookup
///
/// # Endpoints
///
/// - `POST /api/v1/auth/register` - Register a tenant and its owner
/// - `POST /api/v1/auth/login` - Login and get tokens
/// - `POST /api/v1/auth/refresh` - Refresh access token
/// - `GET  /api/v1/auth/me` - Current user (session only)

use crate::{
    app::AppState,
    audit::{record_audit, RequestMeta},
    error::{validation_error, ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use chainwatch_shared::{
    auth::{
        context::{AuthContext, AuthMethod},
        jwt, password,
    },
    models::{
        audit::CreateAuditEntry,
        tenant::{CreateTenant, Tenant, TenantPlan},
        user::{CreateUser, User, UserRole},
    },
};

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Organization name
    #[validate(length(min = 1, max = 100, message = "Tenant name must be 1-100 characters"))]
    pub tenant_name: String,

    /// Optional URL-safe identifier; derived from the name when absent
    #[validate(length(max = 50, message = "Slug must be at most 50 characters"))]
    pub tenant_slug: Option<String>,

    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (also checked for strength)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Optional display name
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub display_name: Option<String>,
}

/// Register response
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    /// User ID
    pub user_id: Uuid,

    /// Tenant ID
    pub tenant_id: Uuid,

    /// Tenant slug as stored
    pub tenant_slug: String,

    /// Access token
    pub access_token: String,

    /// Refresh token
    pub refresh_token: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// User ID
    pub user_id: Uuid,

    /// Tenant ID
    pub tenant_id: Uuid,

    /// Access token
    pub access_token: String,

    /// Refresh token
    pub refresh_token: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token
    pub access_token: String,
}

/// User payload without credential material
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub role: String,
    pub is_superuser: bool,
    pub active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            tenant_id: user.tenant_id,
            email: user.email,
            display_name: user.display_name,
            role: user.role,
            is_superuser: user.is_superuser,
            active: user.active,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

/// Derives a URL-safe slug from a display name
///
/// Lowercases, maps runs of non-alphanumeric characters to single
/// hyphens, and trims hyphens from the ends.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_hyphen = true;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }

    slug.truncate(50);
    while slug.ends_with('-') {
        slug.pop();
    }

    slug
}

/// Register a new tenant and its owner account
///
/// The tenant starts on the free plan; the registering user becomes
/// its owner.
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/auth/register
/// Content-Type: application/json
///
/// {
///   "tenant_name": "Acme Labs",
///   "email": "ops@acme.example",
///   "password": "SecureP@ss123"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `409 Conflict`: Email or slug already taken
pub async fn register(
    State(state): State<AppState>,
    meta: RequestMeta,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<RegisterResponse>> {
    req.validate().map_err(validation_error)?;

    password::validate_password_strength(&req.password).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password".to_string(),
            message: e,
        }])
    })?;

    let slug = slugify(req.tenant_slug.as_deref().unwrap_or(&req.tenant_name));
    if slug.is_empty() {
        return Err(ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "tenant_slug".to_string(),
            message: "Slug must contain at least one alphanumeric character".to_string(),
        }]));
    }

    if Tenant::find_by_slug(&state.db, &slug).await?.is_some() {
        return Err(ApiError::Conflict(format!(
            "A tenant with slug '{}' already exists",
            slug
        )));
    }

    let password_hash = password::hash_password(&req.password)?;

    let tenant = Tenant::create(
        &state.db,
        CreateTenant {
            name: req.tenant_name.clone(),
            slug,
            plan: TenantPlan::Free,
        },
    )
    .await?;

    let user = User::create(
        &state.db,
        CreateUser {
            tenant_id: tenant.id,
            email: req.email,
            password_hash,
            display_name: req.display_name,
            role: UserRole::Owner,
        },
    )
    .await?;

    let access_claims = jwt::Claims::new(user.id, tenant.id, &user.role, false, jwt::TokenType::Access);
    let refresh_claims =
        jwt::Claims::new(user.id, tenant.id, &user.role, false, jwt::TokenType::Refresh);

    let access_token = jwt::create_token(&access_claims, state.jwt_secret())?;
    let refresh_token = jwt::create_token(&refresh_claims, state.jwt_secret())?;

    record_audit(
        &state.db,
        CreateAuditEntry {
            tenant_id: tenant.id,
            actor_id: Some(user.id),
            action: "auth.register".to_string(),
            resource_type: "tenant".to_string(),
            resource_id: Some(tenant.id.to_string()),
            target_tenant_id: None,
            details: json!({ "slug": tenant.slug }),
            client_ip: meta.client_ip,
            user_agent: meta.user_agent,
            request_id: meta.request_id,
        },
    );

    Ok(Json(RegisterResponse {
        user_id: user.id,
        tenant_id: tenant.id,
        tenant_slug: tenant.slug,
        access_token,
        refresh_token,
    }))
}

/// Login with email and password
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/auth/login
/// Content-Type: application/json
///
/// {
///   "email": "ops@acme.example",
///   "password": "SecureP@ss123"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: Invalid credentials
/// - `403 Forbidden`: Account deactivated
pub async fn login(
    State(state): State<AppState>,
    meta: RequestMeta,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.validate().map_err(validation_error)?;

    // One message for both unknown email and wrong password, so the
    // endpoint does not confirm which addresses have accounts.
    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    if !user.active {
        return Err(ApiError::Forbidden("Account is deactivated".to_string()));
    }

    User::update_last_login(&state.db, user.id).await?;

    let access_claims = jwt::Claims::new(
        user.id,
        user.tenant_id,
        &user.role,
        user.is_superuser,
        jwt::TokenType::Access,
    );
    let refresh_claims = jwt::Claims::new(
        user.id,
        user.tenant_id,
        &user.role,
        user.is_superuser,
        jwt::TokenType::Refresh,
    );

    let access_token = jwt::create_token(&access_claims, state.jwt_secret())?;
    let refresh_token = jwt::create_token(&refresh_claims, state.jwt_secret())?;

    record_audit(
        &state.db,
        CreateAuditEntry {
            tenant_id: user.tenant_id,
            actor_id: Some(user.id),
            action: "auth.login".to_string(),
            resource_type: "user".to_string(),
            resource_id: Some(user.id.to_string()),
            target_tenant_id: None,
            details: json!({}),
            client_ip: meta.client_ip,
            user_agent: meta.user_agent,
            request_id: meta.request_id,
        },
    );

    Ok(Json(LoginResponse {
        user_id: user.id,
        tenant_id: user.tenant_id,
        access_token,
        refresh_token,
    }))
}

/// Exchange a refresh token for a new access token
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/auth/refresh
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let access_token = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;

    Ok(Json(RefreshResponse { access_token }))
}

/// Current user for the active session
///
/// Session only: API keys authenticate a tenant, not a person, so
/// there is no "current user" to return for them.
///
/// # Endpoint
///
/// ```text
/// GET /api/v1/auth/me
/// Authorization: Bearer <token>
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Not authenticated
/// - `403 Forbidden`: API key auth instead of a session
/// - `404 Not Found`: Account no longer exists
pub async fn me(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<UserResponse>> {
    if auth.method != AuthMethod::Jwt {
        return Err(ApiError::Forbidden(
            "This endpoint requires a user session".to_string(),
        ));
    }

    let user_id = auth
        .user_id
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;

    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from(user)))
}
