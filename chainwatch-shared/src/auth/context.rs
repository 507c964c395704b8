/// Request-scoped authentication and tenant context
///
/// Middleware in the API crate validates credentials and inserts these
/// types into request extensions; handlers extract them with Axum's
/// extractor mechanism. Both are per-request values, dropped with the
/// request, never global.
///
/// # Example
///
/// ```no_run
/// use chainwatch_shared::auth::context::{AuthContext, TenantContext};
///
/// async fn handler(auth: AuthContext, tenant: TenantContext) -> String {
///     format!("tenant {:?} via {:?}", tenant.tenant_id, auth.method)
/// }
/// ```

use axum::{extract::FromRequestParts, http::request::Parts, http::StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::api_key;
use super::jwt::Claims;
use crate::models::api_key::ApiKey;
use crate::models::user::UserRole;

/// Authentication method used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// JWT token authentication
    Jwt,

    /// API key authentication
    ApiKey,
}

/// Authentication context added to request extensions
///
/// Handlers can extract it directly as an argument or through Axum's
/// `Extension` extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID (the issuing user for API keys)
    pub user_id: Option<Uuid>,

    /// Home tenant ID of the credential
    pub tenant_id: Uuid,

    /// Authentication method used
    pub method: AuthMethod,

    /// API key scopes, e.g. ["monitors:read", "triggers:*"] (only for
    /// API key auth)
    pub scopes: Option<Vec<String>>,

    /// API key ID (only for API key auth)
    pub api_key_id: Option<Uuid>,

    /// Tenant role (only for JWT auth)
    pub role: Option<UserRole>,

    /// Platform operator flag. Never set by API key auth: keys
    /// authenticate the tenant, not the operator.
    pub is_superuser: bool,
}

impl AuthContext {
    /// Creates auth context from validated JWT claims
    pub fn from_jwt(claims: &Claims) -> Self {
        Self {
            user_id: Some(claims.sub),
            tenant_id: claims.tenant_id,
            method: AuthMethod::Jwt,
            scopes: None,
            api_key_id: None,
            role: UserRole::from_str(&claims.role),
            is_superuser: claims.is_superuser,
        }
    }

    /// Creates auth context from a validated API key
    pub fn from_api_key(key: &ApiKey) -> Self {
        Self {
            user_id: Some(key.user_id),
            tenant_id: key.tenant_id,
            method: AuthMethod::ApiKey,
            scopes: Some(key.scopes.clone()),
            api_key_id: Some(key.id),
            role: None,
            is_superuser: false,
        }
    }

    /// Checks if this context grants a specific scope
    ///
    /// JWT sessions have full access; API keys are checked against
    /// their scope list (with `*` wildcards).
    pub fn has_scope(&self, required_scope: &str) -> bool {
        match self.method {
            AuthMethod::Jwt => true,
            AuthMethod::ApiKey => match &self.scopes {
                Some(scopes) => api_key::has_scope(scopes, required_scope),
                None => false,
            },
        }
    }

    /// Checks if this context carries at least the given tenant role
    ///
    /// Superusers pass every role check. API key contexts carry no
    /// role and fail all role checks; role-gated operations are
    /// session-only.
    pub fn has_role(&self, required: UserRole) -> bool {
        if self.is_superuser {
            return true;
        }

        match self.role {
            Some(role) => role.has_permission(required),
            None => false,
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or((StatusCode::UNAUTHORIZED, "Not authenticated"))
    }
}

/// Error type for tenant-context resolution
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TenantAccessError {
    /// A tenant override was supplied by a caller not allowed to use it
    #[error("Tenant override not permitted")]
    OverrideForbidden,

    /// The operation needs a concrete tenant but none is in scope
    #[error("No tenant context available")]
    MissingTenant,
}

/// Effective tenant scope for the current request
///
/// Built by the tenant middleware from the [`AuthContext`] and any
/// `X-Tenant-ID` header / `tenant_id` query override. Tenant-scoped
/// queries bind `tenant_id`; `bypass_rls` marks superuser requests
/// that see all tenants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantContext {
    /// Effective tenant ID (None for anonymous callers). For a
    /// superuser without an override this is their home tenant, but
    /// `bypass_rls` tells handlers to skip tenant filters entirely.
    pub tenant_id: Option<Uuid>,

    /// Whether the caller is a platform operator
    pub is_superuser: bool,

    /// Superuser with no override: tenant filters are skipped
    pub bypass_rls: bool,

    /// Whether a cross-tenant override was applied
    pub overridden: bool,
}

impl TenantContext {
    /// Context for unauthenticated requests
    pub fn anonymous() -> Self {
        Self {
            tenant_id: None,
            is_superuser: false,
            bypass_rls: false,
            overridden: false,
        }
    }

    /// Resolves the effective tenant scope
    ///
    /// Override rules:
    /// - Anonymous callers may not request a tenant.
    /// - Non-superusers may only "request" their own tenant; anything
    ///   else is rejected.
    /// - Superusers with an override are pinned to that tenant.
    /// - Superusers without an override bypass tenant filtering.
    ///
    /// # Errors
    ///
    /// Returns `TenantAccessError::OverrideForbidden` when a
    /// disallowed override is supplied
    pub fn resolve(
        auth: Option<&AuthContext>,
        requested: Option<Uuid>,
    ) -> Result<Self, TenantAccessError> {
        let auth = match auth {
            Some(auth) => auth,
            None => {
                if requested.is_some() {
                    return Err(TenantAccessError::OverrideForbidden);
                }
                return Ok(Self::anonymous());
            }
        };

        if auth.is_superuser {
            return Ok(match requested {
                Some(tenant_id) => Self {
                    tenant_id: Some(tenant_id),
                    is_superuser: true,
                    bypass_rls: false,
                    overridden: true,
                },
                None => Self {
                    tenant_id: Some(auth.tenant_id),
                    is_superuser: true,
                    bypass_rls: true,
                    overridden: false,
                },
            });
        }

        if let Some(tenant_id) = requested {
            if tenant_id != auth.tenant_id {
                return Err(TenantAccessError::OverrideForbidden);
            }
        }

        Ok(Self {
            tenant_id: Some(auth.tenant_id),
            is_superuser: false,
            bypass_rls: false,
            overridden: false,
        })
    }

    /// Returns the effective tenant ID, or an error when the request
    /// has no tenant in scope
    pub fn require_tenant(&self) -> Result<Uuid, TenantAccessError> {
        self.tenant_id.ok_or(TenantAccessError::MissingTenant)
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .ok_or((StatusCode::FORBIDDEN, "Tenant context unavailable"))
    }
}
