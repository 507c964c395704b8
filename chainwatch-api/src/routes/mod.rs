/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `docs`: API reference page and OpenAPI document
/// - `auth`: Authentication endpoints (register, login, refresh, me)
/// - `api_keys`: API key management
/// - `tenants`: Tenant self-service and platform administration
/// - `networks`: Supported blockchain networks
/// - `monitors`: Address monitors
/// - `triggers`: Notification triggers
/// - `audit`: Audit log access

pub mod api_keys;
pub mod audit;
pub mod auth;
pub mod docs;
pub mod health;
pub mod monitors;
pub mod networks;
pub mod tenants;
pub mod triggers;

use serde::{Deserialize, Serialize};

use chainwatch_shared::auth::context::{AuthContext, AuthMethod};
use chainwatch_shared::models::user::UserRole;

use crate::error::{ApiError, ValidationErrorDetail};

/// Default page size for list endpoints
pub const DEFAULT_PER_PAGE: i64 = 20;

/// Largest page size a client may request
pub const MAX_PER_PAGE: i64 = 100;

/// Pagination block embedded in list responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    /// Current page (1-based)
    pub page: i64,

    /// Items per page
    pub per_page: i64,

    /// Total matching items
    pub total: i64,

    /// Total pages at this page size
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + per_page - 1) / per_page
        };

        Self {
            page,
            per_page,
            total,
            total_pages,
        }
    }
}

/// Clamps client pagination input to sane bounds
///
/// Pages below 1 become 1; page sizes are forced into 1..=100 with a
/// default of 20. Returns `(page, per_page, offset)`.
pub(crate) fn clamp_pagination(page: Option<i64>, per_page: Option<i64>) -> (i64, i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    let offset = (page - 1) * per_page;
    (page, per_page, offset)
}

/// Authorizes an operation against role (sessions) or scope (API keys)
///
/// JWT sessions carry a tenant role; API keys carry scopes. Superusers
/// pass every role check through `has_role`.
pub(crate) fn authorize(
    auth: &AuthContext,
    required_scope: &str,
    required_role: UserRole,
) -> Result<(), ApiError> {
    match auth.method {
        AuthMethod::Jwt => {
            if auth.has_role(required_role) {
                Ok(())
            } else {
                Err(ApiError::Forbidden(format!(
                    "Requires the {} role",
                    required_role.as_str()
                )))
            }
        }
        AuthMethod::ApiKey => {
            if auth.has_scope(required_scope) {
                Ok(())
            } else {
                Err(ApiError::Forbidden(format!(
                    "API key is missing scope: {}",
                    required_scope
                )))
            }
        }
    }
}

/// Rejects non-superuser callers
///
/// Platform administration (tenant management, the network catalog) is
/// superuser-only regardless of tenant role.
pub(crate) fn require_superuser(auth: &AuthContext) -> Result<(), ApiError> {
    if auth.is_superuser {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Superuser access required".to_string()))
    }
}

/// Requires that an optional JSON field holds an object
///
/// Merge-updated jsonb columns (`config`, `settings`) use the `||`
/// operator, which only accepts objects; reject anything else here
/// rather than surfacing a database error.
pub(crate) fn require_json_object(
    value: Option<&serde_json::Value>,
    field: &str,
) -> Result<(), ApiError> {
    match value {
        Some(v) if !v.is_object() => {
            Err(ApiError::ValidationError(vec![ValidationErrorDetail {
                field: field.to_string(),
                message: format!("{} must be a JSON object", field),
            }]))
        }
        _ => Ok(()),
    }
}
