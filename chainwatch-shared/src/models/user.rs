/// User model and database operations
///
/// This module provides the User model and CRUD operations for managing
/// accounts. Every user belongs to exactly one tenant and carries a role
/// within it; platform operators additionally have `is_superuser` set.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     tenant_id UUID NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
///     email VARCHAR(255) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     display_name VARCHAR(255),
///     role VARCHAR(20) NOT NULL DEFAULT 'member',
///     is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
///     active BOOLEAN NOT NULL DEFAULT TRUE,
///     last_login_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT users_role_check CHECK (
///         role IN ('owner', 'admin', 'member', 'viewer')
///     )
/// );
/// ```
///
/// # Roles
///
/// - **owner**: Full control over the tenant, including plan and users
/// - **admin**: Manage users, API keys, monitors, triggers
/// - **member**: Create and manage monitors and triggers
/// - **viewer**: Read-only access
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Role a user holds within their tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Full control over the tenant
    #[serde(rename = "owner")]
    Owner,

    /// Can manage users, API keys, monitors, and triggers
    #[serde(rename = "admin")]
    Admin,

    /// Can create and manage monitors and triggers
    #[serde(rename = "member")]
    Member,

    /// Read-only access
    #[serde(rename = "viewer")]
    Viewer,
}

impl UserRole {
    /// Converts role to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Owner => "owner",
            UserRole::Admin => "admin",
            UserRole::Member => "member",
            UserRole::Viewer => "viewer",
        }
    }

    /// Parses role from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(UserRole::Owner),
            "admin" => Some(UserRole::Admin),
            "member" => Some(UserRole::Member),
            "viewer" => Some(UserRole::Viewer),
            _ => None,
        }
    }

    /// Checks if this role has the permission level of the required role
    ///
    /// Hierarchy: Owner > Admin > Member > Viewer
    pub fn has_permission(&self, required: UserRole) -> bool {
        self.permission_level() >= required.permission_level()
    }

    /// Returns numeric permission level for comparison
    fn permission_level(&self) -> u8 {
        match self {
            UserRole::Owner => 4,
            UserRole::Admin => 3,
            UserRole::Member => 2,
            UserRole::Viewer => 1,
        }
    }
}

/// User model representing an account within a tenant
///
/// Passwords are stored as Argon2id hashes, never in plaintext.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Tenant this account belongs to
    pub tenant_id: Uuid,

    /// Email address, unique across all tenants
    pub email: String,

    /// Argon2id password hash
    ///
    /// Never exposed through API responses; routes map users to response
    /// payloads that omit it.
    pub password_hash: String,

    /// Optional display name
    pub display_name: Option<String>,

    /// Role within the tenant
    pub role: String,

    /// Platform operator flag; grants cross-tenant access
    pub is_superuser: bool,

    /// Deactivated accounts fail authentication
    pub active: bool,

    /// When the user last logged in (None if never)
    pub last_login_at: Option<DateTime<Utc>>,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Gets the parsed role enum
    pub fn get_role(&self) -> Option<UserRole> {
        UserRole::from_str(&self.role)
    }
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Tenant the account belongs to
    pub tenant_id: Uuid,

    /// Email address (stored lowercase)
    pub email: String,

    /// Argon2id password hash (NOT the plaintext password)
    pub password_hash: String,

    /// Optional display name
    pub display_name: Option<String>,

    /// Role within the tenant (defaults to Member)
    #[serde(default = "default_role")]
    pub role: UserRole,
}

fn default_role() -> UserRole {
    UserRole::Member
}

/// Input for updating an existing user
///
/// All fields are optional. Only non-None fields will be updated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    /// New password hash
    pub password_hash: Option<String>,

    /// New display name (use Some(None) to clear)
    pub display_name: Option<Option<String>>,

    /// New role
    pub role: Option<UserRole>,

    /// Activate or deactivate the account
    pub active: Option<bool>,
}

impl User {
    /// Creates a new user in the database
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Email already exists (unique constraint violation)
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (tenant_id, email, password_hash, display_name, role)
            VALUES ($1, LOWER($2), $3, $4, $5)
            RETURNING id, tenant_id, email, password_hash, display_name, role,
                      is_superuser, active, last_login_at, created_at, updated_at
            "#,
        )
        .bind(data.tenant_id)
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.display_name)
        .bind(data.role.as_str())
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, tenant_id, email, password_hash, display_name, role,
                   is_superuser, active, last_login_at, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by email address (case-insensitive)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, tenant_id, email, password_hash, display_name, role,
                   is_superuser, active, last_login_at, created_at, updated_at
            FROM users
            WHERE email = LOWER($1)
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Updates an existing user
    ///
    /// Only non-None fields in `data` will be updated. The `updated_at`
    /// timestamp is automatically set to the current time.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.password_hash.is_some() {
            bind_count += 1;
            query.push_str(&format!(", password_hash = ${}", bind_count));
        }
        if data.display_name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", display_name = ${}", bind_count));
        }
        if data.role.is_some() {
            bind_count += 1;
            query.push_str(&format!(", role = ${}", bind_count));
        }
        if data.active.is_some() {
            bind_count += 1;
            query.push_str(&format!(", active = ${}", bind_count));
        }

        query.push_str(" WHERE id = $1 RETURNING id, tenant_id, email, password_hash, display_name, role, is_superuser, active, last_login_at, created_at, updated_at");

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(password_hash) = data.password_hash {
            q = q.bind(password_hash);
        }
        if let Some(display_name) = data.display_name {
            q = q.bind(display_name);
        }
        if let Some(role) = data.role {
            q = q.bind(role.as_str());
        }
        if let Some(active) = data.active {
            q = q.bind(active);
        }

        let user = q.fetch_optional(pool).await?;

        Ok(user)
    }

    /// Updates the last login timestamp for a user
    ///
    /// Called after successful authentication.
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET last_login_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists users for a tenant with pagination
    pub async fn list_by_tenant(
        pool: &PgPool,
        tenant_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, tenant_id, email, password_hash, display_name, role,
                   is_superuser, active, last_login_at, created_at, updated_at
            FROM users
            WHERE tenant_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(tenant_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    /// Counts users in a tenant
    pub async fn count_by_tenant(pool: &PgPool, tenant_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_role_as_str() {
        assert_eq!(UserRole::Owner.as_str(), "owner");
        assert_eq!(UserRole::Admin.as_str(), "admin");
        assert_eq!(UserRole::Member.as_str(), "member");
        assert_eq!(UserRole::Viewer.as_str(), "viewer");
    }

    #[test]
    fn test_user_role_from_str() {
        assert_eq!(UserRole::from_str("owner"), Some(UserRole::Owner));
        assert_eq!(UserRole::from_str("admin"), Some(UserRole::Admin));
        assert_eq!(UserRole::from_str("member"), Some(UserRole::Member));
        assert_eq!(UserRole::from_str("viewer"), Some(UserRole::Viewer));
        assert_eq!(UserRole::from_str("root"), None);
    }

    #[test]
    fn test_role_hierarchy() {
        assert!(UserRole::Owner.has_permission(UserRole::Admin));
        assert!(UserRole::Owner.has_permission(UserRole::Viewer));
        assert!(UserRole::Admin.has_permission(UserRole::Member));
        assert!(!UserRole::Admin.has_permission(UserRole::Owner));
        assert!(!UserRole::Member.has_permission(UserRole::Admin));
        assert!(!UserRole::Viewer.has_permission(UserRole::Member));
        assert!(UserRole::Viewer.has_permission(UserRole::Viewer));
    }

    #[test]
    fn test_default_role() {
        assert_eq!(default_role(), UserRole::Member);
    }

    #[test]
    fn test_update_user_default() {
        let update = UpdateUser::default();
        assert!(update.password_hash.is_none());
        assert!(update.display_name.is_none());
        assert!(update.role.is_none());
        assert!(update.active.is_none());
    }

    // Integration tests for database operations are in tests/models/user_tests.rs
}
