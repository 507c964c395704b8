/// API key model and database operations
///
/// API keys are the programmatic alternative to JWT sessions, suitable for
/// server-to-server integrations. Key material handling (generation, hashing,
/// constant-time verification) lives in `crate::auth::api_key`; this module
/// owns the persistence side.
///
/// # Security
///
/// - Keys are stored as SHA-256 hashes (never plaintext)
/// - `key_prefix` and `last_four` exist for narrowing lookups and for
///   display ("cwk_AbCd... ...WxYz"); neither reveals enough of the key
///   to matter
/// - The full key is only returned on creation, never again
/// - Keys can be scoped, revoked, or set to expire
///
/// # Schema
///
/// ```sql
/// CREATE TABLE api_keys (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     tenant_id UUID NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name VARCHAR(255) NOT NULL,
///     key_prefix VARCHAR(12) NOT NULL,
///     last_four VARCHAR(4) NOT NULL,
///     key_hash VARCHAR(64) NOT NULL UNIQUE,
///     scopes TEXT[] NOT NULL DEFAULT '{}',
///     expires_at TIMESTAMPTZ,
///     revoked BOOLEAN NOT NULL DEFAULT FALSE,
///     revoked_at TIMESTAMPTZ,
///     last_used_at TIMESTAMPTZ,
///     usage_count BIGINT NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE INDEX idx_api_keys_prefix_last_four ON api_keys (key_prefix, last_four);
/// ```
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::api_key::{extract_last_four, extract_prefix, generate_api_key};

/// API key record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ApiKey {
    /// Unique API key ID
    pub id: Uuid,

    /// Tenant this key belongs to
    pub tenant_id: Uuid,

    /// User who created the key
    pub user_id: Uuid,

    /// Human-readable name for the key
    pub name: String,

    /// First 12 characters of the issued key
    pub key_prefix: String,

    /// Last 4 characters of the issued key
    pub last_four: String,

    /// SHA-256 hash of the full key (hex)
    pub key_hash: String,

    /// Permission scopes (e.g. ["monitors:read", "monitors:write"])
    pub scopes: Vec<String>,

    /// Optional expiration date
    pub expires_at: Option<DateTime<Utc>>,

    /// Whether the key has been revoked
    pub revoked: bool,

    /// When the key was revoked (if applicable)
    pub revoked_at: Option<DateTime<Utc>>,

    /// When the key last authenticated a request
    pub last_used_at: Option<DateTime<Utc>>,

    /// How many requests the key has authenticated
    pub usage_count: i64,

    /// When the key was created
    pub created_at: DateTime<Utc>,

    /// When the key was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new API key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateApiKey {
    /// Tenant ID
    pub tenant_id: Uuid,

    /// User creating the key
    pub user_id: Uuid,

    /// Human-readable name
    pub name: String,

    /// Permission scopes
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    /// Optional expiration date
    pub expires_at: Option<DateTime<Utc>>,
}

fn default_scopes() -> Vec<String> {
    vec!["monitors:read".to_string(), "monitors:write".to_string()]
}

impl ApiKey {
    /// Checks if the key is expired
    ///
    /// Returns true if expires_at is set and is in the past.
    pub fn is_expired(&self) -> bool {
        if let Some(expires_at) = self.expires_at {
            expires_at <= Utc::now()
        } else {
            false
        }
    }

    /// Whether the key can still authenticate requests
    pub fn is_usable(&self) -> bool {
        !self.revoked && !self.is_expired()
    }

    /// Creates a new API key
    ///
    /// Returns both the database record and the plaintext key.
    /// **IMPORTANT**: The plaintext key is only returned once and never stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn create(pool: &PgPool, data: CreateApiKey) -> Result<(Self, String), sqlx::Error> {
        let (plaintext_key, key_hash) = generate_api_key();
        let key_prefix = extract_prefix(&plaintext_key);
        let last_four = extract_last_four(&plaintext_key);

        let api_key = sqlx::query_as::<_, ApiKey>(
            r#"
            INSERT INTO api_keys
                (tenant_id, user_id, name, key_prefix, last_four, key_hash, scopes, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, tenant_id, user_id, name, key_prefix, last_four, key_hash,
                      scopes, expires_at, revoked, revoked_at, last_used_at,
                      usage_count, created_at, updated_at
            "#,
        )
        .bind(data.tenant_id)
        .bind(data.user_id)
        .bind(data.name)
        .bind(key_prefix)
        .bind(last_four)
        .bind(key_hash)
        .bind(&data.scopes)
        .bind(data.expires_at)
        .fetch_one(pool)
        .await?;

        Ok((api_key, plaintext_key))
    }

    /// Finds candidate keys for a presented credential
    ///
    /// Narrows by prefix and last-four so the caller compares at most a
    /// handful of hashes in constant time. Revoked keys are excluded here;
    /// expiry is left to the caller so it can report it distinctly.
    pub async fn find_candidates(
        pool: &PgPool,
        key_prefix: &str,
        last_four: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let keys = sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT id, tenant_id, user_id, name, key_prefix, last_four, key_hash,
                   scopes, expires_at, revoked, revoked_at, last_used_at,
                   usage_count, created_at, updated_at
            FROM api_keys
            WHERE key_prefix = $1 AND last_four = $2 AND revoked = FALSE
            "#,
        )
        .bind(key_prefix)
        .bind(last_four)
        .fetch_all(pool)
        .await?;

        Ok(keys)
    }

    /// Finds a key by ID with tenant isolation
    pub async fn find_by_id_and_tenant(
        pool: &PgPool,
        id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let api_key = sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT id, tenant_id, user_id, name, key_prefix, last_four, key_hash,
                   scopes, expires_at, revoked, revoked_at, last_used_at,
                   usage_count, created_at, updated_at
            FROM api_keys
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(pool)
        .await?;

        Ok(api_key)
    }

    /// Lists all API keys for a tenant, newest first
    pub async fn list_by_tenant(pool: &PgPool, tenant_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let keys = sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT id, tenant_id, user_id, name, key_prefix, last_four, key_hash,
                   scopes, expires_at, revoked, revoked_at, last_used_at,
                   usage_count, created_at, updated_at
            FROM api_keys
            WHERE tenant_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(pool)
        .await?;

        Ok(keys)
    }

    /// Revokes an API key with tenant isolation
    ///
    /// Ensures the key belongs to the tenant before revoking.
    pub async fn revoke(pool: &PgPool, id: Uuid, tenant_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE api_keys
            SET revoked = TRUE, revoked_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2 AND revoked = FALSE
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Records a successful authentication with this key
    ///
    /// Bumps the usage counter and the last-used timestamp in one statement.
    pub async fn record_usage(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE api_keys
            SET usage_count = usage_count + 1, last_used_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(())
    }
}
