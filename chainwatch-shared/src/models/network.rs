/// Network model and database operations
///
/// Networks are the platform-wide catalog of chains that monitors can watch.
/// They are managed by superusers and readable by every tenant; there is no
/// tenant_id column.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE networks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     slug VARCHAR(64) NOT NULL UNIQUE,
///     name VARCHAR(255) NOT NULL,
///     chain_id BIGINT NOT NULL,
///     rpc_url VARCHAR(512) NOT NULL,
///     block_time_ms INTEGER NOT NULL DEFAULT 12000,
///     active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A chain that monitors can be attached to
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Network {
    /// Unique network ID
    pub id: Uuid,

    /// URL-safe identifier (e.g. "ethereum-mainnet")
    pub slug: String,

    /// Human-readable name
    pub name: String,

    /// EVM chain id (or equivalent numeric identifier)
    pub chain_id: i64,

    /// RPC endpoint used by the ingest side
    pub rpc_url: String,

    /// Expected block interval in milliseconds
    pub block_time_ms: i32,

    /// Inactive networks are hidden from tenants and reject new monitors
    pub active: bool,

    /// When the network was created
    pub created_at: DateTime<Utc>,

    /// When the network was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a new network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNetwork {
    /// URL-safe identifier
    pub slug: String,

    /// Human-readable name
    pub name: String,

    /// Chain id
    pub chain_id: i64,

    /// RPC endpoint
    pub rpc_url: String,

    /// Block interval in milliseconds (default 12000)
    #[serde(default = "default_block_time_ms")]
    pub block_time_ms: i32,
}

fn default_block_time_ms() -> i32 {
    12_000
}

/// Input for updating a network
///
/// Only non-None fields are applied. The slug and chain id are immutable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateNetwork {
    /// New display name
    pub name: Option<String>,

    /// New RPC endpoint
    pub rpc_url: Option<String>,

    /// New block interval
    pub block_time_ms: Option<i32>,

    /// Enable or disable the network
    pub active: Option<bool>,
}

impl Network {
    /// Registers a new network
    ///
    /// # Errors
    ///
    /// Returns an error if the slug already exists or the database operation
    /// fails.
    pub async fn create(pool: &PgPool, data: CreateNetwork) -> Result<Self, sqlx::Error> {
        let network = sqlx::query_as::<_, Network>(
            r#"
            INSERT INTO networks (slug, name, chain_id, rpc_url, block_time_ms)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, slug, name, chain_id, rpc_url, block_time_ms, active,
                      created_at, updated_at
            "#,
        )
        .bind(data.slug)
        .bind(data.name)
        .bind(data.chain_id)
        .bind(data.rpc_url)
        .bind(data.block_time_ms)
        .fetch_one(pool)
        .await?;

        Ok(network)
    }

    /// Finds a network by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let network = sqlx::query_as::<_, Network>(
            r#"
            SELECT id, slug, name, chain_id, rpc_url, block_time_ms, active,
                   created_at, updated_at
            FROM networks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(network)
    }

    /// Finds a network by slug
    pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Self>, sqlx::Error> {
        let network = sqlx::query_as::<_, Network>(
            r#"
            SELECT id, slug, name, chain_id, rpc_url, block_time_ms, active,
                   created_at, updated_at
            FROM networks
            WHERE slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(pool)
        .await?;

        Ok(network)
    }

    /// Lists active networks, ordered by name
    ///
    /// This is the tenant-visible view of the catalog.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let networks = sqlx::query_as::<_, Network>(
            r#"
            SELECT id, slug, name, chain_id, rpc_url, block_time_ms, active,
                   created_at, updated_at
            FROM networks
            WHERE active = TRUE
            ORDER BY name ASC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(networks)
    }

    /// Lists all networks including inactive ones (superuser view)
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let networks = sqlx::query_as::<_, Network>(
            r#"
            SELECT id, slug, name, chain_id, rpc_url, block_time_ms, active,
                   created_at, updated_at
            FROM networks
            ORDER BY name ASC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(networks)
    }

    /// Updates a network
    ///
    /// Only non-None fields in `data` will be updated.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateNetwork,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE networks SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.rpc_url.is_some() {
            bind_count += 1;
            query.push_str(&format!(", rpc_url = ${}", bind_count));
        }
        if data.block_time_ms.is_some() {
            bind_count += 1;
            query.push_str(&format!(", block_time_ms = ${}", bind_count));
        }
        if data.active.is_some() {
            bind_count += 1;
            query.push_str(&format!(", active = ${}", bind_count));
        }

        query.push_str(" WHERE id = $1 RETURNING id, slug, name, chain_id, rpc_url, block_time_ms, active, created_at, updated_at");

        let mut q = sqlx::query_as::<_, Network>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(rpc_url) = data.rpc_url {
            q = q.bind(rpc_url);
        }
        if let Some(block_time_ms) = data.block_time_ms {
            q = q.bind(block_time_ms);
        }
        if let Some(active) = data.active {
            q = q.bind(active);
        }

        let network = q.fetch_optional(pool).await?;

        Ok(network)
    }

    /// Deletes a network
    ///
    /// Fails with a foreign-key violation if any monitor still references it.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM networks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
