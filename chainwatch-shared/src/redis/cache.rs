/// Read-through JSON cache for hot lookups
///
/// Monitors, networks, and tenant records are read far more often than they
/// change, so the API keeps short-lived JSON copies in Redis. Values are
/// stored under `chainwatch:`-prefixed keys with per-kind TTLs; writers
/// invalidate explicitly after mutations.
///
/// A value that fails to deserialize is treated as a miss and removed, so a
/// schema change never wedges a deployment on stale payloads.
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use super::client::{RedisClient, RedisClientError};

/// Namespace prefix shared by every cache key
const KEY_PREFIX: &str = "chainwatch";

/// TTL for cached tenant records (seconds)
pub const TENANT_TTL_SECS: u64 = 7200;

/// TTL for cached monitor and trigger records (seconds)
pub const MONITOR_TTL_SECS: u64 = 3600;

/// TTL for cached network records (seconds)
pub const NETWORK_TTL_SECS: u64 = 3600;

/// TTL for cached list responses, which go stale fastest (seconds)
pub const LIST_TTL_SECS: u64 = 300;

/// Cache errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Value could not be serialized for storage
    #[error("Cache encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Underlying Redis operation failed
    #[error(transparent)]
    Redis(#[from] RedisClientError),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Redis(err.into())
    }
}

/// JSON cache over a shared Redis client
///
/// Cheap to clone; all clones share the underlying connection manager.
#[derive(Clone)]
pub struct Cache {
    client: RedisClient,
}

impl Cache {
    /// Creates a cache over an existing Redis client
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    /// Fetches and deserializes a cached value
    ///
    /// Returns `Ok(None)` on a miss. A stored value that no longer
    /// deserializes is deleted and reported as a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let mut conn = self.client.get_connection();
        let raw: Option<String> = conn.get(key).await?;

        match raw {
            None => Ok(None),
            Some(json) => match serde_json::from_str(&json) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Evicting undecodable cache entry");
                    let _: () = conn.del(key).await?;
                    Ok(None)
                }
            },
        }
    }

    /// Serializes and stores a value with the given TTL
    pub async fn set_json<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: u64,
    ) -> Result<(), CacheError> {
        let json = serde_json::to_string(value)?;
        let mut conn = self.client.get_connection();
        conn.set_ex::<_, _, ()>(key, json, ttl_secs).await?;
        Ok(())
    }

    /// Removes a single cache entry
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.client.get_connection();
        let _: () = conn.del(key).await?;
        Ok(())
    }

    /// Removes the entries that mutations to a tenant's monitors invalidate
    pub async fn invalidate_monitor(&self, tenant_id: Uuid, monitor_id: Uuid) -> Result<(), CacheError> {
        let mut conn = self.client.get_connection();
        let keys = [monitor_key(monitor_id), monitor_list_key(tenant_id)];
        let _: () = conn.del(&keys[..]).await?;
        Ok(())
    }
}

/// Key for a cached tenant record
pub fn tenant_key(tenant_id: Uuid) -> String {
    format!("{}:tenant:{}", KEY_PREFIX, tenant_id)
}

/// Key for a cached monitor record
pub fn monitor_key(monitor_id: Uuid) -> String {
    format!("{}:monitor:{}", KEY_PREFIX, monitor_id)
}

/// Key for a tenant's cached monitor list
pub fn monitor_list_key(tenant_id: Uuid) -> String {
    format!("{}:monitors:tenant:{}", KEY_PREFIX, tenant_id)
}

/// Key for the cached list of enabled networks
pub fn network_list_key() -> String {
    format!("{}:networks:enabled", KEY_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redis::client::RedisConfig;

    #[test]
    fn test_key_builders_are_namespaced() {
        let id = Uuid::nil();
        assert_eq!(
            tenant_key(id),
            "chainwatch:tenant:00000000-0000-0000-0000-000000000000"
        );
        assert!(monitor_key(id).starts_with("chainwatch:monitor:"));
        assert!(monitor_list_key(id).starts_with("chainwatch:monitors:tenant:"));
        assert_eq!(network_list_key(), "chainwatch:networks:enabled");
    }

    #[tokio::test]
    #[ignore] // Requires running Redis instance
    async fn test_set_get_roundtrip() {
        let client = RedisClient::new(RedisConfig::default_for_test())
            .await
            .unwrap();
        let cache = Cache::new(client);

        let key = format!("chainwatch:test:{}", Uuid::new_v4());
        cache
            .set_json(&key, &vec!["a".to_string(), "b".to_string()], 60)
            .await
            .unwrap();

        let value: Option<Vec<String>> = cache.get_json(&key).await.unwrap();
        assert_eq!(value, Some(vec!["a".to_string(), "b".to_string()]));

        cache.delete(&key).await.unwrap();
        let gone: Option<Vec<String>> = cache.get_json(&key).await.unwrap();
        assert!(gone.is_none());
    }

    #[tokio::test]
    #[ignore] // Requires running Redis instance
    async fn test_undecodable_entry_reported_as_miss() {
        let client = RedisClient::new(RedisConfig::default_for_test())
            .await
            .unwrap();
        let cache = Cache::new(client.clone());

        let key = format!("chainwatch:test:{}", Uuid::new_v4());
        let mut conn = client.get_connection();
        let _: () = redis::AsyncCommands::set(&mut conn, &key, "not json").await.unwrap();

        let value: Option<Vec<String>> = cache.get_json(&key).await.unwrap();
        assert!(value.is_none());
    }
}
