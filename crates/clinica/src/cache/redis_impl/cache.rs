//! Redis cache implementation.
//!
//! Uses set-based key tracking for efficient prefix deletion without SCAN.
//! Every key under a `{namespace}:{tenant}:` scope is tracked in a Redis Set
//! keyed by that scope.
//!
//! # Non-Atomicity Safety
//!
//! The operations in this module (especially `delete` and `delete_prefix`)
//! are not atomic - they involve multiple Redis commands. However, this is
//! safe because:
//!
//! - **SREM on non-existent key**: If a key is deleted but the process
//!   crashes before SREM, the tracking set will contain a stale reference.
//!   This is harmless because SREM on a non-existent member is a no-op, and
//!   DEL on a non-existent key is also safe.
//!
//! - **Orphaned entries in tracking set**: If keys are added to tracking but
//!   the actual SET fails, the tracking set may reference non-existent keys.
//!   This is harmless because `delete_prefix` will simply try to delete keys
//!   that don't exist.
//!
//! - **Partial deletion**: If `delete_prefix` deletes some keys but crashes
//!   before completing, subsequent calls will finish the cleanup safely.
//!
//! The worst case is temporary inconsistency, not data corruption or lost
//! writes. For the patient-page cache specifically, a surviving stale page
//! still expires within its TTL.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;

use clinica_core::cache::{Cache, Result};

use super::error::map_redis_error;

/// The Redis Set tracking a scope's live cache keys.
fn tracking_set_key(scope: &str) -> String {
    format!("tracking:{scope}")
}

/// The tracking scope for a key: the `{namespace}:{tenant}:` prefix, when
/// the key has one.
fn tracking_scope(key: &str) -> Option<String> {
    let mut segments = key.splitn(3, ':');
    let namespace = segments.next()?;
    let tenant = segments.next()?;
    segments.next()?;
    Some(format!("{namespace}:{tenant}:"))
}

/// Redis cache backend using connection manager for pooling.
///
/// Keys are automatically tracked in Redis Sets per tenant scope to enable
/// efficient prefix-based deletion without using SCAN operations.
#[derive(Clone)]
pub struct RedisCache {
    conn: redis::aio::ConnectionManager,
}

impl RedisCache {
    /// Creates a new Redis cache connection.
    ///
    /// # Arguments
    ///
    /// * `url` - Redis connection URL (e.g., "redis://localhost:6379")
    ///
    /// # Errors
    ///
    /// Returns `CacheError::ConnectionFailed` if the connection cannot be
    /// established.
    pub async fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(map_redis_error)?;
        let conn = redis::aio::ConnectionManager::new(client)
            .await
            .map_err(map_redis_error)?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let result: Option<Vec<u8>> = conn.get(key).await.map_err(map_redis_error)?;
        Ok(result)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();

        // Set the value
        match ttl {
            Some(duration) => {
                let seconds = duration.as_secs().max(1);
                conn.set_ex::<_, _, ()>(key, value, seconds)
                    .await
                    .map_err(map_redis_error)?;
            }
            None => {
                conn.set::<_, _, ()>(key, value)
                    .await
                    .map_err(map_redis_error)?;
            }
        }

        // Track the key in its scope's tracking set
        if let Some(scope) = tracking_scope(key) {
            conn.sadd::<_, _, ()>(&tracking_set_key(&scope), key)
                .await
                .map_err(map_redis_error)?;
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();

        // Note: The following operations are not atomic, but this is safe.
        // See module-level documentation for details on non-atomicity safety.

        if let Some(scope) = tracking_scope(key) {
            conn.srem::<_, _, ()>(&tracking_set_key(&scope), key)
                .await
                .map_err(map_redis_error)?;
        }

        conn.del::<_, ()>(key).await.map_err(map_redis_error)?;

        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let tracking_key = tracking_set_key(prefix);

        // Get all tracked keys for this scope
        let tracked_keys: Vec<String> = conn
            .smembers(&tracking_key)
            .await
            .map_err(map_redis_error)?;

        // Every tracked key lives under the scope, but filter anyway in
        // case a caller passes a longer prefix within the scope.
        let keys_to_delete: Vec<&String> = tracked_keys
            .iter()
            .filter(|k| k.starts_with(prefix))
            .collect();

        if !keys_to_delete.is_empty() {
            // Delete matching keys
            conn.del::<_, ()>(&keys_to_delete)
                .await
                .map_err(map_redis_error)?;

            // Remove from tracking set
            conn.srem::<_, _, ()>(&tracking_key, &keys_to_delete)
                .await
                .map_err(map_redis_error)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinica_core::cache::{patient_page_key, tenant_patients_prefix};
    use std::time::Duration;
    use uuid::Uuid;

    /// Helper to get Redis URL from environment.
    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
    }

    /// Skip test if Redis not available.
    async fn get_test_cache() -> Option<RedisCache> {
        RedisCache::new(&redis_url()).await.ok()
    }

    /// Generate a unique test key to avoid conflicts.
    fn test_key(suffix: &str) -> String {
        format!("test-redis-cache-{}-{}", Uuid::new_v4(), suffix)
    }

    #[test]
    fn test_tracking_scope_extraction() {
        let tenant_id = Uuid::new_v4();
        let key = patient_page_key(tenant_id, None, None, 20, None);

        assert_eq!(tracking_scope(&key), Some(tenant_patients_prefix(tenant_id)));
        assert_eq!(tracking_scope("no-colons"), None);
        assert_eq!(tracking_scope("two:segments"), None);
    }

    #[tokio::test]
    async fn test_redis_set_and_get() {
        let Some(cache) = get_test_cache().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };

        let key = test_key("set_get");
        let value = b"hello world";

        cache.set(&key, value, None).await.unwrap();

        let result = cache.get(&key).await.unwrap();
        assert_eq!(result, Some(value.to_vec()));

        // Clean up
        cache.delete(&key).await.unwrap();
    }

    #[tokio::test]
    async fn test_redis_get_nonexistent() {
        let Some(cache) = get_test_cache().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };

        let key = test_key("nonexistent");
        let result = cache.get(&key).await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_redis_ttl() {
        let Some(cache) = get_test_cache().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };

        let key = test_key("ttl");
        let value = b"expiring value";

        cache
            .set(&key, value, Some(Duration::from_secs(1)))
            .await
            .unwrap();

        assert!(cache.get(&key).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(cache.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_redis_delete_prefix() {
        let Some(cache) = get_test_cache().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };

        // Use proper page keys so they get tracked
        let tenant_id = Uuid::new_v4();
        let other_tenant = Uuid::new_v4();

        let key1 = patient_page_key(tenant_id, None, None, 20, None);
        let key2 = patient_page_key(tenant_id, None, Some("abc"), 50, None);
        let key3 = patient_page_key(other_tenant, None, None, 20, None);

        cache.set(&key1, b"value1", None).await.unwrap();
        cache.set(&key2, b"value2", None).await.unwrap();
        cache.set(&key3, b"value3", None).await.unwrap();

        cache
            .delete_prefix(&tenant_patients_prefix(tenant_id))
            .await
            .unwrap();

        assert!(cache.get(&key1).await.unwrap().is_none());
        assert!(cache.get(&key2).await.unwrap().is_none());

        // Other tenant untouched
        assert!(cache.get(&key3).await.unwrap().is_some());

        // Clean up
        cache
            .delete_prefix(&tenant_patients_prefix(other_tenant))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_redis_delete_removes_from_tracking() {
        let Some(cache) = get_test_cache().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };

        let tenant_id = Uuid::new_v4();
        let key = patient_page_key(tenant_id, None, None, 20, None);
        let tracking = tracking_set_key(&tenant_patients_prefix(tenant_id));

        cache.set(&key, b"page", None).await.unwrap();

        let mut conn = cache.conn.clone();
        let tracked: Vec<String> = conn.smembers(&tracking).await.unwrap();
        assert!(tracked.contains(&key));

        cache.delete(&key).await.unwrap();

        let tracked_after: Vec<String> = conn.smembers(&tracking).await.unwrap();
        assert!(!tracked_after.contains(&key));
    }

    #[tokio::test]
    async fn test_redis_overwrite() {
        let Some(cache) = get_test_cache().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };

        let key = test_key("overwrite");

        cache.set(&key, b"initial", None).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), Some(b"initial".to_vec()));

        cache.set(&key, b"updated", None).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), Some(b"updated".to_vec()));

        // Clean up
        cache.delete(&key).await.unwrap();
    }

    #[tokio::test]
    async fn test_redis_binary_data() {
        let Some(cache) = get_test_cache().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };

        let key = test_key("binary");
        let value: Vec<u8> = (0..=255).collect();

        cache.set(&key, &value, None).await.unwrap();

        let result = cache.get(&key).await.unwrap();
        assert_eq!(result, Some(value));

        // Clean up
        cache.delete(&key).await.unwrap();
    }
}
