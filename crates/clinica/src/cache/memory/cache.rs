//! In-memory cache implementation with LRU eviction.
//!
//! Thread-safe cache with TTL support using tokio synchronization
//! primitives and an LRU eviction policy.
//!
//! This implementation mirrors the Redis cache behavior for consistency:
//! keys are tracked per tenant scope so that `delete_prefix` on a tenant's
//! patient pages touches only that tenant's keys instead of scanning the
//! whole store.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::RwLock;

use clinica_core::cache::{key_matches_prefix, Cache, Result};

/// A single cache entry with optional expiration.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    /// Creates a new cache entry with optional TTL.
    fn new(value: Vec<u8>, ttl: Option<Duration>) -> Self {
        let expires_at = ttl.map(|d| Instant::now() + d);
        Self { value, expires_at }
    }

    /// Returns true if this entry has expired.
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() > exp)
    }
}

/// The tracking scope for a key: the `{namespace}:{tenant}:` prefix, when
/// the key has one. Keys outside that shape are not tracked.
fn tracking_scope(key: &str) -> Option<String> {
    let mut segments = key.splitn(3, ':');
    let namespace = segments.next()?;
    let tenant = segments.next()?;
    segments.next()?;
    Some(format!("{namespace}:{tenant}:"))
}

/// In-memory cache implementation with LRU eviction.
///
/// Thread-safe cache using `Arc<RwLock<LruCache>>` for concurrent access.
/// Supports TTL with lazy expiration (entries are cleaned up on access).
/// Uses LRU eviction to limit memory usage when max_entries is reached.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    /// Main key-value store with LRU eviction.
    store: Arc<RwLock<LruCache<String, CacheEntry>>>,
    /// Tracks keys by tenant scope for efficient prefix deletion.
    /// Maps `{namespace}:{tenant}:` -> set of cache keys.
    tracking: Arc<RwLock<HashMap<String, HashSet<String>>>>,
}

impl MemoryCache {
    /// Creates a new in-memory cache with LRU eviction.
    ///
    /// # Arguments
    ///
    /// * `max_entries` - Maximum number of entries before LRU eviction kicks in.
    ///
    /// # Panics
    ///
    /// Panics if `max_entries` is 0.
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).expect("max_entries must be > 0");
        Self {
            store: Arc::new(RwLock::new(LruCache::new(capacity))),
            tracking: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut store = self.store.write().await;

        match store.get(key) {
            Some(entry) if entry.is_expired() => {
                // Entry exists but is expired - return None.
                // Cleanup is lazy; the entry ages out of the LRU on its own.
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let evicted = {
            let mut store = self.store.write().await;
            let entry = CacheEntry::new(value.to_vec(), ttl);
            store.push(key.to_string(), entry)
        };

        let mut tracking = self.tracking.write().await;

        // An eviction of another key must also leave the tracking table,
        // otherwise delete_prefix keeps chasing keys the LRU already dropped.
        if let Some((evicted_key, _)) = evicted {
            if evicted_key != key {
                if let Some(scope) = tracking_scope(&evicted_key) {
                    if let Some(keys) = tracking.get_mut(&scope) {
                        keys.remove(&evicted_key);
                        if keys.is_empty() {
                            tracking.remove(&scope);
                        }
                    }
                }
            }
        }

        // Track the key under its tenant scope for efficient prefix deletion
        if let Some(scope) = tracking_scope(key) {
            tracking.entry(scope).or_default().insert(key.to_string());
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        if let Some(scope) = tracking_scope(key) {
            let mut tracking = self.tracking.write().await;
            if let Some(keys) = tracking.get_mut(&scope) {
                keys.remove(key);
                // Clean up empty tracking sets
                if keys.is_empty() {
                    tracking.remove(&scope);
                }
            }
        }

        let mut store = self.store.write().await;
        store.pop(key);

        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<()> {
        // Tenant-scoped prefixes hit the tracking table directly.
        let tracked_keys: Option<HashSet<String>> = {
            let mut tracking = self.tracking.write().await;
            tracking.remove(prefix)
        };

        if let Some(keys) = tracked_keys {
            let mut store = self.store.write().await;
            for key in &keys {
                store.pop(key);
            }
            return Ok(());
        }

        // Untracked prefix - fall back to full iteration. O(n), but only
        // for prefixes outside the `{namespace}:{tenant}:` shape.
        let mut store = self.store.write().await;
        let keys_to_delete: Vec<String> = store
            .iter()
            .filter(|(key, _)| key_matches_prefix(key, prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in keys_to_delete {
            store.pop(&key);
        }

        Ok(())
    }
}
