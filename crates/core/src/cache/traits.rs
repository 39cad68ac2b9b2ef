//! The cache trait implemented by cache backends.

use std::time::Duration;

use async_trait::async_trait;

use crate::cache::Result;

/// A key/value cache with TTL support and prefix invalidation.
///
/// Values are raw bytes; serialization belongs to the caller. Backends must
/// tolerate concurrent access to unrelated keys, and concurrent invalidation
/// and re-population of the same prefix is allowed to interleave.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Fetches a value. `Ok(None)` means a miss (absent or expired).
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stores a value, with an optional time-to-live.
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()>;

    /// Removes a single key. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Removes every key that starts with `prefix`.
    async fn delete_prefix(&self, prefix: &str) -> Result<()>;
}
