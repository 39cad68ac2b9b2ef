//! Cache error types.
//!
//! Cache failures are advisory: callers on the read or write path log them
//! and continue as if the cache missed.

use thiserror::Error;

/// Errors that can occur during cache operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Failed to connect to the cache backend.
    #[error("Cache connection failed: {0}")]
    ConnectionFailed(String),

    /// A cache operation failed to execute.
    #[error("Cache operation failed: {0}")]
    OperationFailed(String),

    /// Failed to serialize or deserialize a cached value.
    #[error("Cache serialization error: {0}")]
    Serialization(String),
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
