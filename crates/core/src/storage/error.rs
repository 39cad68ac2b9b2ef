//! Repository error types.

use thiserror::Error;

/// Errors that can occur during repository operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// The requested entity was not found.
    #[error("{entity_type} with id {id} not found")]
    NotFound { entity_type: &'static str, id: String },

    /// An entity with a conflicting unique key already exists.
    #[error("{entity_type} with id {id} already exists")]
    AlreadyExists { entity_type: &'static str, id: String },

    /// Failed to connect to the storage backend.
    #[error("Storage connection failed: {0}")]
    ConnectionFailed(String),

    /// A query failed to execute.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Failed to serialize or deserialize stored data.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The data violates a storage-level constraint.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl RepositoryError {
    /// True when the error means the entity is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound { .. })
    }

    /// True when the error is a uniqueness conflict, whether it came from a
    /// pre-check or from the store's constraint enforcement.
    pub fn is_conflict(&self) -> bool {
        matches!(self, RepositoryError::AlreadyExists { .. })
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
