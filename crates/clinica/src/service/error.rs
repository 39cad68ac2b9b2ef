//! Service-level error type.
//!
//! Every operation failure collapses into one of these variants so callers
//! see a uniform taxonomy regardless of which storage backend produced the
//! underlying error. Both the pre-check and the constraint-backstop paths
//! for duplicates land on `Conflict`.

use clinica_core::auth::Permission;
use clinica_core::storage::{CursorError, RepositoryError};
use thiserror::Error;

/// Errors returned by `ClinicService` operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request payload failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The referenced entity does not exist in the caller's tenant.
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: &'static str, id: String },

    /// The operation would duplicate an existing entity.
    #[error("{entity_type} already exists: {detail}")]
    Conflict {
        entity_type: &'static str,
        detail: String,
    },

    /// The caller's role does not grant the required permission.
    #[error("requires {required} permission")]
    Forbidden { required: Permission },

    /// The storage or cache backend is unreachable.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Any other internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation",
            ServiceError::NotFound { .. } => "not_found",
            ServiceError::Conflict { .. } => "conflict",
            ServiceError::Forbidden { .. } => "forbidden",
            ServiceError::Unavailable(_) => "unavailable",
            ServiceError::Internal(_) => "internal",
        }
    }

    /// The HTTP status code an outer transport layer should use.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Validation(_) => 400,
            ServiceError::NotFound { .. } => 404,
            ServiceError::Conflict { .. } => 409,
            ServiceError::Forbidden { .. } => 403,
            ServiceError::Unavailable(_) => 503,
            ServiceError::Internal(_) => 500,
        }
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity_type, id } => {
                ServiceError::NotFound { entity_type, id }
            }
            RepositoryError::AlreadyExists { entity_type, id } => ServiceError::Conflict {
                entity_type,
                detail: id,
            },
            RepositoryError::ConnectionFailed(msg) => ServiceError::Unavailable(msg),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

impl From<CursorError> for ServiceError {
    fn from(err: CursorError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
