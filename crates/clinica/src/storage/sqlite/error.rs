//! SQLite error mapping.
//!
//! Translates `tokio_rusqlite::Error` into `RepositoryError`. The schema
//! raises a small set of failure codes: uniqueness violations from the
//! duplicate-prevention indexes, primary key collisions, an unopenable
//! database file, and `QueryReturnedNoRows` which the repository uses to
//! signal an absent row from inside `conn.call` closures. Mapping
//! `SQLITE_CONSTRAINT_UNIQUE` to `AlreadyExists` is what lets the
//! check-then-insert race resolve to the same conflict outcome as the
//! pre-check.

use clinica_core::storage::RepositoryError;
use rusqlite::ffi::{SQLITE_CONSTRAINT_PRIMARYKEY, SQLITE_CONSTRAINT_UNIQUE};

fn map_rusqlite_error(
    err: &rusqlite::Error,
    entity_type: &'static str,
    id: &str,
) -> RepositoryError {
    match err {
        rusqlite::Error::SqliteFailure(code, _)
            if code.extended_code == SQLITE_CONSTRAINT_UNIQUE
                || code.extended_code == SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            RepositoryError::AlreadyExists {
                entity_type,
                id: id.to_string(),
            }
        }

        rusqlite::Error::SqliteFailure(code, _)
            if code.code == rusqlite::ErrorCode::CannotOpen =>
        {
            RepositoryError::ConnectionFailed(format!("Cannot open database: {err}"))
        }

        rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
            entity_type,
            id: id.to_string(),
        },

        _ => RepositoryError::QueryFailed(err.to_string()),
    }
}

/// Maps a tokio_rusqlite error to a RepositoryError.
///
/// Use the `_with_id` variant when the entity id is known at the call
/// site; this one reports the id as "unknown".
pub fn map_tokio_rusqlite_error(
    err: tokio_rusqlite::Error,
    entity_type: &'static str,
) -> RepositoryError {
    map_tokio_rusqlite_error_with_id(err, entity_type, "unknown")
}

/// Maps a tokio_rusqlite error to a RepositoryError, attributing conflicts
/// and absences to the given entity id.
pub fn map_tokio_rusqlite_error_with_id(
    err: tokio_rusqlite::Error,
    entity_type: &'static str,
    id: impl Into<String>,
) -> RepositoryError {
    let id = id.into();
    match &err {
        tokio_rusqlite::Error::Rusqlite(inner) => map_rusqlite_error(inner, entity_type, &id),
        tokio_rusqlite::Error::Close(_) => {
            RepositoryError::ConnectionFailed("Connection closed unexpectedly".to_string())
        }
        _ => RepositoryError::QueryFailed(err.to_string()),
    }
}
