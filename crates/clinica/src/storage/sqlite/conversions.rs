//! SQLite row conversion functions.
//!
//! Pure functions for converting between SQLite rows and domain types.
//! These are testable in isolation without database access.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::Row;
use uuid::Uuid;

use clinica_core::auth::Role;
use clinica_core::clinic::{Appointment, Branch, Patient, User, Visit};

/// Convert a SQLite row to a Patient.
///
/// Expected columns: id, tenant_id, first_name, last_name, phone_number,
/// primary_branch_id, created_at
pub fn row_to_patient(row: &Row) -> rusqlite::Result<Patient> {
    let id: String = row.get(0)?;
    let tenant_id: String = row.get(1)?;
    let first_name: String = row.get(2)?;
    let last_name: String = row.get(3)?;
    let phone_number: String = row.get(4)?;
    let primary_branch_id: Option<String> = row.get(5)?;
    let created_at: String = row.get(6)?;

    Ok(Patient {
        id: parse_uuid(&id)?,
        tenant_id: parse_uuid(&tenant_id)?,
        first_name,
        last_name,
        phone_number,
        primary_branch_id: primary_branch_id.as_deref().map(parse_uuid).transpose()?,
        created_at: parse_datetime(&created_at)?,
    })
}

/// Convert a SQLite row to an Appointment.
///
/// Expected columns: id, tenant_id, branch_id, patient_id, start_at, created_at
pub fn row_to_appointment(row: &Row) -> rusqlite::Result<Appointment> {
    let id: String = row.get(0)?;
    let tenant_id: String = row.get(1)?;
    let branch_id: String = row.get(2)?;
    let patient_id: String = row.get(3)?;
    let start_at: String = row.get(4)?;
    let created_at: String = row.get(5)?;

    Ok(Appointment {
        id: parse_uuid(&id)?,
        tenant_id: parse_uuid(&tenant_id)?,
        branch_id: parse_uuid(&branch_id)?,
        patient_id: parse_uuid(&patient_id)?,
        start_at: parse_datetime(&start_at)?,
        created_at: parse_datetime(&created_at)?,
    })
}

/// Convert a SQLite row to a Visit.
///
/// Expected columns: id, tenant_id, patient_id, branch_id, visited_at, notes, created_at
pub fn row_to_visit(row: &Row) -> rusqlite::Result<Visit> {
    let id: String = row.get(0)?;
    let tenant_id: String = row.get(1)?;
    let patient_id: String = row.get(2)?;
    let branch_id: String = row.get(3)?;
    let visited_at: String = row.get(4)?;
    let notes: Option<String> = row.get(5)?;
    let created_at: String = row.get(6)?;

    Ok(Visit {
        id: parse_uuid(&id)?,
        tenant_id: parse_uuid(&tenant_id)?,
        patient_id: parse_uuid(&patient_id)?,
        branch_id: parse_uuid(&branch_id)?,
        visited_at: parse_datetime(&visited_at)?,
        notes,
        created_at: parse_datetime(&created_at)?,
    })
}

/// Convert a SQLite row to a Branch.
///
/// Expected columns: id, tenant_id, name, created_at
pub fn row_to_branch(row: &Row) -> rusqlite::Result<Branch> {
    let id: String = row.get(0)?;
    let tenant_id: String = row.get(1)?;
    let name: String = row.get(2)?;
    let created_at: String = row.get(3)?;

    Ok(Branch {
        id: parse_uuid(&id)?,
        tenant_id: parse_uuid(&tenant_id)?,
        name,
        created_at: parse_datetime(&created_at)?,
    })
}

/// Convert a SQLite row to a User (without branch associations).
///
/// Expected columns: id, tenant_id, username, password_hash, role, created_at
pub fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    let id: String = row.get(0)?;
    let tenant_id: String = row.get(1)?;
    let username: String = row.get(2)?;
    let password_hash: String = row.get(3)?;
    let role: String = row.get(4)?;
    let created_at: String = row.get(5)?;

    Ok(User {
        id: parse_uuid(&id)?,
        tenant_id: parse_uuid(&tenant_id)?,
        username,
        password_hash,
        role: parse_role(&role)?,
        branch_ids: Vec::new(),
        created_at: parse_datetime(&created_at)?,
    })
}

/// Parse a UUID from string.
pub fn parse_uuid(s: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Parse a datetime from RFC 3339 string.
pub fn parse_datetime(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Parse a Role from string.
pub fn parse_role(s: &str) -> rusqlite::Result<Role> {
    s.parse::<Role>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
        )
    })
}

/// Format a DateTime<Utc> for SQLite storage.
///
/// Fixed-width RFC 3339 with microsecond precision and a `Z` suffix. The
/// keyset page query compares these strings in SQL, so lexicographic order
/// must equal chronological order, which variable-precision formatting
/// would break.
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Format a NaiveDate for SQLite storage (YYYY-MM-DD).
pub fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
