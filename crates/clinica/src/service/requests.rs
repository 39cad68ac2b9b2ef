//! Request payloads accepted by the service operations.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use clinica_core::auth::Role;

/// Payload for registering a new patient.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    #[serde(default)]
    pub primary_branch_id: Option<Uuid>,
}

/// Query parameters for the paginated patient listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListPatientsQuery {
    #[serde(default)]
    pub branch_id: Option<Uuid>,
    /// Opaque cursor token from a previous page's `next_cursor`.
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub search: Option<String>,
}

/// Payload for booking a new appointment.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAppointment {
    pub branch_id: Uuid,
    pub patient_id: Uuid,
    pub start_at: DateTime<Utc>,
}

/// Query parameters for the appointment listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListAppointmentsQuery {
    #[serde(default)]
    pub branch_id: Option<Uuid>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// Payload for recording a completed visit.
#[derive(Debug, Clone, Deserialize)]
pub struct NewVisit {
    pub patient_id: Uuid,
    pub branch_id: Uuid,
    pub visited_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Payload for opening a new branch.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBranch {
    pub name: String,
}

/// Payload for creating a staff account.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub branch_ids: Vec<Uuid>,
}

/// Login credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}
