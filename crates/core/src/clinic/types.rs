use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Role;

/// A patient registered with a tenant.
///
/// Patients are immutable after creation: there is no update or delete path
/// in this core, only creation and tenant-scoped reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// Unique per tenant.
    pub phone_number: String,
    pub primary_branch_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Patient {
    /// Creates a new patient with a fresh id and the current timestamp.
    pub fn new(
        tenant_id: Uuid,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        phone_number: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            phone_number: phone_number.into(),
            primary_branch_id: None,
            created_at: Utc::now(),
        }
    }

    /// Sets the primary branch for this patient.
    pub fn with_primary_branch(mut self, branch_id: Uuid) -> Self {
        self.primary_branch_id = Some(branch_id);
        self
    }

    /// Sets a specific ID for this patient (useful for testing).
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// Sets a specific creation timestamp (useful for testing).
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// A scheduled appointment for a patient at a branch.
///
/// The tuple (tenant, branch, patient, start_at) is unique: the same patient
/// cannot be booked twice at the same branch and instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub branch_id: Uuid,
    pub patient_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    pub fn new(tenant_id: Uuid, branch_id: Uuid, patient_id: Uuid, start_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            branch_id,
            patient_id,
            start_at,
            created_at: Utc::now(),
        }
    }

    /// Sets a specific ID for this appointment (useful for testing).
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }
}

/// A recorded patient visit.
///
/// The tuple (tenant, patient, branch, visited_at) is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub patient_id: Uuid,
    pub branch_id: Uuid,
    pub visited_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Visit {
    pub fn new(
        tenant_id: Uuid,
        patient_id: Uuid,
        branch_id: Uuid,
        visited_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            patient_id,
            branch_id,
            visited_at,
            notes: None,
            created_at: Utc::now(),
        }
    }

    /// Attaches free-text notes to this visit.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Sets a specific ID for this visit (useful for testing).
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }
}

/// A clinic branch belonging to a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Branch {
    pub fn new(tenant_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            name: name.into(),
            created_at: Utc::now(),
        }
    }

    /// Sets a specific ID for this branch (useful for testing).
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }
}

/// A staff user account.
///
/// Usernames are globally unique across tenants so that identity lookup at
/// login can run before the tenant is known. The password hash never leaves
/// the storage layer in serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub username: String,
    /// Argon2id PHC string. Skipped on serialization so it cannot leak into
    /// cache values or event payloads.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub branch_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        tenant_id: Uuid,
        username: impl Into<String>,
        password_hash: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            username: username.into(),
            password_hash: password_hash.into(),
            role,
            branch_ids: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Associates this user with a set of branches.
    pub fn with_branches(mut self, branch_ids: Vec<Uuid>) -> Self {
        self.branch_ids = branch_ids;
        self
    }

    /// Sets a specific ID for this user (useful for testing).
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }
}
