//! Repository traits implemented by storage backends.
//!
//! Every method is tenant-scoped except `UserRepository::find_by_username`,
//! which crosses tenants because usernames are globally unique and identity
//! lookup happens before the tenant is known.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::Role;
use crate::clinic::{Appointment, Branch, Patient, User, Visit};
use crate::storage::{AppointmentFilter, PageRequest, PatientPage, Result};

/// Tenant-scoped patient persistence.
#[async_trait]
pub trait PatientRepository: Send + Sync {
    /// Persists a new patient.
    ///
    /// Returns `AlreadyExists` when the tenant already has a patient with
    /// the same phone number.
    async fn create(&self, patient: &Patient) -> Result<()>;

    /// Fetches a patient by id within a tenant.
    async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Patient>>;

    /// Finds a patient by exact phone number within a tenant.
    async fn find_by_phone(&self, tenant_id: Uuid, phone: &str) -> Result<Option<Patient>>;

    /// Returns one page of the tenant's patients, ordered by
    /// (created_at DESC, id DESC), applying branch, cursor, and search
    /// filters per the request.
    async fn list_page(&self, tenant_id: Uuid, request: &PageRequest) -> Result<PatientPage>;

    /// Counts the tenant's patients under an optional branch filter.
    /// Deliberately ignores any search term.
    async fn count(&self, tenant_id: Uuid, branch_id: Option<Uuid>) -> Result<u64>;
}

/// Tenant-scoped appointment persistence.
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Persists a new appointment.
    ///
    /// Returns `AlreadyExists` when the (tenant, branch, patient, start_at)
    /// tuple is already booked.
    async fn create(&self, appointment: &Appointment) -> Result<()>;

    /// True when an appointment exists for the given tuple.
    async fn exists(
        &self,
        tenant_id: Uuid,
        branch_id: Uuid,
        patient_id: Uuid,
        start_at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Lists the tenant's appointments under the filter, ordered by
    /// start_at ascending.
    async fn list(&self, tenant_id: Uuid, filter: &AppointmentFilter) -> Result<Vec<Appointment>>;
}

/// Tenant-scoped visit persistence.
#[async_trait]
pub trait VisitRepository: Send + Sync {
    /// Persists a new visit.
    ///
    /// Returns `AlreadyExists` when the (tenant, patient, branch, visited_at)
    /// tuple was already recorded. There is no pre-check path for visits;
    /// this constraint is the only duplicate guard.
    async fn create(&self, visit: &Visit) -> Result<()>;

    /// The patient's visit history, ordered by visited_at descending.
    async fn history(&self, tenant_id: Uuid, patient_id: Uuid) -> Result<Vec<Visit>>;
}

/// Tenant-scoped branch persistence.
#[async_trait]
pub trait BranchRepository: Send + Sync {
    async fn create(&self, branch: &Branch) -> Result<()>;

    async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Branch>>;

    async fn list(&self, tenant_id: Uuid) -> Result<Vec<Branch>>;
}

/// User account persistence.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persists a new user. Returns `AlreadyExists` when the username is
    /// taken, in any tenant.
    async fn create(&self, user: &User) -> Result<()>;

    /// Global username lookup; the one query allowed to cross tenants.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Replaces the user's role. Returns `NotFound` when the user does not
    /// exist in the tenant.
    async fn set_role(&self, tenant_id: Uuid, user_id: Uuid, role: Role) -> Result<()>;

    /// Replaces the user's branch associations. Returns `NotFound` when the
    /// user does not exist in the tenant.
    async fn set_branches(&self, tenant_id: Uuid, user_id: Uuid, branch_ids: Vec<Uuid>)
        -> Result<()>;
}
