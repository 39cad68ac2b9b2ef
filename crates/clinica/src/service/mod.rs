//! Service layer orchestrating the clinic operations.
//!
//! `ClinicService` owns trait objects for every collaborator, so the same
//! orchestration code runs over any storage, cache, or event backend. Each
//! operation follows the same shape: permission check, payload validation,
//! duplicate pre-check where one applies, storage call, then fire-and-forget
//! event emission. The storage layer's unique constraints remain the
//! authoritative duplicate guard; pre-checks only produce friendlier errors
//! for the common case.

mod appointments;
mod branches;
mod error;
mod patients;
mod requests;
mod users;
mod visits;

pub use error::{Result, ServiceError};
pub use requests::{
    Credentials, ListAppointmentsQuery, ListPatientsQuery, NewAppointment, NewBranch, NewPatient,
    NewUser, NewVisit,
};

use std::sync::Arc;

use clinica_core::auth::{Permission, RequestContext};
use clinica_core::events::EventPublisher;
use clinica_core::storage::{
    AppointmentRepository, BranchRepository, PatientRepository, UserRepository, VisitRepository,
};

/// The clinic management service.
#[derive(Clone)]
pub struct ClinicService {
    patients: Arc<dyn PatientRepository>,
    appointments: Arc<dyn AppointmentRepository>,
    visits: Arc<dyn VisitRepository>,
    branches: Arc<dyn BranchRepository>,
    users: Arc<dyn UserRepository>,
    events: Arc<dyn EventPublisher>,
}

impl ClinicService {
    pub fn new(
        patients: Arc<dyn PatientRepository>,
        appointments: Arc<dyn AppointmentRepository>,
        visits: Arc<dyn VisitRepository>,
        branches: Arc<dyn BranchRepository>,
        users: Arc<dyn UserRepository>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            patients,
            appointments,
            visits,
            branches,
            users,
            events,
        }
    }

    /// Rejects the call unless the caller's role grants the permission.
    fn require(&self, ctx: &RequestContext, permission: Permission) -> Result<()> {
        if ctx.role.has(permission) {
            Ok(())
        } else {
            tracing::warn!(
                request_id = %ctx.request_id,
                role = %ctx.role,
                required = %permission,
                "Authorization denied"
            );
            Err(ServiceError::Forbidden {
                required: permission,
            })
        }
    }
}
