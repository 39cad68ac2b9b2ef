//! Appointment booking and listing.

use chrono::Utc;
use clinica_core::auth::{Permission, RequestContext};
use clinica_core::clinic::Appointment;
use clinica_core::events::ClinicEvent;
use clinica_core::storage::AppointmentFilter;
use uuid::Uuid;

use crate::events::spawn_publish;

use super::{ClinicService, ListAppointmentsQuery, NewAppointment, Result, ServiceError};

impl ClinicService {
    /// Books an appointment for a patient at a branch.
    ///
    /// A patient can hold at most one appointment per (branch, start_at)
    /// slot. The slot pre-check answers the common duplicate quickly; the
    /// storage constraint resolves the concurrent race to the same
    /// `Conflict`. The patient id itself is not looked up, so the only
    /// failure outcomes are Validation and Conflict.
    pub async fn create_appointment(
        &self,
        ctx: &RequestContext,
        payload: NewAppointment,
    ) -> Result<Appointment> {
        self.require(ctx, Permission::CreateAppointment)?;

        if payload.branch_id == Uuid::nil() {
            return Err(ServiceError::Validation("branch_id is required".into()));
        }
        if payload.patient_id == Uuid::nil() {
            return Err(ServiceError::Validation("patient_id is required".into()));
        }
        if payload.start_at <= Utc::now() {
            return Err(ServiceError::Validation(
                "start_at must be in the future".into(),
            ));
        }

        let taken = self
            .appointments
            .exists(
                ctx.tenant_id,
                payload.branch_id,
                payload.patient_id,
                payload.start_at,
            )
            .await?;
        if taken {
            return Err(ServiceError::Conflict {
                entity_type: "Appointment",
                detail: format!(
                    "patient {} already has an appointment at {}",
                    payload.patient_id, payload.start_at
                ),
            });
        }

        let appointment = Appointment::new(
            ctx.tenant_id,
            payload.branch_id,
            payload.patient_id,
            payload.start_at,
        );
        self.appointments.create(&appointment).await?;

        tracing::info!(
            request_id = %ctx.request_id,
            appointment_id = %appointment.id,
            start_at = %appointment.start_at,
            "Appointment created"
        );
        spawn_publish(
            self.events.clone(),
            ClinicEvent::AppointmentCreated {
                tenant_id: ctx.tenant_id,
                appointment_id: appointment.id,
                patient_id: appointment.patient_id,
                branch_id: appointment.branch_id,
                start_at: appointment.start_at,
            },
        );

        Ok(appointment)
    }

    /// Lists the tenant's appointments, optionally narrowed to a branch
    /// and a calendar date, ordered by start time.
    pub async fn list_appointments(
        &self,
        ctx: &RequestContext,
        query: ListAppointmentsQuery,
    ) -> Result<Vec<Appointment>> {
        self.require(ctx, Permission::ViewAppointment)?;

        let filter = AppointmentFilter {
            branch_id: query.branch_id,
            date: query.date,
        };
        let appointments = self.appointments.list(ctx.tenant_id, &filter).await?;
        Ok(appointments)
    }
}
