//! Visit recording and history.

use clinica_core::auth::{Permission, RequestContext};
use clinica_core::clinic::Visit;
use uuid::Uuid;

use super::{ClinicService, NewVisit, Result, ServiceError};

impl ClinicService {
    /// Records a completed visit for a patient.
    ///
    /// Unlike patients and appointments there is no duplicate pre-check:
    /// the (patient, branch, visited_at) constraint in storage is the only
    /// guard, and a violation surfaces as `Conflict`.
    pub async fn record_visit(&self, ctx: &RequestContext, payload: NewVisit) -> Result<Visit> {
        self.require(ctx, Permission::RecordVisit)?;

        if payload.patient_id == Uuid::nil() {
            return Err(ServiceError::Validation("patient_id is required".into()));
        }
        if payload.branch_id == Uuid::nil() {
            return Err(ServiceError::Validation("branch_id is required".into()));
        }

        let patient = self
            .patients
            .get(ctx.tenant_id, payload.patient_id)
            .await?;
        if patient.is_none() {
            return Err(ServiceError::NotFound {
                entity_type: "Patient",
                id: payload.patient_id.to_string(),
            });
        }

        let mut visit = Visit::new(
            ctx.tenant_id,
            payload.patient_id,
            payload.branch_id,
            payload.visited_at,
        );
        if let Some(notes) = payload.notes {
            visit = visit.with_notes(notes);
        }
        self.visits.create(&visit).await?;

        tracing::info!(
            request_id = %ctx.request_id,
            visit_id = %visit.id,
            patient_id = %visit.patient_id,
            "Visit recorded"
        );
        Ok(visit)
    }

    /// The patient's visit history, newest first.
    pub async fn visit_history(
        &self,
        ctx: &RequestContext,
        patient_id: Uuid,
    ) -> Result<Vec<Visit>> {
        self.require(ctx, Permission::ViewPatient)?;

        let patient = self.patients.get(ctx.tenant_id, patient_id).await?;
        if patient.is_none() {
            return Err(ServiceError::NotFound {
                entity_type: "Patient",
                id: patient_id.to_string(),
            });
        }

        let visits = self.visits.history(ctx.tenant_id, patient_id).await?;
        Ok(visits)
    }
}
