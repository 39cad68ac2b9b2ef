//! Patient registration and the paginated listing.

use clinica_core::auth::{Permission, RequestContext};
use clinica_core::clinic::Patient;
use clinica_core::events::ClinicEvent;
use clinica_core::storage::{Cursor, PageRequest, PatientPage, DEFAULT_PAGE_LIMIT};

use crate::events::spawn_publish;

use super::{ClinicService, ListPatientsQuery, NewPatient, Result, ServiceError};

impl ClinicService {
    /// Registers a new patient in the caller's tenant.
    ///
    /// The phone number must be unique within the tenant. A lookup runs
    /// first so the common duplicate gets a descriptive conflict; the
    /// storage constraint catches the race where two registrations slip
    /// past the lookup concurrently, and both paths return `Conflict`.
    pub async fn create_patient(
        &self,
        ctx: &RequestContext,
        payload: NewPatient,
    ) -> Result<Patient> {
        self.require(ctx, Permission::CreatePatient)?;

        let first_name = payload.first_name.trim();
        let last_name = payload.last_name.trim();
        let phone_number = payload.phone_number.trim();
        if first_name.is_empty() {
            return Err(ServiceError::Validation("first_name is required".into()));
        }
        if last_name.is_empty() {
            return Err(ServiceError::Validation("last_name is required".into()));
        }
        if phone_number.is_empty() {
            return Err(ServiceError::Validation("phone_number is required".into()));
        }

        if let Some(existing) = self
            .patients
            .find_by_phone(ctx.tenant_id, phone_number)
            .await?
        {
            tracing::debug!(
                request_id = %ctx.request_id,
                patient_id = %existing.id,
                "Duplicate phone number rejected"
            );
            return Err(ServiceError::Conflict {
                entity_type: "Patient",
                detail: format!("phone number {phone_number} already exists"),
            });
        }

        let mut patient = Patient::new(ctx.tenant_id, first_name, last_name, phone_number);
        if let Some(branch_id) = payload.primary_branch_id {
            patient = patient.with_primary_branch(branch_id);
        }
        self.patients.create(&patient).await?;

        tracing::info!(
            request_id = %ctx.request_id,
            patient_id = %patient.id,
            "Patient created"
        );
        spawn_publish(
            self.events.clone(),
            ClinicEvent::PatientCreated {
                tenant_id: ctx.tenant_id,
                patient_id: patient.id,
            },
        );

        Ok(patient)
    }

    /// Returns one page of the tenant's patients.
    ///
    /// Results are ordered newest first with the patient id breaking
    /// timestamp ties, so a client walking `next_cursor` tokens sees every
    /// patient exactly once even while new ones are being registered. A
    /// malformed cursor token is a validation error, never a server fault.
    pub async fn list_patients(
        &self,
        ctx: &RequestContext,
        query: ListPatientsQuery,
    ) -> Result<PatientPage> {
        self.require(ctx, Permission::ViewPatient)?;

        let mut request = PageRequest::new(query.limit.unwrap_or(DEFAULT_PAGE_LIMIT));
        if let Some(branch_id) = query.branch_id {
            request = request.with_branch(branch_id);
        }
        if let Some(token) = query.cursor.as_deref() {
            request = request.with_cursor(Cursor::decode(token)?);
        }
        if let Some(search) = query.search.as_deref() {
            let search = search.trim();
            if !search.is_empty() {
                request = request.with_search(search);
            }
        }

        let page = self.patients.list_page(ctx.tenant_id, &request).await?;
        tracing::debug!(
            request_id = %ctx.request_id,
            returned = page.items.len(),
            has_more = page.has_more,
            "Patient page served"
        );
        Ok(page)
    }
}

#[cfg(all(test, feature = "inmemory"))]
mod tests {
    use clinica_core::auth::Role;
    use clinica_core::events::{ClinicEvent, CLINIC_TOPIC, PATIENT_CREATED};
    use uuid::Uuid;

    use crate::service::testing::{ctx, ctx_for_tenant, service, service_with_publisher};
    use crate::service::{ListPatientsQuery, NewPatient, ServiceError};

    fn new_patient(phone: &str) -> NewPatient {
        NewPatient {
            first_name: "John".into(),
            last_name: "Doe".into(),
            phone_number: phone.into(),
            primary_branch_id: None,
        }
    }

    #[tokio::test]
    async fn test_create_patient_trims_and_persists() {
        let service = service();
        let ctx = ctx(Role::User);

        let payload = NewPatient {
            first_name: "  John ".into(),
            last_name: " Doe".into(),
            phone_number: " 0812345678 ".into(),
            primary_branch_id: None,
        };
        let patient = service.create_patient(&ctx, payload).await.unwrap();

        assert_eq!(patient.first_name, "John");
        assert_eq!(patient.last_name, "Doe");
        assert_eq!(patient.phone_number, "0812345678");
        assert_eq!(patient.tenant_id, ctx.tenant_id);
    }

    #[tokio::test]
    async fn test_create_patient_rejects_blank_fields() {
        let service = service();
        let ctx = ctx(Role::User);

        for payload in [
            NewPatient {
                first_name: "   ".into(),
                ..new_patient("0812345678")
            },
            NewPatient {
                last_name: "".into(),
                ..new_patient("0812345678")
            },
            NewPatient {
                phone_number: "  ".into(),
                ..new_patient("0812345678")
            },
        ] {
            let err = service.create_patient(&ctx, payload).await.unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn test_duplicate_phone_is_conflict_with_detail() {
        let service = service();
        let ctx = ctx(Role::User);

        service
            .create_patient(&ctx, new_patient("0812345678"))
            .await
            .unwrap();
        let err = service
            .create_patient(&ctx, new_patient("0812345678"))
            .await
            .unwrap_err();

        match err {
            ServiceError::Conflict { detail, .. } => assert!(detail.contains("already exists")),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_same_phone_different_tenants_both_succeed() {
        let service = service();

        service
            .create_patient(&ctx(Role::User), new_patient("0812345678"))
            .await
            .unwrap();
        service
            .create_patient(&ctx(Role::User), new_patient("0812345678"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_viewer_cannot_create_patient() {
        let service = service();
        let err = service
            .create_patient(&ctx(Role::Viewer), new_patient("0812345678"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn test_create_patient_publishes_event() {
        let (service, publisher) = service_with_publisher();
        let ctx = ctx(Role::User);
        let mut receiver = publisher.subscribe(CLINIC_TOPIC, PATIENT_CREATED).await;

        let patient = service
            .create_patient(&ctx, new_patient("0812345678"))
            .await
            .unwrap();

        let event = receiver.recv().await.unwrap();
        assert_eq!(
            event,
            ClinicEvent::PatientCreated {
                tenant_id: ctx.tenant_id,
                patient_id: patient.id,
            }
        );
    }

    #[tokio::test]
    async fn test_list_patients_walks_pages_without_gaps() {
        let service = service();
        let ctx = ctx(Role::User);

        for i in 0..5 {
            service
                .create_patient(&ctx, new_patient(&format!("081000000{i}")))
                .await
                .unwrap();
        }

        let mut seen = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let query = ListPatientsQuery {
                limit: Some(2),
                cursor: cursor.clone(),
                ..Default::default()
            };
            let page = service.list_patients(&ctx, query).await.unwrap();
            assert_eq!(page.total, 5);
            seen.extend(page.items.iter().map(|p| p.id));
            match page.next_cursor {
                Some(token) => cursor = Some(token),
                None => break,
            }
        }

        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 5);
    }

    #[tokio::test]
    async fn test_list_patients_rejects_malformed_cursor() {
        let service = service();
        let query = ListPatientsQuery {
            cursor: Some("not-a-cursor!!".into()),
            ..Default::default()
        };
        let err = service
            .list_patients(&ctx(Role::Viewer), query)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_list_patients_blank_search_is_ignored() {
        let service = service();
        let ctx = ctx(Role::User);
        service
            .create_patient(&ctx, new_patient("0812345678"))
            .await
            .unwrap();

        let query = ListPatientsQuery {
            search: Some("   ".into()),
            ..Default::default()
        };
        let page = service.list_patients(&ctx, query).await.unwrap();
        assert_eq!(page.items.len(), 1);
    }

    #[tokio::test]
    async fn test_list_patients_is_tenant_scoped() {
        let service = service();
        let tenant_a = Uuid::new_v4();
        let tenant_b = Uuid::new_v4();

        service
            .create_patient(&ctx_for_tenant(tenant_a, Role::User), new_patient("0811111111"))
            .await
            .unwrap();

        let page = service
            .list_patients(&ctx_for_tenant(tenant_b, Role::Viewer), Default::default())
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);
    }
}
