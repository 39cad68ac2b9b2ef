use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use clinica_core::auth::Role;
use clinica_core::clinic::{Appointment, Branch, Patient, User, Visit};
use clinica_core::storage::{
    AppointmentFilter, AppointmentRepository, BranchRepository, Cursor, PageRequest,
    PatientPage, PatientRepository, RepositoryError, Result, UserRepository, VisitRepository,
};

/// In-memory repository implementing every storage trait.
///
/// Cloneable; clones share the same underlying tables.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    patients: Arc<RwLock<HashMap<Uuid, Patient>>>,
    appointments: Arc<RwLock<HashMap<Uuid, Appointment>>>,
    visits: Arc<RwLock<HashMap<Uuid, Visit>>>,
    branches: Arc<RwLock<HashMap<Uuid, Branch>>>,
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_search(patient: &Patient, term: &str) -> bool {
    let term = term.to_lowercase();
    patient.first_name.to_lowercase().contains(&term)
        || patient.last_name.to_lowercase().contains(&term)
        || patient.phone_number.to_lowercase().contains(&term)
}

fn matches_branch(patient: &Patient, branch_id: Option<Uuid>) -> bool {
    match branch_id {
        Some(branch_id) => patient.primary_branch_id == Some(branch_id),
        None => true,
    }
}

#[async_trait]
impl PatientRepository for InMemoryRepository {
    async fn create(&self, patient: &Patient) -> Result<()> {
        let mut patients = self.patients.write().await;

        let duplicate = patients.values().any(|p| {
            p.tenant_id == patient.tenant_id && p.phone_number == patient.phone_number
        });
        if duplicate {
            return Err(RepositoryError::AlreadyExists {
                entity_type: "Patient",
                id: patient.id.to_string(),
            });
        }

        patients.insert(patient.id, patient.clone());
        Ok(())
    }

    async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Patient>> {
        let patients = self.patients.read().await;
        Ok(patients
            .get(&id)
            .filter(|p| p.tenant_id == tenant_id)
            .cloned())
    }

    async fn find_by_phone(&self, tenant_id: Uuid, phone: &str) -> Result<Option<Patient>> {
        let patients = self.patients.read().await;
        Ok(patients
            .values()
            .find(|p| p.tenant_id == tenant_id && p.phone_number == phone)
            .cloned())
    }

    async fn list_page(&self, tenant_id: Uuid, request: &PageRequest) -> Result<PatientPage> {
        let patients = self.patients.read().await;

        // Count honors the branch filter but not the search term.
        let total = patients
            .values()
            .filter(|p| p.tenant_id == tenant_id && matches_branch(p, request.branch_id))
            .count() as u64;

        let mut matching: Vec<&Patient> = patients
            .values()
            .filter(|p| p.tenant_id == tenant_id && matches_branch(p, request.branch_id))
            .filter(|p| {
                request
                    .search
                    .as_deref()
                    .is_none_or(|term| matches_search(p, term))
            })
            .filter(|p| {
                request
                    .cursor
                    .as_ref()
                    .is_none_or(|cursor| cursor.precedes(p.created_at, p.id))
            })
            .collect();

        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let limit = request.limit as usize;
        let has_more = matching.len() > limit;
        let items: Vec<Patient> = matching.into_iter().take(limit).cloned().collect();
        let next_cursor = if has_more {
            items
                .last()
                .map(|p| Cursor::new(p.created_at, p.id).encode())
        } else {
            None
        };

        Ok(PatientPage {
            items,
            has_more,
            next_cursor,
            total,
        })
    }

    async fn count(&self, tenant_id: Uuid, branch_id: Option<Uuid>) -> Result<u64> {
        let patients = self.patients.read().await;
        Ok(patients
            .values()
            .filter(|p| p.tenant_id == tenant_id && matches_branch(p, branch_id))
            .count() as u64)
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryRepository {
    async fn create(&self, appointment: &Appointment) -> Result<()> {
        let mut appointments = self.appointments.write().await;

        let duplicate = appointments.values().any(|a| {
            a.tenant_id == appointment.tenant_id
                && a.branch_id == appointment.branch_id
                && a.patient_id == appointment.patient_id
                && a.start_at == appointment.start_at
        });
        if duplicate {
            return Err(RepositoryError::AlreadyExists {
                entity_type: "Appointment",
                id: appointment.id.to_string(),
            });
        }

        appointments.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn exists(
        &self,
        tenant_id: Uuid,
        branch_id: Uuid,
        patient_id: Uuid,
        start_at: DateTime<Utc>,
    ) -> Result<bool> {
        let appointments = self.appointments.read().await;
        Ok(appointments.values().any(|a| {
            a.tenant_id == tenant_id
                && a.branch_id == branch_id
                && a.patient_id == patient_id
                && a.start_at == start_at
        }))
    }

    async fn list(&self, tenant_id: Uuid, filter: &AppointmentFilter) -> Result<Vec<Appointment>> {
        let appointments = self.appointments.read().await;
        let mut matching: Vec<Appointment> = appointments
            .values()
            .filter(|a| a.tenant_id == tenant_id)
            .filter(|a| filter.branch_id.is_none_or(|b| a.branch_id == b))
            .filter(|a| filter.date.is_none_or(|d| a.start_at.date_naive() == d))
            .cloned()
            .collect();

        matching.sort_by_key(|a| a.start_at);
        Ok(matching)
    }
}

#[async_trait]
impl VisitRepository for InMemoryRepository {
    async fn create(&self, visit: &Visit) -> Result<()> {
        let mut visits = self.visits.write().await;

        let duplicate = visits.values().any(|v| {
            v.tenant_id == visit.tenant_id
                && v.patient_id == visit.patient_id
                && v.branch_id == visit.branch_id
                && v.visited_at == visit.visited_at
        });
        if duplicate {
            return Err(RepositoryError::AlreadyExists {
                entity_type: "Visit",
                id: visit.id.to_string(),
            });
        }

        visits.insert(visit.id, visit.clone());
        Ok(())
    }

    async fn history(&self, tenant_id: Uuid, patient_id: Uuid) -> Result<Vec<Visit>> {
        let visits = self.visits.read().await;
        let mut matching: Vec<Visit> = visits
            .values()
            .filter(|v| v.tenant_id == tenant_id && v.patient_id == patient_id)
            .cloned()
            .collect();

        matching.sort_by(|a, b| b.visited_at.cmp(&a.visited_at));
        Ok(matching)
    }
}

#[async_trait]
impl BranchRepository for InMemoryRepository {
    async fn create(&self, branch: &Branch) -> Result<()> {
        let mut branches = self.branches.write().await;
        branches.insert(branch.id, branch.clone());
        Ok(())
    }

    async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Branch>> {
        let branches = self.branches.read().await;
        Ok(branches
            .get(&id)
            .filter(|b| b.tenant_id == tenant_id)
            .cloned())
    }

    async fn list(&self, tenant_id: Uuid) -> Result<Vec<Branch>> {
        let branches = self.branches.read().await;
        let mut matching: Vec<Branch> = branches
            .values()
            .filter(|b| b.tenant_id == tenant_id)
            .cloned()
            .collect();

        matching.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(matching)
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn create(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;

        // Usernames are globally unique, across tenants.
        let duplicate = users.values().any(|u| u.username == user.username);
        if duplicate {
            return Err(RepositoryError::AlreadyExists {
                entity_type: "User",
                id: user.username.clone(),
            });
        }

        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn set_role(&self, tenant_id: Uuid, user_id: Uuid, role: Role) -> Result<()> {
        let mut users = self.users.write().await;
        match users
            .get_mut(&user_id)
            .filter(|u| u.tenant_id == tenant_id)
        {
            Some(user) => {
                user.role = role;
                Ok(())
            }
            None => Err(RepositoryError::NotFound {
                entity_type: "User",
                id: user_id.to_string(),
            }),
        }
    }

    async fn set_branches(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        branch_ids: Vec<Uuid>,
    ) -> Result<()> {
        let mut users = self.users.write().await;
        match users
            .get_mut(&user_id)
            .filter(|u| u.tenant_id == tenant_id)
        {
            Some(user) => {
                user.branch_ids = branch_ids;
                Ok(())
            }
            None => Err(RepositoryError::NotFound {
                entity_type: "User",
                id: user_id.to_string(),
            }),
        }
    }
}
