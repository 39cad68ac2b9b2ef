//! SQLite repository implementation.
//!
//! Implements the repository traits from `clinica_core::storage` using
//! SQLite. Timestamps are stored as fixed-width RFC 3339 text, so the
//! keyset predicate and ORDER BY compare them as strings correctly; uuids
//! are stored as lowercase hyphenated text, whose ordering matches the
//! uuid byte ordering used by the in-memory backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_rusqlite::Connection;
use uuid::Uuid;

use clinica_core::auth::Role;
use clinica_core::clinic::{Appointment, Branch, Patient, User, Visit};
use clinica_core::storage::{
    AppointmentFilter, AppointmentRepository, BranchRepository, Cursor, PageRequest,
    PatientPage, PatientRepository, RepositoryError, Result, UserRepository, VisitRepository,
};

use super::conversions::{
    format_date, format_datetime, row_to_appointment, row_to_branch, row_to_patient,
    row_to_user, row_to_visit,
};
use super::error::{map_tokio_rusqlite_error, map_tokio_rusqlite_error_with_id};
use super::schema;

/// Helper to wrap rusqlite errors for tokio_rusqlite closures.
fn wrap_err(e: rusqlite::Error) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Rusqlite(e)
}

/// Builds the keyset page query and its parameters.
///
/// The statement always filters by tenant; branch, cursor, and search
/// predicates are appended as needed, with parameters pushed in the same
/// order the placeholders appear. The limit is one more than requested so
/// the caller can derive `has_more` without a second query.
fn build_page_query(
    tenant_id: Uuid,
    request: &PageRequest,
) -> (String, Vec<String>) {
    let mut sql = String::from(
        "SELECT id, tenant_id, first_name, last_name, phone_number, primary_branch_id, created_at \
         FROM patients WHERE tenant_id = ?",
    );
    let mut params: Vec<String> = vec![tenant_id.to_string()];

    if let Some(branch_id) = request.branch_id {
        sql.push_str(" AND primary_branch_id = ?");
        params.push(branch_id.to_string());
    }

    if let Some(cursor) = &request.cursor {
        sql.push_str(" AND (created_at < ? OR (created_at = ? AND id < ?))");
        let ts = format_datetime(&cursor.created_at);
        params.push(ts.clone());
        params.push(ts);
        params.push(cursor.id.to_string());
    }

    if let Some(search) = request.search.as_deref() {
        sql.push_str(
            " AND (LOWER(first_name) LIKE ? OR LOWER(last_name) LIKE ? OR LOWER(phone_number) LIKE ?)",
        );
        let pattern = format!("%{}%", search.to_lowercase());
        params.push(pattern.clone());
        params.push(pattern.clone());
        params.push(pattern);
    }

    sql.push_str(&format!(
        " ORDER BY created_at DESC, id DESC LIMIT {}",
        request.limit + 1
    ));

    (sql, params)
}

/// Builds the total-count query and its parameters.
///
/// Counts under the branch filter only; the search term deliberately does
/// not narrow the total.
fn build_count_query(tenant_id: Uuid, branch_id: Option<Uuid>) -> (String, Vec<String>) {
    let mut sql = String::from("SELECT COUNT(*) FROM patients WHERE tenant_id = ?");
    let mut params: Vec<String> = vec![tenant_id.to_string()];

    if let Some(branch_id) = branch_id {
        sql.push_str(" AND primary_branch_id = ?");
        params.push(branch_id.to_string());
    }

    (sql, params)
}

/// SQLite-based repository implementation.
///
/// Provides async access to SQLite storage for all entity types.
/// Cloneable; clones share the same connection.
#[derive(Clone)]
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Creates a new repository with a file-based database.
    ///
    /// The database file will be created if it doesn't exist.
    /// Schema tables are created automatically.
    pub async fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    /// Creates a new repository with an in-memory database.
    ///
    /// Useful for testing - data is lost when the connection is dropped.
    pub async fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    /// Initialize the database schema.
    async fn init_schema(conn: &Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch(schema::CREATE_TABLES)
                .map_err(wrap_err)?;
            Ok(())
        })
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))
    }
}

// ============================================================================
// PatientRepository implementation
// ============================================================================

#[async_trait]
impl PatientRepository for SqliteRepository {
    async fn create(&self, patient: &Patient) -> Result<()> {
        let patient = patient.clone();
        let id = patient.id.to_string();

        self.conn
            .call(move |conn| {
                conn.execute(
                    schema::INSERT_PATIENT,
                    rusqlite::params![
                        patient.id.to_string(),
                        patient.tenant_id.to_string(),
                        patient.first_name,
                        patient.last_name,
                        patient.phone_number,
                        patient.primary_branch_id.map(|b| b.to_string()),
                        format_datetime(&patient.created_at),
                    ],
                )
                .map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Patient", id))
    }

    async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Patient>> {
        let tenant_str = tenant_id.to_string();
        let id_str = id.to_string();

        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(schema::SELECT_PATIENT_BY_ID)
                    .map_err(wrap_err)?;
                match stmt.query_row([&tenant_str, &id_str], row_to_patient) {
                    Ok(patient) => Ok(Some(patient)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(wrap_err(e)),
                }
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Patient", id.to_string()))
    }

    async fn find_by_phone(&self, tenant_id: Uuid, phone: &str) -> Result<Option<Patient>> {
        let tenant_str = tenant_id.to_string();
        let phone = phone.to_string();

        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(schema::SELECT_PATIENT_BY_PHONE)
                    .map_err(wrap_err)?;
                match stmt.query_row([&tenant_str, &phone], row_to_patient) {
                    Ok(patient) => Ok(Some(patient)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(wrap_err(e)),
                }
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "Patient"))
    }

    async fn list_page(&self, tenant_id: Uuid, request: &PageRequest) -> Result<PatientPage> {
        let (page_sql, page_params) = build_page_query(tenant_id, request);
        let (count_sql, count_params) = build_count_query(tenant_id, request.branch_id);
        let limit = request.limit as usize;

        let (mut items, total) = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&page_sql).map_err(wrap_err)?;
                let rows = stmt
                    .query_map(rusqlite::params_from_iter(page_params.iter()), row_to_patient)
                    .map_err(wrap_err)?;

                let mut patients = Vec::new();
                for row_result in rows {
                    patients.push(row_result.map_err(wrap_err)?);
                }

                let total: u64 = conn
                    .query_row(
                        &count_sql,
                        rusqlite::params_from_iter(count_params.iter()),
                        |row| row.get(0),
                    )
                    .map_err(wrap_err)?;

                Ok((patients, total))
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "Patient"))?;

        let has_more = items.len() > limit;
        items.truncate(limit);
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
        let (sql, params) = build_count_query(tenant_id, branch_id);

        self.conn
            .call(move |conn| {
                conn.query_row(&sql, rusqlite::params_from_iter(params.iter()), |row| {
                    row.get(0)
                })
                .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "Patient"))
    }
}

// ============================================================================
// AppointmentRepository implementation
// ============================================================================

#[async_trait]
impl AppointmentRepository for SqliteRepository {
    async fn create(&self, appointment: &Appointment) -> Result<()> {
        let appointment = appointment.clone();
        let id = appointment.id.to_string();

        self.conn
            .call(move |conn| {
                conn.execute(
                    schema::INSERT_APPOINTMENT,
                    rusqlite::params![
                        appointment.id.to_string(),
                        appointment.tenant_id.to_string(),
                        appointment.branch_id.to_string(),
                        appointment.patient_id.to_string(),
                        format_datetime(&appointment.start_at),
                        format_datetime(&appointment.created_at),
                    ],
                )
                .map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Appointment", id))
    }

    async fn exists(
        &self,
        tenant_id: Uuid,
        branch_id: Uuid,
        patient_id: Uuid,
        start_at: DateTime<Utc>,
    ) -> Result<bool> {
        let params = [
            tenant_id.to_string(),
            branch_id.to_string(),
            patient_id.to_string(),
            format_datetime(&start_at),
        ];

        self.conn
            .call(move |conn| {
                let exists: i64 = conn
                    .query_row(
                        schema::SELECT_APPOINTMENT_EXISTS,
                        rusqlite::params_from_iter(params.iter()),
                        |row| row.get(0),
                    )
                    .map_err(wrap_err)?;
                Ok(exists != 0)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "Appointment"))
    }

    async fn list(&self, tenant_id: Uuid, filter: &AppointmentFilter) -> Result<Vec<Appointment>> {
        let mut sql = String::from(
            "SELECT id, tenant_id, branch_id, patient_id, start_at, created_at \
             FROM appointments WHERE tenant_id = ?",
        );
        let mut params: Vec<String> = vec![tenant_id.to_string()];

        if let Some(branch_id) = filter.branch_id {
            sql.push_str(" AND branch_id = ?");
            params.push(branch_id.to_string());
        }
        if let Some(date) = filter.date {
            // start_at is RFC 3339 text; its first ten characters are the date.
            sql.push_str(" AND substr(start_at, 1, 10) = ?");
            params.push(format_date(&date));
        }
        sql.push_str(" ORDER BY start_at ASC");

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql).map_err(wrap_err)?;
                let rows = stmt
                    .query_map(rusqlite::params_from_iter(params.iter()), row_to_appointment)
                    .map_err(wrap_err)?;

                let mut appointments = Vec::new();
                for row_result in rows {
                    appointments.push(row_result.map_err(wrap_err)?);
                }
                Ok(appointments)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "Appointment"))
    }
}

// ============================================================================
// VisitRepository implementation
// ============================================================================

#[async_trait]
impl VisitRepository for SqliteRepository {
    async fn create(&self, visit: &Visit) -> Result<()> {
        let visit = visit.clone();
        let id = visit.id.to_string();

        self.conn
            .call(move |conn| {
                conn.execute(
                    schema::INSERT_VISIT,
                    rusqlite::params![
                        visit.id.to_string(),
                        visit.tenant_id.to_string(),
                        visit.patient_id.to_string(),
                        visit.branch_id.to_string(),
                        format_datetime(&visit.visited_at),
                        visit.notes,
                        format_datetime(&visit.created_at),
                    ],
                )
                .map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Visit", id))
    }

    async fn history(&self, tenant_id: Uuid, patient_id: Uuid) -> Result<Vec<Visit>> {
        let tenant_str = tenant_id.to_string();
        let patient_str = patient_id.to_string();

        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(schema::SELECT_VISIT_HISTORY)
                    .map_err(wrap_err)?;
                let rows = stmt
                    .query_map([&tenant_str, &patient_str], row_to_visit)
                    .map_err(wrap_err)?;

                let mut visits = Vec::new();
                for row_result in rows {
                    visits.push(row_result.map_err(wrap_err)?);
                }
                Ok(visits)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "Visit"))
    }
}

// ============================================================================
// BranchRepository implementation
// ============================================================================

#[async_trait]
impl BranchRepository for SqliteRepository {
    async fn create(&self, branch: &Branch) -> Result<()> {
        let branch = branch.clone();
        let id = branch.id.to_string();

        self.conn
            .call(move |conn| {
                conn.execute(
                    schema::INSERT_BRANCH,
                    rusqlite::params![
                        branch.id.to_string(),
                        branch.tenant_id.to_string(),
                        branch.name,
                        format_datetime(&branch.created_at),
                    ],
                )
                .map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Branch", id))
    }

    async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Branch>> {
        let tenant_str = tenant_id.to_string();
        let id_str = id.to_string();

        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(schema::SELECT_BRANCH_BY_ID)
                    .map_err(wrap_err)?;
                match stmt.query_row([&tenant_str, &id_str], row_to_branch) {
                    Ok(branch) => Ok(Some(branch)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(wrap_err(e)),
                }
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Branch", id.to_string()))
    }

    async fn list(&self, tenant_id: Uuid) -> Result<Vec<Branch>> {
        let tenant_str = tenant_id.to_string();

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(schema::SELECT_BRANCHES).map_err(wrap_err)?;
                let rows = stmt
                    .query_map([&tenant_str], row_to_branch)
                    .map_err(wrap_err)?;

                let mut branches = Vec::new();
                for row_result in rows {
                    branches.push(row_result.map_err(wrap_err)?);
                }
                Ok(branches)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "Branch"))
    }
}

// ============================================================================
// UserRepository implementation
// ============================================================================

#[async_trait]
impl UserRepository for SqliteRepository {
    async fn create(&self, user: &User) -> Result<()> {
        let user = user.clone();
        let username = user.username.clone();

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                tx.execute(
                    schema::INSERT_USER,
                    rusqlite::params![
                        user.id.to_string(),
                        user.tenant_id.to_string(),
                        user.username,
                        user.password_hash,
                        user.role.as_str(),
                        format_datetime(&user.created_at),
                    ],
                )
                .map_err(wrap_err)?;
                for branch_id in &user.branch_ids {
                    tx.execute(
                        schema::INSERT_USER_BRANCH,
                        rusqlite::params![user.id.to_string(), branch_id.to_string()],
                    )
                    .map_err(wrap_err)?;
                }
                tx.commit().map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "User", username))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let username_owned = username.to_string();

        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(schema::SELECT_USER_BY_USERNAME)
                    .map_err(wrap_err)?;
                let mut user = match stmt.query_row([&username_owned], row_to_user) {
                    Ok(user) => user,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(wrap_err(e)),
                };

                let mut stmt = conn
                    .prepare(schema::SELECT_USER_BRANCHES)
                    .map_err(wrap_err)?;
                let rows = stmt
                    .query_map([&user.id.to_string()], |row| {
                        let branch_id: String = row.get(0)?;
                        super::conversions::parse_uuid(&branch_id)
                    })
                    .map_err(wrap_err)?;
                for row_result in rows {
                    user.branch_ids.push(row_result.map_err(wrap_err)?);
                }

                Ok(Some(user))
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "User"))
    }

    async fn set_role(&self, tenant_id: Uuid, user_id: Uuid, role: Role) -> Result<()> {
        let params = [
            tenant_id.to_string(),
            user_id.to_string(),
            role.as_str().to_string(),
        ];

        self.conn
            .call(move |conn| {
                let updated = conn
                    .execute(
                        schema::UPDATE_USER_ROLE,
                        rusqlite::params_from_iter(params.iter()),
                    )
                    .map_err(wrap_err)?;
                if updated == 0 {
                    return Err(wrap_err(rusqlite::Error::QueryReturnedNoRows));
                }
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "User", user_id.to_string()))
    }

    async fn set_branches(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        branch_ids: Vec<Uuid>,
    ) -> Result<()> {
        let tenant_str = tenant_id.to_string();
        let user_str = user_id.to_string();

        self.conn
            .call(move |conn| {
                let exists: i64 = conn
                    .query_row(
                        schema::SELECT_USER_EXISTS,
                        [&tenant_str, &user_str],
                        |row| row.get(0),
                    )
                    .map_err(wrap_err)?;
                if exists == 0 {
                    return Err(wrap_err(rusqlite::Error::QueryReturnedNoRows));
                }

                let tx = conn.transaction().map_err(wrap_err)?;
                tx.execute(schema::DELETE_USER_BRANCHES, [&user_str])
                    .map_err(wrap_err)?;
                for branch_id in &branch_ids {
                    tx.execute(
                        schema::INSERT_USER_BRANCH,
                        rusqlite::params![user_str, branch_id.to_string()],
                    )
                    .map_err(wrap_err)?;
                }
                tx.commit().map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "User", user_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap()
    }

    async fn repo() -> SqliteRepository {
        SqliteRepository::new_in_memory().await.unwrap()
    }

    async fn seed_patients(repo: &SqliteRepository, tenant_id: Uuid, n: usize) -> Vec<Patient> {
        let mut created = Vec::new();
        for i in 0..n {
            let patient = Patient::new(
                tenant_id,
                format!("First{i}"),
                format!("Last{i}"),
                format!("081000{i:04}"),
            )
            .with_created_at(base_time() + Duration::seconds(i as i64));
            PatientRepository::create(repo, &patient).await.unwrap();
            created.push(patient);
        }
        created
    }

    #[test]
    fn test_build_page_query_shapes() {
        let tenant_id = Uuid::new_v4();

        let (sql, params) = build_page_query(tenant_id, &PageRequest::new(20));
        assert!(sql.contains("WHERE tenant_id = ?"));
        assert!(sql.ends_with("LIMIT 21"));
        assert_eq!(params.len(), 1);

        let request = PageRequest::new(10)
            .with_branch(Uuid::new_v4())
            .with_cursor(Cursor::new(base_time(), Uuid::new_v4()))
            .with_search("Doe");
        let (sql, params) = build_page_query(tenant_id, &request);
        assert!(sql.contains("primary_branch_id = ?"));
        assert!(sql.contains("created_at < ? OR (created_at = ? AND id < ?)"));
        assert!(sql.contains("LOWER(first_name) LIKE ?"));
        assert!(sql.ends_with("LIMIT 11"));
        // tenant + branch + ts twice + id + three search patterns
        assert_eq!(params.len(), 7);
        assert_eq!(params[5], "%doe%");
    }

    #[test]
    fn test_build_count_query_ignores_search() {
        let tenant_id = Uuid::new_v4();
        let (sql, params) = build_count_query(tenant_id, None);
        assert!(!sql.contains("LIKE"));
        assert_eq!(params.len(), 1);

        let (sql, params) = build_count_query(tenant_id, Some(Uuid::new_v4()));
        assert!(sql.contains("primary_branch_id = ?"));
        assert_eq!(params.len(), 2);
    }

    #[tokio::test]
    async fn test_create_and_get_patient() {
        let repo = repo().await;
        let tenant_id = Uuid::new_v4();
        let patient = Patient::new(tenant_id, "John", "Doe", "0812345678")
            .with_primary_branch(Uuid::new_v4())
            .with_created_at(base_time());

        PatientRepository::create(&repo, &patient).await.unwrap();

        let fetched = PatientRepository::get(&repo, tenant_id, patient.id)
            .await
            .unwrap();
        assert_eq!(fetched, Some(patient.clone()));

        // Invisible from another tenant.
        let other = PatientRepository::get(&repo, Uuid::new_v4(), patient.id)
            .await
            .unwrap();
        assert!(other.is_none());
    }

    #[tokio::test]
    async fn test_unique_index_rejects_duplicate_phone() {
        let repo = repo().await;
        let tenant_id = Uuid::new_v4();

        let first = Patient::new(tenant_id, "John", "Doe", "0812345678");
        let second = Patient::new(tenant_id, "Jane", "Smith", "0812345678");

        PatientRepository::create(&repo, &first).await.unwrap();
        // No pre-check here: the constraint itself must produce the conflict.
        let err = PatientRepository::create(&repo, &second)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_same_phone_allowed_across_tenants() {
        let repo = repo().await;

        let a = Patient::new(Uuid::new_v4(), "John", "Doe", "0812345678");
        let b = Patient::new(Uuid::new_v4(), "Jane", "Smith", "0812345678");

        PatientRepository::create(&repo, &a).await.unwrap();
        PatientRepository::create(&repo, &b).await.unwrap();
    }

    #[tokio::test]
    async fn test_find_by_phone() {
        let repo = repo().await;
        let tenant_id = Uuid::new_v4();
        let patient = Patient::new(tenant_id, "John", "Doe", "0812345678");
        PatientRepository::create(&repo, &patient).await.unwrap();

        let found = repo.find_by_phone(tenant_id, "0812345678").await.unwrap();
        assert_eq!(found.map(|p| p.id), Some(patient.id));

        let missing = repo.find_by_phone(tenant_id, "0000000000").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_page_walk_visits_every_patient_once_in_order() {
        let repo = repo().await;
        let tenant_id = Uuid::new_v4();
        seed_patients(&repo, tenant_id, 5).await;

        let mut collected: Vec<Patient> = Vec::new();
        let mut cursor = None;
        let mut pages = 0;

        loop {
            let mut request = PageRequest::new(2);
            if let Some(c) = cursor {
                request = request.with_cursor(c);
            }
            let page = repo.list_page(tenant_id, &request).await.unwrap();
            pages += 1;
            assert_eq!(page.total, 5);
            collected.extend(page.items.clone());

            if !page.has_more {
                assert!(page.next_cursor.is_none());
                break;
            }
            let token = page.next_cursor.expect("has_more implies a cursor");
            cursor = Some(Cursor::decode(&token).unwrap());
        }

        assert_eq!(pages, 3);
        assert_eq!(collected.len(), 5);
        for pair in collected.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
    }

    #[tokio::test]
    async fn test_cursor_tie_break_on_equal_timestamps() {
        let repo = repo().await;
        let tenant_id = Uuid::new_v4();

        // Two patients sharing one creation instant; id breaks the tie.
        let a = Patient::new(tenant_id, "Aaa", "One", "0810000001").with_created_at(base_time());
        let b = Patient::new(tenant_id, "Bbb", "Two", "0810000002").with_created_at(base_time());
        PatientRepository::create(&repo, &a).await.unwrap();
        PatientRepository::create(&repo, &b).await.unwrap();

        let first = repo.list_page(tenant_id, &PageRequest::new(1)).await.unwrap();
        assert_eq!(first.items.len(), 1);
        assert!(first.has_more);

        let token = first.next_cursor.unwrap();
        let request = PageRequest::new(1).with_cursor(Cursor::decode(&token).unwrap());
        let second = repo.list_page(tenant_id, &request).await.unwrap();

        assert_eq!(second.items.len(), 1);
        assert!(!second.has_more);
        assert_ne!(first.items[0].id, second.items[0].id);
        // Descending id order between equal timestamps.
        assert!(first.items[0].id > second.items[0].id);
    }

    #[tokio::test]
    async fn test_search_filters_page_but_not_total() {
        let repo = repo().await;
        let tenant_id = Uuid::new_v4();
        seed_patients(&repo, tenant_id, 5).await;

        let request = PageRequest::new(20).with_search("FIRST3");
        let page = repo.list_page(tenant_id, &request).await.unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].first_name, "First3");
        // Documented asymmetry: total ignores the search term.
        assert_eq!(page.total, 5);
    }

    #[tokio::test]
    async fn test_search_matches_phone_substring() {
        let repo = repo().await;
        let tenant_id = Uuid::new_v4();
        let patient = Patient::new(tenant_id, "John", "Doe", "0812345678");
        PatientRepository::create(&repo, &patient).await.unwrap();

        let request = PageRequest::new(20).with_search("23456");
        let page = repo.list_page(tenant_id, &request).await.unwrap();
        assert_eq!(page.items.len(), 1);
    }

    #[tokio::test]
    async fn test_branch_filter_scopes_page_and_total() {
        let repo = repo().await;
        let tenant_id = Uuid::new_v4();
        let branch_id = Uuid::new_v4();

        seed_patients(&repo, tenant_id, 3).await;
        let branched = Patient::new(tenant_id, "Branched", "Patient", "0815555555")
            .with_primary_branch(branch_id);
        PatientRepository::create(&repo, &branched).await.unwrap();

        let request = PageRequest::new(20).with_branch(branch_id);
        let page = repo.list_page(tenant_id, &request).await.unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total, 1);

        assert_eq!(repo.count(tenant_id, None).await.unwrap(), 4);
        assert_eq!(repo.count(tenant_id, Some(branch_id)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unique_index_rejects_duplicate_appointment() {
        let repo = repo().await;
        let tenant_id = Uuid::new_v4();
        let branch_id = Uuid::new_v4();
        let patient_id = Uuid::new_v4();
        let start_at = base_time() + Duration::days(1);

        let first = Appointment::new(tenant_id, branch_id, patient_id, start_at);
        let second = Appointment::new(tenant_id, branch_id, patient_id, start_at);

        AppointmentRepository::create(&repo, &first).await.unwrap();
        let err = AppointmentRepository::create(&repo, &second)
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        assert!(repo
            .exists(tenant_id, branch_id, patient_id, start_at)
            .await
            .unwrap());
        assert!(!repo
            .exists(tenant_id, branch_id, patient_id, start_at + Duration::hours(1))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_list_appointments_by_branch_and_date() {
        let repo = repo().await;
        let tenant_id = Uuid::new_v4();
        let branch_id = Uuid::new_v4();
        let patient_id = Uuid::new_v4();

        let today_late =
            Appointment::new(tenant_id, branch_id, patient_id, base_time() + Duration::hours(5));
        let today_early =
            Appointment::new(tenant_id, branch_id, patient_id, base_time() + Duration::hours(1));
        let tomorrow =
            Appointment::new(tenant_id, branch_id, patient_id, base_time() + Duration::days(1));

        for appointment in [&today_late, &today_early, &tomorrow] {
            AppointmentRepository::create(&repo, appointment)
                .await
                .unwrap();
        }

        let filter = AppointmentFilter {
            branch_id: Some(branch_id),
            date: Some(base_time().date_naive()),
        };
        let listed = repo.list(tenant_id, &filter).await.unwrap();

        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, today_early.id);
        assert_eq!(listed[1].id, today_late.id);
    }

    #[tokio::test]
    async fn test_unique_index_rejects_duplicate_visit() {
        let repo = repo().await;
        let tenant_id = Uuid::new_v4();
        let patient_id = Uuid::new_v4();
        let branch_id = Uuid::new_v4();

        let first = Visit::new(tenant_id, patient_id, branch_id, base_time());
        let second = Visit::new(tenant_id, patient_id, branch_id, base_time());

        VisitRepository::create(&repo, &first).await.unwrap();
        let err = VisitRepository::create(&repo, &second).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_visit_history_is_descending() {
        let repo = repo().await;
        let tenant_id = Uuid::new_v4();
        let patient_id = Uuid::new_v4();
        let branch_id = Uuid::new_v4();

        for hours in [1, 3, 2] {
            let visit = Visit::new(
                tenant_id,
                patient_id,
                branch_id,
                base_time() + Duration::hours(hours),
            )
            .with_notes(format!("visit at +{hours}h"));
            VisitRepository::create(&repo, &visit).await.unwrap();
        }

        let history = repo.history(tenant_id, patient_id).await.unwrap();
        assert_eq!(history.len(), 3);
        assert!(history[0].visited_at > history[1].visited_at);
        assert!(history[1].visited_at > history[2].visited_at);
        assert_eq!(history[0].notes.as_deref(), Some("visit at +3h"));
    }

    #[tokio::test]
    async fn test_branches_create_and_list() {
        let repo = repo().await;
        let tenant_id = Uuid::new_v4();

        let beta = Branch::new(tenant_id, "Beta Clinic");
        let alpha = Branch::new(tenant_id, "Alpha Clinic");
        BranchRepository::create(&repo, &beta).await.unwrap();
        BranchRepository::create(&repo, &alpha).await.unwrap();

        let listed = BranchRepository::list(&repo, tenant_id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "Alpha Clinic");

        let fetched = BranchRepository::get(&repo, tenant_id, alpha.id)
            .await
            .unwrap();
        assert_eq!(fetched.map(|b| b.id), Some(alpha.id));
    }

    #[tokio::test]
    async fn test_user_roundtrip_with_branches() {
        let repo = repo().await;
        let tenant_id = Uuid::new_v4();
        let branches = vec![Uuid::new_v4(), Uuid::new_v4()];

        let user =
            User::new(tenant_id, "alice", "$argon2id$fake", Role::User).with_branches(branches.clone());
        UserRepository::create(&repo, &user).await.unwrap();

        let fetched = repo.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(fetched.id, user.id);
        assert_eq!(fetched.password_hash, "$argon2id$fake");
        let mut got = fetched.branch_ids.clone();
        let mut want = branches.clone();
        got.sort();
        want.sort();
        assert_eq!(got, want);
    }

    #[tokio::test]
    async fn test_unique_index_rejects_duplicate_username_across_tenants() {
        let repo = repo().await;

        let a = User::new(Uuid::new_v4(), "alice", "hash-a", Role::Admin);
        let b = User::new(Uuid::new_v4(), "alice", "hash-b", Role::Viewer);

        UserRepository::create(&repo, &a).await.unwrap();
        let err = UserRepository::create(&repo, &b).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_set_role_and_branches() {
        let repo = repo().await;
        let tenant_id = Uuid::new_v4();
        let user = User::new(tenant_id, "bob", "hash", Role::Viewer);
        UserRepository::create(&repo, &user).await.unwrap();

        repo.set_role(tenant_id, user.id, Role::Admin).await.unwrap();
        let branches = vec![Uuid::new_v4()];
        repo.set_branches(tenant_id, user.id, branches.clone())
            .await
            .unwrap();

        let fetched = repo.find_by_username("bob").await.unwrap().unwrap();
        assert_eq!(fetched.role, Role::Admin);
        assert_eq!(fetched.branch_ids, branches);

        // Wrong tenant cannot touch the user.
        let err = repo
            .set_role(Uuid::new_v4(), user.id, Role::Viewer)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
