//! SQLite schema definitions and SQL query constants.
//!
//! All SQL statements used by the SQLite repository live here, following
//! the Functional Core pattern - pure data, no I/O. The unique indexes are
//! the authoritative duplicate guards; handler-level pre-checks only narrow
//! the race window.

/// SQL statement to create all tables.
pub const CREATE_TABLES: &str = r#"
-- Patients table
CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    phone_number TEXT NOT NULL,
    primary_branch_id TEXT,
    created_at TEXT NOT NULL
);

-- Appointments table
CREATE TABLE IF NOT EXISTS appointments (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    branch_id TEXT NOT NULL,
    patient_id TEXT NOT NULL,
    start_at TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- Visits table
CREATE TABLE IF NOT EXISTS visits (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    patient_id TEXT NOT NULL,
    branch_id TEXT NOT NULL,
    visited_at TEXT NOT NULL,
    notes TEXT,
    created_at TEXT NOT NULL
);

-- Branches table
CREATE TABLE IF NOT EXISTS branches (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- Users table (usernames are globally unique, across tenants)
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- User to branch associations
CREATE TABLE IF NOT EXISTS user_branches (
    user_id TEXT NOT NULL,
    branch_id TEXT NOT NULL,
    PRIMARY KEY (user_id, branch_id)
);

-- Uniqueness constraints
CREATE UNIQUE INDEX IF NOT EXISTS idx_patients_tenant_phone
    ON patients(tenant_id, phone_number);
CREATE UNIQUE INDEX IF NOT EXISTS idx_appointments_slot
    ON appointments(tenant_id, branch_id, patient_id, start_at);
CREATE UNIQUE INDEX IF NOT EXISTS idx_visits_occurrence
    ON visits(tenant_id, patient_id, branch_id, visited_at);

-- Indexes for efficient queries
CREATE INDEX IF NOT EXISTS idx_patients_tenant_page
    ON patients(tenant_id, created_at DESC, id DESC);
CREATE INDEX IF NOT EXISTS idx_appointments_tenant_start
    ON appointments(tenant_id, start_at);
CREATE INDEX IF NOT EXISTS idx_visits_tenant_patient
    ON visits(tenant_id, patient_id, visited_at DESC);
CREATE INDEX IF NOT EXISTS idx_branches_tenant ON branches(tenant_id);
"#;

// Patient queries
pub const INSERT_PATIENT: &str = r#"
INSERT INTO patients (id, tenant_id, first_name, last_name, phone_number, primary_branch_id, created_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
"#;

pub const SELECT_PATIENT_BY_ID: &str = r#"
SELECT id, tenant_id, first_name, last_name, phone_number, primary_branch_id, created_at
FROM patients
WHERE tenant_id = ?1 AND id = ?2
"#;

pub const SELECT_PATIENT_BY_PHONE: &str = r#"
SELECT id, tenant_id, first_name, last_name, phone_number, primary_branch_id, created_at
FROM patients
WHERE tenant_id = ?1 AND phone_number = ?2
"#;

// Appointment queries
pub const INSERT_APPOINTMENT: &str = r#"
INSERT INTO appointments (id, tenant_id, branch_id, patient_id, start_at, created_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
"#;

pub const SELECT_APPOINTMENT_EXISTS: &str = r#"
SELECT EXISTS(
    SELECT 1 FROM appointments
    WHERE tenant_id = ?1 AND branch_id = ?2 AND patient_id = ?3 AND start_at = ?4
)
"#;

// Visit queries
pub const INSERT_VISIT: &str = r#"
INSERT INTO visits (id, tenant_id, patient_id, branch_id, visited_at, notes, created_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
"#;

pub const SELECT_VISIT_HISTORY: &str = r#"
SELECT id, tenant_id, patient_id, branch_id, visited_at, notes, created_at
FROM visits
WHERE tenant_id = ?1 AND patient_id = ?2
ORDER BY visited_at DESC
"#;

// Branch queries
pub const INSERT_BRANCH: &str = r#"
INSERT INTO branches (id, tenant_id, name, created_at)
VALUES (?1, ?2, ?3, ?4)
"#;

pub const SELECT_BRANCH_BY_ID: &str = r#"
SELECT id, tenant_id, name, created_at
FROM branches
WHERE tenant_id = ?1 AND id = ?2
"#;

pub const SELECT_BRANCHES: &str = r#"
SELECT id, tenant_id, name, created_at
FROM branches
WHERE tenant_id = ?1
ORDER BY name ASC
"#;

// User queries
pub const INSERT_USER: &str = r#"
INSERT INTO users (id, tenant_id, username, password_hash, role, created_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
"#;

pub const SELECT_USER_BY_USERNAME: &str = r#"
SELECT id, tenant_id, username, password_hash, role, created_at
FROM users
WHERE username = ?1
"#;

pub const UPDATE_USER_ROLE: &str = r#"
UPDATE users
SET role = ?3
WHERE tenant_id = ?1 AND id = ?2
"#;

pub const SELECT_USER_EXISTS: &str = r#"
SELECT EXISTS(SELECT 1 FROM users WHERE tenant_id = ?1 AND id = ?2)
"#;

pub const SELECT_USER_BRANCHES: &str = r#"
SELECT branch_id FROM user_branches WHERE user_id = ?1
"#;

pub const DELETE_USER_BRANCHES: &str = r#"
DELETE FROM user_branches WHERE user_id = ?1
"#;

pub const INSERT_USER_BRANCH: &str = r#"
INSERT INTO user_branches (user_id, branch_id) VALUES (?1, ?2)
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tables_defines_expected_tables() {
        for table in ["patients", "appointments", "visits", "branches", "users"] {
            assert!(
                CREATE_TABLES.contains(&format!("CREATE TABLE IF NOT EXISTS {table}")),
                "missing table {table}"
            );
        }
    }

    #[test]
    fn test_create_tables_defines_unique_indexes() {
        assert!(CREATE_TABLES.contains("idx_patients_tenant_phone"));
        assert!(CREATE_TABLES.contains("idx_appointments_slot"));
        assert!(CREATE_TABLES.contains("idx_visits_occurrence"));
        assert!(CREATE_TABLES.contains("username TEXT NOT NULL UNIQUE"));
    }

    #[test]
    fn test_queries_contain_expected_keywords() {
        assert!(INSERT_PATIENT.contains("INSERT"));
        assert!(SELECT_PATIENT_BY_ID.contains("tenant_id = ?1"));
        assert!(SELECT_PATIENT_BY_PHONE.contains("phone_number"));
        assert!(SELECT_APPOINTMENT_EXISTS.contains("EXISTS"));
        assert!(SELECT_VISIT_HISTORY.contains("ORDER BY visited_at DESC"));
        assert!(SELECT_USER_BY_USERNAME.contains("username = ?1"));
        assert!(UPDATE_USER_ROLE.contains("UPDATE"));
    }
}
