use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A staff role. Determines which operations a request may perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
    Viewer,
}

/// A single grantable capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewPatient,
    CreatePatient,
    ViewAppointment,
    CreateAppointment,
    RecordVisit,
    ViewBranch,
    ManageBranches,
    ManageUsers,
}

impl Role {
    /// The permissions granted to this role.
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            Role::Admin => &[
                Permission::ViewPatient,
                Permission::CreatePatient,
                Permission::ViewAppointment,
                Permission::CreateAppointment,
                Permission::RecordVisit,
                Permission::ViewBranch,
                Permission::ManageBranches,
                Permission::ManageUsers,
            ],
            Role::User => &[
                Permission::ViewPatient,
                Permission::CreatePatient,
                Permission::ViewAppointment,
                Permission::CreateAppointment,
                Permission::RecordVisit,
                Permission::ViewBranch,
            ],
            Role::Viewer => &[
                Permission::ViewPatient,
                Permission::ViewAppointment,
                Permission::ViewBranch,
            ],
        }
    }

    /// Returns true if this role grants the given permission.
    pub fn has(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    /// Stable lowercase name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
            Role::Viewer => "viewer",
        }
    }
}

impl Permission {
    /// Stable snake_case name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ViewPatient => "view_patient",
            Permission::CreatePatient => "create_patient",
            Permission::ViewAppointment => "view_appointment",
            Permission::CreateAppointment => "create_appointment",
            Permission::RecordVisit => "record_visit",
            Permission::ViewBranch => "view_branch",
            Permission::ManageBranches => "manage_branches",
            Permission::ManageUsers => "manage_users",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            "viewer" => Ok(Role::Viewer),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_has_all_permissions() {
        for permission in [
            Permission::ViewPatient,
            Permission::CreatePatient,
            Permission::ViewAppointment,
            Permission::CreateAppointment,
            Permission::RecordVisit,
            Permission::ViewBranch,
            Permission::ManageBranches,
            Permission::ManageUsers,
        ] {
            assert!(Role::Admin.has(permission), "admin missing {permission:?}");
        }
    }

    #[test]
    fn test_user_cannot_manage_users_or_branches() {
        assert!(Role::User.has(Permission::CreatePatient));
        assert!(Role::User.has(Permission::RecordVisit));
        assert!(!Role::User.has(Permission::ManageUsers));
        assert!(!Role::User.has(Permission::ManageBranches));
    }

    #[test]
    fn test_viewer_is_read_only() {
        assert!(Role::Viewer.has(Permission::ViewPatient));
        assert!(Role::Viewer.has(Permission::ViewAppointment));
        assert!(!Role::Viewer.has(Permission::CreatePatient));
        assert!(!Role::Viewer.has(Permission::CreateAppointment));
        assert!(!Role::Viewer.has(Permission::RecordVisit));
    }

    #[test]
    fn test_role_roundtrips_through_str() {
        for role in [Role::Admin, Role::User, Role::Viewer] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("superuser".parse::<Role>().is_err());
    }
}
