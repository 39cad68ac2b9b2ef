//! Staff account management and authentication.

use clinica_core::auth::{Permission, RequestContext, Role};
use clinica_core::clinic::User;
use uuid::Uuid;

use crate::password::{hash_password, verify_password};

use super::{ClinicService, Credentials, NewUser, Result, ServiceError};

impl ClinicService {
    /// Creates a staff account in the caller's tenant.
    ///
    /// Usernames are unique across all tenants. The lookup pre-check gives
    /// the common duplicate a descriptive error; the storage constraint
    /// covers concurrent creations.
    pub async fn create_user(&self, ctx: &RequestContext, payload: NewUser) -> Result<User> {
        self.require(ctx, Permission::ManageUsers)?;

        let username = payload.username.trim();
        if username.len() < 3 {
            return Err(ServiceError::Validation(
                "username must be at least 3 characters".into(),
            ));
        }
        if payload.password.len() < 6 {
            return Err(ServiceError::Validation(
                "password must be at least 6 characters".into(),
            ));
        }

        if self.users.find_by_username(username).await?.is_some() {
            return Err(ServiceError::Conflict {
                entity_type: "User",
                detail: format!("username {username} already exists"),
            });
        }

        let password_hash =
            hash_password(&payload.password).map_err(|e| ServiceError::Internal(e.to_string()))?;
        let user = User::new(ctx.tenant_id, username, password_hash, payload.role)
            .with_branches(payload.branch_ids);
        self.users.create(&user).await?;

        tracing::info!(
            request_id = %ctx.request_id,
            user_id = %user.id,
            role = %user.role,
            "User created"
        );
        Ok(user)
    }

    /// Replaces a user's role.
    pub async fn assign_role(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        role: Role,
    ) -> Result<()> {
        self.require(ctx, Permission::ManageUsers)?;

        self.users.set_role(ctx.tenant_id, user_id, role).await?;
        tracing::info!(
            request_id = %ctx.request_id,
            user_id = %user_id,
            role = %role,
            "Role assigned"
        );
        Ok(())
    }

    /// Replaces a user's branch associations.
    pub async fn associate_branches(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        branch_ids: Vec<Uuid>,
    ) -> Result<()> {
        self.require(ctx, Permission::ManageUsers)?;

        self.users
            .set_branches(ctx.tenant_id, user_id, branch_ids)
            .await?;
        Ok(())
    }

    /// Verifies credentials and returns the account on success.
    ///
    /// Returns `Ok(None)` for an unknown username and for a wrong password
    /// alike, so the response does not reveal which usernames exist. Runs
    /// before any tenant is known, hence no `RequestContext`.
    pub async fn authenticate(&self, credentials: Credentials) -> Result<Option<User>> {
        let user = match self.users.find_by_username(&credentials.username).await? {
            Some(user) => user,
            None => return Ok(None),
        };

        let valid = verify_password(&credentials.password, &user.password_hash)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        if valid {
            Ok(Some(user))
        } else {
            tracing::debug!(user_id = %user.id, "Password verification failed");
            Ok(None)
        }
    }
}
