//! Branch administration.

use clinica_core::auth::{Permission, RequestContext};
use clinica_core::clinic::Branch;

use super::{ClinicService, NewBranch, Result, ServiceError};

impl ClinicService {
    /// Opens a new branch in the caller's tenant.
    pub async fn create_branch(&self, ctx: &RequestContext, payload: NewBranch) -> Result<Branch> {
        self.require(ctx, Permission::ManageBranches)?;

        let name = payload.name.trim();
        if name.is_empty() {
            return Err(ServiceError::Validation("name is required".into()));
        }

        let branch = Branch::new(ctx.tenant_id, name);
        self.branches.create(&branch).await?;

        tracing::info!(
            request_id = %ctx.request_id,
            branch_id = %branch.id,
            "Branch created"
        );
        Ok(branch)
    }

    /// Lists the tenant's branches, ordered by name.
    pub async fn list_branches(&self, ctx: &RequestContext) -> Result<Vec<Branch>> {
        self.require(ctx, Permission::ViewBranch)?;

        let branches = self.branches.list(ctx.tenant_id).await?;
        Ok(branches)
    }
}

#[cfg(all(test, feature = "inmemory"))]
mod tests {
    use clinica_core::auth::Role;

    use crate::service::testing::{ctx, ctx_for_tenant, service};
    use crate::service::{NewBranch, ServiceError};

    #[tokio::test]
    async fn test_create_and_list_branches() {
        let service = service();
        let admin = ctx(Role::Admin);

        for name in ["Beta Clinic", "Alpha Clinic"] {
            service
                .create_branch(&admin, NewBranch { name: name.into() })
                .await
                .unwrap();
        }

        let viewer = ctx_for_tenant(admin.tenant_id, Role::Viewer);
        let branches = service.list_branches(&viewer).await.unwrap();
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[0].name, "Alpha Clinic");
    }

    #[tokio::test]
    async fn test_create_branch_rejects_blank_name() {
        let service = service();
        let err = service
            .create_branch(&ctx(Role::Admin), NewBranch { name: "  ".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_only_admin_manages_branches() {
        let service = service();
        let err = service
            .create_branch(
                &ctx(Role::User),
                NewBranch {
                    name: "Main".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { .. }));
    }
}
