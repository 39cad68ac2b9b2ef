use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Role;

/// Per-request identity, resolved by an external authentication collaborator
/// and trusted unconditionally by the core.
///
/// The context is threaded explicitly through every service call. It is never
/// stored in ambient or task-local state, so a call's tenant scope is always
/// visible at the call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
}

impl RequestContext {
    pub fn new(tenant_id: Uuid, user_id: Uuid, role: Role) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            tenant_id,
            user_id,
            role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contexts_get_distinct_request_ids() {
        let tenant_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let a = RequestContext::new(tenant_id, user_id, Role::Admin);
        let b = RequestContext::new(tenant_id, user_id, Role::Admin);

        assert_ne!(a.request_id, b.request_id);
        assert_eq!(a.tenant_id, b.tenant_id);
    }
}
