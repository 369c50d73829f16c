// Caller identity injected by `auth_middleware`

use uuid::Uuid;

use crate::config::{Permission, PermissionConfig};
use crate::models::user::UserRole;
use crate::utils::service_error::ServiceError;

/// Authenticated user information extracted from a validated access token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub token_id: String,
    pub email: String,
    pub role: UserRole,
    pub exp: u64,
}

impl AuthenticatedUser {
    pub fn has_permission(&self, permission: Permission) -> bool {
        PermissionConfig::role_has(self.role, permission)
    }

    pub fn require(&self, permission: Permission) -> Result<(), ServiceError> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            tracing::debug!(
                "User {} ({}) lacks permission {:?}",
                self.user_id,
                self.role,
                permission
            );
            Err(ServiceError::forbidden("Insufficient permissions"))
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Owner of the resource, or a role that may act on any business
    pub fn can_manage_business(&self, owner_id: Uuid) -> bool {
        self.has_permission(Permission::ManageAnyBusiness)
            || (self.has_permission(Permission::ManageOwnBusiness) && self.user_id == owner_id)
    }

    pub fn require_business_manager(&self, owner_id: Uuid) -> Result<(), ServiceError> {
        if self.can_manage_business(owner_id) {
            Ok(())
        } else {
            Err(ServiceError::forbidden("Only the business owner or an admin may do this"))
        }
    }

    /// Customer-side ownership check, with admins allowed through
    pub fn can_view_customer_record(&self, customer_id: Uuid) -> bool {
        self.user_id == customer_id || self.has_permission(Permission::ViewAllRecords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: Uuid::new_v4(),
            token_id: Uuid::new_v4().to_string(),
            email: "x@example.com".to_string(),
            role,
            exp: u64::MAX,
        }
    }

    #[test]
    fn test_business_manager_checks() {
        let owner = user(UserRole::Business);
        let other_owner = user(UserRole::Business);
        let admin = user(UserRole::Admin);
        let customer = user(UserRole::Customer);

        assert!(owner.can_manage_business(owner.user_id));
        assert!(!other_owner.can_manage_business(owner.user_id));
        assert!(admin.can_manage_business(owner.user_id));
        // a customer id matching the owner id still lacks the permission
        assert!(!customer.can_manage_business(customer.user_id));
    }

    #[test]
    fn test_require_returns_forbidden() {
        let customer = user(UserRole::Customer);
        let err = customer.require(Permission::ViewDashboard).unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        assert!(customer.require(Permission::Purchase).is_ok());
    }

    #[test]
    fn test_customer_record_visibility() {
        let customer = user(UserRole::Customer);
        let admin = user(UserRole::Admin);
        let stranger = user(UserRole::Customer);

        assert!(customer.can_view_customer_record(customer.user_id));
        assert!(admin.can_view_customer_record(customer.user_id));
        assert!(!stranger.can_view_customer_record(customer.user_id));
    }
}
