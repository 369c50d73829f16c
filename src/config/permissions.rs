// Role-based permissions
// Roles are fixed; each maps to a static permission set

use crate::models::user::UserRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Book appointments, place orders, pay, redeem points
    Purchase,
    /// Create businesses and manage their catalogue, bookings and orders
    ManageOwnBusiness,
    /// Act on any business as if owner
    ManageAnyBusiness,
    ManageUsers,
    AdjustBalances,
    RefundPayments,
    PayoutRewards,
    ViewDashboard,
    /// See every customer's payments, invoices, bookings and orders
    ViewAllRecords,
}

const CUSTOMER: &[Permission] = &[Permission::Purchase];

const BUSINESS: &[Permission] = &[Permission::Purchase, Permission::ManageOwnBusiness];

const ADMIN: &[Permission] = &[
    Permission::ManageAnyBusiness,
    Permission::ManageUsers,
    Permission::AdjustBalances,
    Permission::RefundPayments,
    Permission::PayoutRewards,
    Permission::ViewDashboard,
    Permission::ViewAllRecords,
];

pub struct PermissionConfig;

impl PermissionConfig {
    pub fn permissions_for(role: UserRole) -> &'static [Permission] {
        match role {
            UserRole::Customer => CUSTOMER,
            UserRole::Business => BUSINESS,
            UserRole::Admin => ADMIN,
        }
    }

    pub fn role_has(role: UserRole, permission: Permission) -> bool {
        Self::permissions_for(role).contains(&permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_permissions() {
        assert!(PermissionConfig::role_has(UserRole::Customer, Permission::Purchase));
        assert!(!PermissionConfig::role_has(UserRole::Customer, Permission::ManageOwnBusiness));
        assert!(!PermissionConfig::role_has(UserRole::Customer, Permission::ViewDashboard));
    }

    #[test]
    fn test_business_owners_can_also_buy() {
        assert!(PermissionConfig::role_has(UserRole::Business, Permission::Purchase));
        assert!(PermissionConfig::role_has(UserRole::Business, Permission::ManageOwnBusiness));
        assert!(!PermissionConfig::role_has(UserRole::Business, Permission::ManageAnyBusiness));
    }

    #[test]
    fn test_admin_permissions() {
        for permission in [
            Permission::ManageAnyBusiness,
            Permission::ManageUsers,
            Permission::AdjustBalances,
            Permission::RefundPayments,
            Permission::PayoutRewards,
            Permission::ViewDashboard,
            Permission::ViewAllRecords,
        ] {
            assert!(PermissionConfig::role_has(UserRole::Admin, permission));
        }
        assert!(!PermissionConfig::role_has(UserRole::Admin, Permission::Purchase));
    }
}
