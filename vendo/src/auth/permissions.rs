//! Role-based permission checks.
//!
//! Two roles exist: platform admins hold every permission; resellers hold
//! Own-scoped permissions on their business data plus read access to the
//! public plan catalogue. Handlers combine these checks with owner-id
//! filtering so a reseller can never reach another tenant's rows.

use crate::api::models::users::{CurrentUser, Role};
use crate::errors::Error;
use crate::types::{Operation, Permission, Resource, UserId};

pub fn has_permission(user: &CurrentUser, resource: Resource, operation: Operation) -> bool {
    if user.is_admin || user.role == Role::PlatformAdmin {
        return true;
    }

    match operation {
        Operation::CreateOwn | Operation::ReadOwn | Operation::UpdateOwn | Operation::DeleteOwn => matches!(
            resource,
            Resource::Customers
                | Resource::Products
                | Resource::Orders
                | Resource::Enquiries
                | Resource::Subscriptions
                | Resource::Wallet
                | Resource::Referrals
                | Resource::Notifications
                | Resource::Payments
                | Resource::Users
        ),
        // The plan catalogue is readable by every authenticated user
        Operation::ReadAll => matches!(resource, Resource::Plans),
        Operation::CreateAll | Operation::UpdateAll | Operation::DeleteAll => false,
    }
}

/// Like [`has_permission`] but returns the authorization error directly.
pub fn ensure(user: &CurrentUser, resource: Resource, operation: Operation) -> Result<(), Error> {
    if has_permission(user, resource, operation) {
        Ok(())
    } else {
        Err(Error::InsufficientPermissions {
            required: Permission::Allow(resource, operation),
            action: operation,
            resource: format!("{resource:?}"),
        })
    }
}

/// Owner filter for list queries: admins see every tenant, resellers only
/// their own rows.
pub fn owner_scope(user: &CurrentUser) -> Option<UserId> {
    if user.is_admin || user.role == Role::PlatformAdmin {
        None
    } else {
        Some(user.id)
    }
}

/// Guard for admin-only endpoints.
pub fn require_admin(user: &CurrentUser, resource: Resource, operation: Operation) -> Result<(), Error> {
    if user.is_admin || user.role == Role::PlatformAdmin {
        Ok(())
    } else {
        Err(Error::InsufficientPermissions {
            required: Permission::Allow(resource, operation),
            action: operation,
            resource: format!("{resource:?}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn reseller() -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            username: "reseller".to_string(),
            email: "reseller@example.com".to_string(),
            role: Role::Reseller,
            is_admin: false,
            display_name: None,
        }
    }

    fn admin() -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            username: "admin".to_string(),
            email: "admin@example.com".to_string(),
            role: Role::PlatformAdmin,
            is_admin: true,
            display_name: None,
        }
    }

    #[test]
    fn test_admin_has_everything() {
        let user = admin();
        assert!(has_permission(&user, Resource::Plans, Operation::CreateAll));
        assert!(has_permission(&user, Resource::Wallet, Operation::UpdateAll));
        assert!(require_admin(&user, Resource::Plans, Operation::CreateAll).is_ok());
    }

    #[test]
    fn test_reseller_own_scope_only() {
        let user = reseller();
        assert!(has_permission(&user, Resource::Customers, Operation::CreateOwn));
        assert!(has_permission(&user, Resource::Orders, Operation::ReadOwn));
        assert!(!has_permission(&user, Resource::Customers, Operation::ReadAll));
        assert!(!has_permission(&user, Resource::Plans, Operation::CreateAll));
    }

    #[test]
    fn test_reseller_can_read_plan_catalogue() {
        let user = reseller();
        assert!(has_permission(&user, Resource::Plans, Operation::ReadAll));
    }

    #[test]
    fn test_require_admin_rejects_reseller() {
        let user = reseller();
        let err = require_admin(&user, Resource::Wallet, Operation::CreateAll).unwrap_err();
        assert!(matches!(err, Error::InsufficientPermissions { .. }));
    }
}
