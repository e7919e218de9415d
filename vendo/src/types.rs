//! Common type definitions.
//!
//! This module defines:
//! - Type aliases for entity IDs (UserId, CustomerId, etc.)
//! - Resource and operation enums used in permission errors
//!
//! All entity IDs are UUIDs wrapped in type aliases for better type safety.

use std::fmt;
use uuid::Uuid;

// Type aliases for IDs
pub type UserId = Uuid;
pub type CustomerId = Uuid;
pub type ProductId = Uuid;
pub type OrderId = Uuid;
pub type OrderItemId = Uuid;
pub type EnquiryId = Uuid;
pub type PlanId = Uuid;
pub type SubscriptionId = Uuid;
pub type PaymentTransactionId = Uuid;
pub type ReferralId = Uuid;
pub type NotificationId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

// Operations that can be performed on resources
// *-All means unrestricted access, *-Own means restricted to own resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateAll,
    CreateOwn,
    ReadAll,
    ReadOwn,
    UpdateAll,
    UpdateOwn,
    DeleteAll,
    DeleteOwn,
}

// Resources that can be operated on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Users,
    Customers,
    Products,
    Orders,
    Enquiries,
    Plans,
    Subscriptions,
    Wallet,
    Referrals,
    Notifications,
    Payments,
}

// Permission requirement reported in authorization errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permission {
    Allow(Resource, Operation),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::CreateAll | Operation::CreateOwn => write!(f, "Create"),
            Operation::ReadAll | Operation::ReadOwn => write!(f, "Read"),
            Operation::UpdateAll | Operation::UpdateOwn => write!(f, "Update"),
            Operation::DeleteAll | Operation::DeleteOwn => write!(f, "Delete"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abbrev_uuid() {
        let id: Uuid = "550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
        assert_eq!(abbrev_uuid(&id), "550e8400");
    }

    #[test]
    fn test_operation_display_collapses_scope() {
        assert_eq!(Operation::ReadAll.to_string(), "Read");
        assert_eq!(Operation::ReadOwn.to_string(), "Read");
        assert_eq!(Operation::DeleteOwn.to_string(), "Delete");
    }
}
