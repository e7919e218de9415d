//! Database models for enquiries and their follow-up audit trail.

use crate::types::{EnquiryId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Enquiry lifecycle status, stored as a Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "enquiry_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EnquiryStatus {
    New,
    NeedsFollowUp,
    Converted,
    Dropped,
}

impl EnquiryStatus {
    /// Whether `self -> next` is a legal transition.
    ///
    /// `Converted` and `Dropped` are terminal. `NeedsFollowUp -> NeedsFollowUp`
    /// is allowed so repeated follow-ups can be logged on the audit trail.
    pub fn can_transition_to(self, next: EnquiryStatus) -> bool {
        use EnquiryStatus::*;
        matches!(
            (self, next),
            (New, NeedsFollowUp) | (New, Converted) | (New, Dropped) | (NeedsFollowUp, NeedsFollowUp) | (NeedsFollowUp, Converted) | (NeedsFollowUp, Dropped)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, EnquiryStatus::Converted | EnquiryStatus::Dropped)
    }
}

/// Database request for creating an enquiry
#[derive(Debug, Clone)]
pub struct EnquiryCreateDBRequest {
    pub owner_id: UserId,
    pub customer_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub product_interest: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
}

/// Database request for updating enquiry details. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct EnquiryUpdateDBRequest {
    pub customer_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub product_interest: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
    pub next_follow_up_at: Option<DateTime<Utc>>,
}

/// Database response for an enquiry
#[derive(Debug, Clone, FromRow)]
pub struct EnquiryDBResponse {
    pub id: EnquiryId,
    pub owner_id: UserId,
    pub customer_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub product_interest: Option<String>,
    pub source: Option<String>,
    pub status: EnquiryStatus,
    pub notes: Option<String>,
    pub next_follow_up_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Audit row recorded for each status transition
#[derive(Debug, Clone, FromRow)]
pub struct EnquiryFollowupDBResponse {
    pub id: Uuid,
    pub enquiry_id: EnquiryId,
    pub old_status: EnquiryStatus,
    pub new_status: EnquiryStatus,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_transitions() {
        assert!(EnquiryStatus::New.can_transition_to(EnquiryStatus::NeedsFollowUp));
        assert!(EnquiryStatus::New.can_transition_to(EnquiryStatus::Converted));
        assert!(EnquiryStatus::New.can_transition_to(EnquiryStatus::Dropped));
        assert!(EnquiryStatus::NeedsFollowUp.can_transition_to(EnquiryStatus::Converted));
        assert!(EnquiryStatus::NeedsFollowUp.can_transition_to(EnquiryStatus::Dropped));
    }

    #[test]
    fn test_repeated_follow_up_is_legal() {
        assert!(EnquiryStatus::NeedsFollowUp.can_transition_to(EnquiryStatus::NeedsFollowUp));
    }

    #[test]
    fn test_terminal_statuses_reject_everything() {
        for next in [
            EnquiryStatus::New,
            EnquiryStatus::NeedsFollowUp,
            EnquiryStatus::Converted,
            EnquiryStatus::Dropped,
        ] {
            assert!(!EnquiryStatus::Converted.can_transition_to(next), "converted -> {next:?} should be illegal");
            assert!(!EnquiryStatus::Dropped.can_transition_to(next), "dropped -> {next:?} should be illegal");
        }
    }

    #[test]
    fn test_nothing_moves_back_to_new() {
        assert!(!EnquiryStatus::NeedsFollowUp.can_transition_to(EnquiryStatus::New));
        assert!(!EnquiryStatus::New.can_transition_to(EnquiryStatus::New));
    }
}
