//! API request/response models for enquiries.

use super::pagination::Pagination;
use crate::db::models::enquiries::{
    EnquiryCreateDBRequest, EnquiryDBResponse, EnquiryFollowupDBResponse, EnquiryStatus, EnquiryUpdateDBRequest,
};
use crate::types::{CustomerId, EnquiryId, ProductId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnquiryCreate {
    pub customer_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub product_interest: Option<String>,
    /// Where the lead came from, e.g. "whatsapp", "walk-in", "instagram".
    pub source: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnquiryUpdate {
    pub customer_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub product_interest: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
    pub next_follow_up_at: Option<DateTime<Utc>>,
}

/// Request body for PATCHing an enquiry's status.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnquiryStatusUpdate {
    pub status: EnquiryStatus,
    /// Optional note recorded on the follow-up audit trail.
    pub note: Option<String>,
}

/// Line item for converting an enquiry into an order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnquiryConvertItem {
    #[schema(value_type = String, format = "uuid")]
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Request body for converting an enquiry into an order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnquiryConvertRequest {
    /// Existing customer to attach the order to. When absent, a customer is
    /// created from the enquiry's contact details.
    #[schema(value_type = Option<String>, format = "uuid")]
    pub customer_id: Option<CustomerId>,
    pub items: Vec<EnquiryConvertItem>,
    #[serde(default)]
    #[schema(value_type = String)]
    pub discount: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnquiryResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: EnquiryId,
    #[schema(value_type = String, format = "uuid")]
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

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnquiryFollowupResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    #[schema(value_type = String, format = "uuid")]
    pub enquiry_id: EnquiryId,
    pub old_status: EnquiryStatus,
    pub new_status: EnquiryStatus,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Query parameters for listing enquiries
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListEnquiriesQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Filter by status
    pub status: Option<EnquiryStatus>,
}

impl EnquiryCreate {
    pub fn into_db_request(self, owner_id: UserId) -> EnquiryCreateDBRequest {
        EnquiryCreateDBRequest {
            owner_id,
            customer_name: self.customer_name,
            phone: self.phone,
            email: self.email,
            product_interest: self.product_interest,
            source: self.source,
            notes: self.notes,
        }
    }
}

impl From<EnquiryUpdate> for EnquiryUpdateDBRequest {
    fn from(update: EnquiryUpdate) -> Self {
        Self {
            customer_name: update.customer_name,
            phone: update.phone,
            email: update.email,
            product_interest: update.product_interest,
            source: update.source,
            notes: update.notes,
            next_follow_up_at: update.next_follow_up_at,
        }
    }
}

impl From<EnquiryDBResponse> for EnquiryResponse {
    fn from(db: EnquiryDBResponse) -> Self {
        Self {
            id: db.id,
            owner_id: db.owner_id,
            customer_name: db.customer_name,
            phone: db.phone,
            email: db.email,
            product_interest: db.product_interest,
            source: db.source,
            status: db.status,
            notes: db.notes,
            next_follow_up_at: db.next_follow_up_at,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

impl From<EnquiryFollowupDBResponse> for EnquiryFollowupResponse {
    fn from(db: EnquiryFollowupDBResponse) -> Self {
        Self {
            id: db.id,
            enquiry_id: db.enquiry_id,
            old_status: db.old_status,
            new_status: db.new_status,
            note: db.note,
            created_at: db.created_at,
        }
    }
}
