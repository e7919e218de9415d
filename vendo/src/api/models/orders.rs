//! API request/response models for orders.

use super::pagination::Pagination;
use crate::db::models::orders::{OrderDBResponse, OrderItemDBResponse, OrderStatus};
use crate::types::{CustomerId, EnquiryId, OrderId, OrderItemId, ProductId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Line item in an order create request. Unit price comes from the product
/// catalogue at creation time, not from the client.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemCreate {
    #[schema(value_type = String, format = "uuid")]
    pub product_id: ProductId,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderCreate {
    #[schema(value_type = String, format = "uuid")]
    pub customer_id: CustomerId,
    pub items: Vec<OrderItemCreate>,
    #[serde(default)]
    #[schema(value_type = String)]
    pub discount: Decimal,
    pub notes: Option<String>,
}

/// Request body for PATCHing an order's status.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: OrderItemId,
    #[schema(value_type = String, format = "uuid")]
    pub product_id: ProductId,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub unit_price: Decimal,
    #[schema(value_type = String)]
    pub line_total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: OrderId,
    #[schema(value_type = String, format = "uuid")]
    pub owner_id: UserId,
    #[schema(value_type = String, format = "uuid")]
    pub customer_id: CustomerId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub enquiry_id: Option<EnquiryId>,
    pub status: OrderStatus,
    #[schema(value_type = String)]
    pub subtotal: Decimal,
    #[schema(value_type = String)]
    pub discount: Decimal,
    #[schema(value_type = String)]
    pub total: Decimal,
    pub notes: Option<String>,
    /// Line items, included on single-order fetches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<OrderItemResponse>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Query parameters for listing orders
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListOrdersQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Filter by status
    pub status: Option<OrderStatus>,
}

impl From<OrderItemDBResponse> for OrderItemResponse {
    fn from(db: OrderItemDBResponse) -> Self {
        Self {
            id: db.id,
            product_id: db.product_id,
            quantity: db.quantity,
            unit_price: db.unit_price,
            line_total: db.line_total,
        }
    }
}

impl From<OrderDBResponse> for OrderResponse {
    fn from(db: OrderDBResponse) -> Self {
        Self {
            id: db.id,
            owner_id: db.owner_id,
            customer_id: db.customer_id,
            enquiry_id: db.enquiry_id,
            status: db.status,
            subtotal: db.subtotal,
            discount: db.discount,
            total: db.total,
            notes: db.notes,
            items: None, // Included only on single-order fetches
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

impl OrderResponse {
    pub fn with_items(mut self, items: Vec<OrderItemResponse>) -> Self {
        self.items = Some(items);
        self
    }
}
