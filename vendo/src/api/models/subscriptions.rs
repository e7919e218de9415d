//! API request/response models for subscriptions and checkout.

use super::pagination::Pagination;
use crate::db::models::subscriptions::{SubscriptionDBResponse, SubscriptionStatus};
use crate::types::{PlanId, SubscriptionId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Request body for starting a subscription checkout.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    #[schema(value_type = String, format = "uuid")]
    pub plan_id: PlanId,
    /// Apply available wallet balance towards the price.
    #[serde(default)]
    pub use_wallet: bool,
}

/// Result of a checkout: either a gateway order to pay, or an already-active
/// subscription when the wallet covered the full price.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckoutResponse {
    pub subscription: SubscriptionResponse,
    /// Gateway order id to complete payment against; `None` when the wallet
    /// covered the full amount and no gateway step is needed.
    pub gateway_order_id: Option<String>,
    /// Amount still due at the gateway.
    #[schema(value_type = String)]
    pub amount_due: Decimal,
    /// Amount that will be drawn from the wallet on confirmation.
    #[schema(value_type = String)]
    pub wallet_amount: Decimal,
}

/// Query parameters for listing subscriptions
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListSubscriptionsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Only return subscriptions with this status
    pub status: Option<SubscriptionStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: SubscriptionId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    #[schema(value_type = String, format = "uuid")]
    pub plan_id: PlanId,
    pub status: SubscriptionStatus,
    pub current_period_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SubscriptionDBResponse> for SubscriptionResponse {
    fn from(db: SubscriptionDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            plan_id: db.plan_id,
            status: db.status,
            current_period_end: db.current_period_end,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
