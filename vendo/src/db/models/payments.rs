//! Database models for payment transactions.

use crate::types::{PaymentTransactionId, PlanId, SubscriptionId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Payment transaction status, stored as a Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Created,
    Success,
    Failed,
}

/// Database request for creating a payment transaction
#[derive(Debug, Clone)]
pub struct PaymentCreateDBRequest {
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub subscription_id: SubscriptionId,
    pub gateway_order_id: Option<String>,
    pub amount: Decimal,
    /// Portion of `amount` covered by wallet balance at confirmation time.
    pub wallet_amount: Decimal,
    pub provider: String,
}

/// Database response for a payment transaction
#[derive(Debug, Clone, FromRow)]
pub struct PaymentDBResponse {
    pub id: PaymentTransactionId,
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub subscription_id: SubscriptionId,
    pub gateway_order_id: Option<String>,
    pub amount: Decimal,
    pub wallet_amount: Decimal,
    pub status: PaymentStatus,
    pub provider: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
