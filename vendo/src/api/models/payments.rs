//! API request/response models for payments and gateway webhooks.

use super::pagination::Pagination;
use crate::db::models::payments::{PaymentDBResponse, PaymentStatus};
use crate::types::{PaymentTransactionId, PlanId, SubscriptionId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Client-side confirmation after completing payment at the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentConfirmRequest {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    /// Hex HMAC-SHA256 of `"{gateway_order_id}|{gateway_payment_id}"`.
    pub signature: String,
}

/// Query parameters for listing payment transactions
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListPaymentsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Only return payments with this status
    pub status: Option<PaymentStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: PaymentTransactionId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    #[schema(value_type = String, format = "uuid")]
    pub plan_id: PlanId,
    #[schema(value_type = String, format = "uuid")]
    pub subscription_id: SubscriptionId,
    pub gateway_order_id: Option<String>,
    #[schema(value_type = String)]
    pub amount: Decimal,
    #[schema(value_type = String)]
    pub wallet_amount: Decimal,
    pub status: PaymentStatus,
    pub provider: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Gateway webhook payload. The gateway signs the raw body; the signature
/// travels in the `x-gateway-signature` header.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentWebhookEvent {
    pub event: WebhookEventKind,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
}

/// Gateway event names we act on. The gateway emits many more event types
/// than these; everything else lands on `Unknown` and is acknowledged so the
/// gateway does not retry deliveries we will never handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum WebhookEventKind {
    #[serde(rename = "payment.captured")]
    PaymentCaptured,
    #[serde(rename = "payment.failed")]
    PaymentFailed,
    #[serde(other)]
    Unknown,
}

impl From<PaymentDBResponse> for PaymentResponse {
    fn from(db: PaymentDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            plan_id: db.plan_id,
            subscription_id: db.subscription_id,
            gateway_order_id: db.gateway_order_id,
            amount: db.amount,
            wallet_amount: db.wallet_amount,
            status: db.status,
            provider: db.provider,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_webhook_events_parse_by_wire_name() {
        let event: PaymentWebhookEvent = serde_json::from_str(
            r#"{"event": "payment.captured", "gateway_order_id": "order_1", "gateway_payment_id": "pay_1"}"#,
        )
        .unwrap();
        assert_eq!(event.event, WebhookEventKind::PaymentCaptured);

        let event: PaymentWebhookEvent = serde_json::from_str(
            r#"{"event": "payment.failed", "gateway_order_id": "order_1", "gateway_payment_id": "pay_1"}"#,
        )
        .unwrap();
        assert_eq!(event.event, WebhookEventKind::PaymentFailed);
    }

    #[test]
    fn test_unhandled_webhook_events_parse_as_unknown() {
        for name in ["payment.authorized", "refund.created", "order.paid", ""] {
            let payload = serde_json::json!({
                "event": name,
                "gateway_order_id": "order_1",
                "gateway_payment_id": "pay_1",
            });
            let event: PaymentWebhookEvent = serde_json::from_value(payload).unwrap();
            assert_eq!(event.event, WebhookEventKind::Unknown, "event name {name:?}");
        }
    }
}
