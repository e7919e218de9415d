//! Payment gateway webhook endpoint.
//!
//! The gateway signs the raw request body with HMAC-SHA256 and sends the hex
//! signature in `x-gateway-signature`; that signature is the only
//! authentication on this route. Once a delivery verifies, the endpoint
//! always acknowledges with 200 so the gateway stops retrying: replays,
//! event types we do not handle and orders we do not know are logged
//! no-ops, not errors.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};

use crate::{
    AppState, billing,
    api::models::payments::{PaymentWebhookEvent, WebhookEventKind},
    db::handlers::Payments,
    errors::Error,
    payment_providers,
};

pub const SIGNATURE_HEADER: &str = "x-gateway-signature";

/// Receive a signed payment event from the gateway
#[utoipa::path(
    post,
    path = "/webhooks/payments",
    request_body = PaymentWebhookEvent,
    tag = "webhooks",
    responses(
        (status = 200, description = "Event acknowledged"),
        (status = 400, description = "Missing or invalid signature"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, Error> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| Error::BadRequest {
            message: "Missing webhook signature".to_string(),
        })?;

    let provider = payment_providers::from_config(&state.config)?;
    if !provider.verify_webhook(&body, signature) {
        return Err(Error::BadRequest {
            message: "Invalid webhook signature".to_string(),
        });
    }

    let event: PaymentWebhookEvent = serde_json::from_slice(&body).map_err(|e| Error::BadRequest {
        message: format!("Malformed webhook payload: {e}"),
    })?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let payment = Payments::new(&mut conn)
        .get_by_gateway_order_id(&event.gateway_order_id)
        .await?;
    drop(conn);

    let Some(payment) = payment else {
        tracing::warn!(
            gateway_order_id = %event.gateway_order_id,
            "webhook for unknown gateway order, acknowledging"
        );
        return Ok(StatusCode::OK);
    };

    match event.event {
        WebhookEventKind::PaymentCaptured => {
            match billing::confirm_payment(&state.db, &state.config, payment.id).await {
                Ok(_) => {}
                // Captured after we recorded a failure: acknowledge, keep our state
                Err(Error::Conflict { message }) => {
                    tracing::warn!(payment_id = %payment.id, %message, "ignoring capture for failed payment");
                }
                Err(error) => return Err(error),
            }
        }
        WebhookEventKind::PaymentFailed => {
            billing::fail_payment(&state.db, payment.id).await?;
        }
        WebhookEventKind::Unknown => {
            tracing::debug!(
                gateway_order_id = %event.gateway_order_id,
                "unhandled webhook event type, acknowledging"
            );
        }
    }

    Ok(StatusCode::OK)
}
