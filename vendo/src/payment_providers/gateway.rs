//! Hosted payment gateway client.
//!
//! Talks to the gateway's REST API over HTTP basic auth. Amounts are sent in
//! minor units (paise), matching the gateway's wire format.

use async_trait::async_trait;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

use super::{PaymentProvider, ProviderOrder, verify_hmac_sha256};
use crate::{config::GatewayConfig, errors::Error};

pub struct GatewayProvider {
    config: GatewayConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    /// Amount in minor units.
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateOrderResponse {
    id: String,
}

impl GatewayProvider {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn orders_url(&self) -> Result<url::Url, Error> {
        self.config.base_url.join("orders").map_err(|e| Error::PaymentGateway {
            message: format!("Invalid payment gateway base URL: {e}"),
        })
    }
}

#[async_trait]
impl PaymentProvider for GatewayProvider {
    fn name(&self) -> &'static str {
        "gateway"
    }

    #[tracing::instrument(skip(self), fields(amount = %amount))]
    async fn create_order(&self, amount: Decimal, receipt: &str) -> Result<ProviderOrder, Error> {
        let minor_units = (amount * Decimal::from(100))
            .trunc()
            .to_i64()
            .ok_or_else(|| Error::BadRequest {
                message: "Payment amount out of range".to_string(),
            })?;

        let response = self
            .client
            .post(self.orders_url()?)
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&CreateOrderRequest {
                amount: minor_units,
                currency: "INR",
                receipt,
            })
            .send()
            .await
            .map_err(|e| Error::PaymentGateway {
                message: format!("Failed to reach payment gateway: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, %body, "payment gateway rejected order creation");
            return Err(Error::PaymentGateway {
                message: format!("Payment gateway returned {status}"),
            });
        }

        let order: CreateOrderResponse = response.json().await.map_err(|e| Error::PaymentGateway {
            message: format!("Invalid payment gateway response: {e}"),
        })?;

        Ok(ProviderOrder {
            gateway_order_id: order.id,
        })
    }

    fn verify_confirmation(&self, gateway_order_id: &str, gateway_payment_id: &str, signature: &str) -> bool {
        let payload = format!("{gateway_order_id}|{gateway_payment_id}");
        verify_hmac_sha256(self.config.key_secret.as_bytes(), payload.as_bytes(), signature)
    }

    fn verify_webhook(&self, body: &[u8], signature: &str) -> bool {
        verify_hmac_sha256(self.config.webhook_secret.as_bytes(), body, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment_providers::sign_hmac_sha256;
    use rust_decimal::Decimal;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, header_exists, method, path},
    };

    fn test_config(base_url: &str) -> GatewayConfig {
        GatewayConfig {
            key_id: "key_test_123".to_string(),
            key_secret: "secret_test_456".to_string(),
            webhook_secret: "whsec_test_789".to_string(),
            base_url: base_url.parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_create_order_sends_minor_units() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .and(header_exists("authorization"))
            .and(body_partial_json(serde_json::json!({
                "amount": 49_900,
                "currency": "INR",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "order_abc123",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = GatewayProvider::new(test_config(&format!("{}/", server.uri())));
        let order = provider
            .create_order(Decimal::new(49900, 2), "receipt-1")
            .await
            .unwrap();

        assert_eq!(order.gateway_order_id, "order_abc123");
    }

    #[tokio::test]
    async fn test_create_order_surfaces_gateway_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
            .mount(&server)
            .await;

        let provider = GatewayProvider::new(test_config(&format!("{}/", server.uri())));
        let result = provider.create_order(Decimal::new(10000, 2), "receipt-1").await;

        assert!(matches!(result, Err(Error::PaymentGateway { .. })));
    }

    #[test]
    fn test_confirmation_signature_matches_order_pipe_payment() {
        let provider = GatewayProvider::new(test_config("https://gateway.test/"));

        let signature = sign_hmac_sha256(b"secret_test_456", b"order_1|pay_1");
        assert!(provider.verify_confirmation("order_1", "pay_1", &signature));
        assert!(!provider.verify_confirmation("order_1", "pay_2", &signature));
    }

    #[test]
    fn test_webhook_signature_uses_webhook_secret() {
        let provider = GatewayProvider::new(test_config("https://gateway.test/"));
        let body = br#"{"event":"payment.captured"}"#;

        let signature = sign_hmac_sha256(b"whsec_test_789", body);
        assert!(provider.verify_webhook(body, &signature));

        let wrong = sign_hmac_sha256(b"secret_test_456", body);
        assert!(!provider.verify_webhook(body, &wrong));
    }
}
