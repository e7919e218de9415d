//! Local stand-in for the hosted gateway.
//!
//! Orders get a locally generated id and confirmation signatures are still
//! checked, keyed on the webhook secret, so the full checkout and webhook
//! flow can be exercised without gateway credentials.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{PaymentProvider, ProviderOrder, verify_hmac_sha256};
use crate::{config::DummyConfig, errors::Error};

pub struct DummyProvider {
    config: DummyConfig,
}

impl DummyProvider {
    pub fn new(config: DummyConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PaymentProvider for DummyProvider {
    fn name(&self) -> &'static str {
        "dummy"
    }

    async fn create_order(&self, _amount: Decimal, _receipt: &str) -> Result<ProviderOrder, Error> {
        Ok(ProviderOrder {
            gateway_order_id: format!("dummy_order_{}", Uuid::new_v4().simple()),
        })
    }

    fn verify_confirmation(&self, gateway_order_id: &str, gateway_payment_id: &str, signature: &str) -> bool {
        let payload = format!("{gateway_order_id}|{gateway_payment_id}");
        verify_hmac_sha256(self.config.webhook_secret.as_bytes(), payload.as_bytes(), signature)
    }

    fn verify_webhook(&self, body: &[u8], signature: &str) -> bool {
        verify_hmac_sha256(self.config.webhook_secret.as_bytes(), body, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment_providers::sign_hmac_sha256;

    fn provider() -> DummyProvider {
        DummyProvider::new(DummyConfig {
            webhook_secret: "dummy-webhook-secret".to_string(),
        })
    }

    #[tokio::test]
    async fn test_orders_get_unique_local_ids() {
        let provider = provider();
        let a = provider.create_order(Decimal::new(100, 0), "r1").await.unwrap();
        let b = provider.create_order(Decimal::new(100, 0), "r2").await.unwrap();

        assert!(a.gateway_order_id.starts_with("dummy_order_"));
        assert_ne!(a.gateway_order_id, b.gateway_order_id);
    }

    #[test]
    fn test_confirmation_keyed_on_webhook_secret() {
        let provider = provider();
        let signature = sign_hmac_sha256(b"dummy-webhook-secret", b"order_x|pay_y");

        assert!(provider.verify_confirmation("order_x", "pay_y", &signature));
        assert!(!provider.verify_confirmation("order_x", "pay_z", &signature));
    }
}
