//! Payment provider abstraction.
//!
//! Checkout creates an order at the provider; the client completes payment
//! there and comes back with a signed confirmation, and the provider also
//! pushes signed webhooks. Two implementations exist: the hosted
//! [`GatewayProvider`] and a [`DummyProvider`] for development and tests.

pub mod dummy;
pub mod gateway;

pub use dummy::DummyProvider;
pub use gateway::GatewayProvider;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use sha2::Sha256;

use crate::{
    config::{Config, PaymentConfig},
    errors::Error,
};

/// A freshly created order at the payment provider.
#[derive(Debug, Clone)]
pub struct ProviderOrder {
    pub gateway_order_id: String,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Provider name recorded on payment transactions.
    fn name(&self) -> &'static str;

    /// Create an order for `amount` at the provider and return its id.
    /// `receipt` is our payment transaction id, echoed back for reconciliation.
    async fn create_order(&self, amount: Decimal, receipt: &str) -> Result<ProviderOrder, Error>;

    /// Verify the client-side confirmation signature: hex HMAC-SHA256 of
    /// `"{gateway_order_id}|{gateway_payment_id}"`.
    fn verify_confirmation(&self, gateway_order_id: &str, gateway_payment_id: &str, signature: &str) -> bool;

    /// Verify a webhook delivery's signature over the raw request body.
    fn verify_webhook(&self, body: &[u8], signature: &str) -> bool;
}

/// Build the provider configured for this deployment.
pub fn from_config(config: &Config) -> Result<Box<dyn PaymentProvider>, Error> {
    match &config.payment {
        Some(PaymentConfig::Gateway(gateway)) => Ok(Box::new(GatewayProvider::new(gateway.clone()))),
        Some(PaymentConfig::Dummy(dummy)) => Ok(Box::new(DummyProvider::new(dummy.clone()))),
        None => Err(Error::BadRequest {
            message: "Payments are not configured".to_string(),
        }),
    }
}

/// Constant-time verification of a hex-encoded HMAC-SHA256 signature.
pub(crate) fn verify_hmac_sha256(secret: &[u8], payload: &[u8], signature_hex: &str) -> bool {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret) else {
        return false;
    };
    mac.update(payload);

    let Some(signature) = decode_hex(signature_hex) else {
        return false;
    };
    mac.verify_slice(&signature).is_ok()
}

/// Hex-encoded HMAC-SHA256, used by tests and the dummy provider to produce
/// signatures the verification side accepts.
pub(crate) fn sign_hmac_sha256(secret: &[u8], payload: &[u8]) -> String {
    // HMAC keys of any length are accepted, so this cannot fail
    let mut mac = Hmac::<Sha256>::new_from_slice(secret).unwrap_or_else(|_| unreachable!());
    mac.update(payload);
    mac.finalize()
        .into_bytes()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn decode_hex(input: &str) -> Option<Vec<u8>> {
    if input.len() % 2 != 0 {
        return None;
    }
    (0..input.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(input.get(i..i + 2)?, 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify_roundtrip() {
        let secret = b"test-secret";
        let payload = b"order_1|pay_1";

        let signature = sign_hmac_sha256(secret, payload);
        assert!(verify_hmac_sha256(secret, payload, &signature));
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let signature = sign_hmac_sha256(b"secret-a", b"payload");
        assert!(!verify_hmac_sha256(b"secret-b", b"payload", &signature));
    }

    #[test]
    fn test_verify_rejects_tampered_payload() {
        let signature = sign_hmac_sha256(b"secret", b"payload");
        assert!(!verify_hmac_sha256(b"secret", b"tampered", &signature));
    }

    #[test]
    fn test_verify_rejects_garbage_signature() {
        assert!(!verify_hmac_sha256(b"secret", b"payload", "not-hex"));
        assert!(!verify_hmac_sha256(b"secret", b"payload", "abc"));
        assert!(!verify_hmac_sha256(b"secret", b"payload", ""));
    }
}
