//! Shared fixtures for tests.
//!
//! Only compiled for tests; gives DB tests quick ways to mint users, plans
//! and products, plus a config that passes validation without touching the
//! environment.

use std::sync::OnceLock;

use rust_decimal::Decimal;
use sqlx::PgConnection;

use crate::api::models::users::Role;
use crate::auth::password;
use crate::config::{Config, DummyConfig, EmailTransportConfig, PaymentConfig};
use crate::db::handlers::{Plans, Products, Repository, Users};
use crate::db::models::{
    plans::{PlanCreateDBRequest, PlanDBResponse},
    products::{ProductCreateDBRequest, ProductDBResponse},
    users::{UserCreateDBRequest, UserDBResponse},
};
use crate::types::UserId;

/// Password every test user is created with.
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Config with everything tests need enabled: a signing key, the dummy
/// payment provider, a cron secret, and file email delivery into the
/// system temp directory.
pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.secret_key = Some("test-secret-key-with-enough-entropy".to_string());
    config.payment = Some(PaymentConfig::Dummy(DummyConfig {
        webhook_secret: "test-webhook-secret".to_string(),
    }));
    config.cron.secret = Some("test-cron-secret-0123456789".to_string());
    config.auth.native.email.transport = EmailTransportConfig::File {
        path: std::env::temp_dir().to_string_lossy().into_owned(),
    };
    // The Prometheus layer installs a process-global metrics recorder, which
    // can only happen once; tests build many apps in one process.
    config.enable_metrics = false;
    config
}

/// Argon2 is deliberately slow, so the shared test password is hashed once.
fn test_password_hash() -> String {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| password::hash_string(TEST_PASSWORD).unwrap()).clone()
}

pub async fn create_test_reseller(conn: &mut PgConnection, name: &str) -> UserDBResponse {
    Users::new(conn)
        .create(&UserCreateDBRequest {
            username: name.to_string(),
            email: format!("{name}@example.com"),
            display_name: Some(name.to_string()),
            business_name: None,
            phone: None,
            is_admin: false,
            role: Role::Reseller,
            auth_source: "native".to_string(),
            password_hash: Some(test_password_hash()),
            referral_code: Some(crate::crypto::generate_referral_code()),
            referred_by: None,
        })
        .await
        .unwrap()
}

pub async fn create_test_admin(conn: &mut PgConnection, name: &str) -> UserDBResponse {
    Users::new(conn)
        .create(&UserCreateDBRequest {
            username: name.to_string(),
            email: format!("{name}@example.com"),
            display_name: Some(name.to_string()),
            business_name: None,
            phone: None,
            is_admin: true,
            role: Role::PlatformAdmin,
            auth_source: "native".to_string(),
            password_hash: Some(test_password_hash()),
            referral_code: None,
            referred_by: None,
        })
        .await
        .unwrap()
}

pub async fn create_test_plan(conn: &mut PgConnection, code: &str) -> PlanDBResponse {
    Plans::new(conn)
        .create(&PlanCreateDBRequest {
            code: code.to_string(),
            name: format!("{code} plan"),
            description: None,
            price: Decimal::new(49900, 2),
            duration_days: 30,
        })
        .await
        .unwrap()
}

pub async fn create_test_product(conn: &mut PgConnection, owner_id: UserId, name: &str) -> ProductDBResponse {
    Products::new(conn)
        .create(&ProductCreateDBRequest {
            owner_id,
            name: name.to_string(),
            description: None,
            sku: None,
            price: Decimal::new(19999, 2),
            stock: 10,
            image_urls: vec![],
        })
        .await
        .unwrap()
}
