//! OpenAPI documentation for the management API.
//!
//! Schemas are collected automatically from the path annotations; this module
//! only declares the document skeleton and the session security scheme. The
//! rendered documentation is served at `/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

use crate::api;

/// Session cookie security scheme.
///
/// The same JWT is also accepted as a bearer token in the `Authorization`
/// header for non-browser clients.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "session_token".to_string(),
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "vendo_session",
                    "Session JWT issued by /authentication/login. \
                     Also accepted as `Authorization: Bearer <token>`.",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vendo API",
        description = "Business management API for resellers: customers, products, \
                       enquiries, orders, subscriptions, wallet and referrals.",
    ),
    paths(
        api::handlers::auth::get_registration_info,
        api::handlers::auth::register,
        api::handlers::auth::get_login_info,
        api::handlers::auth::login,
        api::handlers::auth::logout,
        api::handlers::auth::request_password_reset,
        api::handlers::auth::confirm_password_reset,
        api::handlers::auth::change_password,
        api::handlers::config::get_config,
        api::handlers::cron::run_maintenance,
        api::handlers::customers::create_customer,
        api::handlers::customers::list_customers,
        api::handlers::customers::get_customer,
        api::handlers::customers::update_customer,
        api::handlers::customers::delete_customer,
        api::handlers::enquiries::create_enquiry,
        api::handlers::enquiries::list_enquiries,
        api::handlers::enquiries::get_enquiry,
        api::handlers::enquiries::update_enquiry,
        api::handlers::enquiries::update_enquiry_status,
        api::handlers::enquiries::list_enquiry_followups,
        api::handlers::enquiries::convert_enquiry,
        api::handlers::notifications::list_notifications,
        api::handlers::notifications::unread_count,
        api::handlers::notifications::mark_read,
        api::handlers::notifications::mark_all_read,
        api::handlers::orders::create_order,
        api::handlers::orders::list_orders,
        api::handlers::orders::get_order,
        api::handlers::orders::update_order_status,
        api::handlers::orders::delete_order,
        api::handlers::orders::get_order_invoice,
        api::handlers::payments::confirm_payment,
        api::handlers::payments::list_payments,
        api::handlers::plans::list_plans,
        api::handlers::plans::get_plan,
        api::handlers::plans::create_plan,
        api::handlers::plans::update_plan,
        api::handlers::plans::retire_plan,
        api::handlers::products::create_product,
        api::handlers::products::list_products,
        api::handlers::products::get_product,
        api::handlers::products::update_product,
        api::handlers::products::delete_product,
        api::handlers::referrals::get_referral_summary,
        api::handlers::subscriptions::checkout,
        api::handlers::subscriptions::list_subscriptions,
        api::handlers::users::get_me,
        api::handlers::users::list_users,
        api::handlers::users::get_user,
        api::handlers::users::update_user,
        api::handlers::users::delete_user,
        api::handlers::wallet::get_balance,
        api::handlers::wallet::list_transactions,
        api::handlers::wallet::grant,
        api::handlers::webhooks::payment_webhook,
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and password management"),
        (name = "config", description = "Public application configuration"),
        (name = "customers", description = "End-customer records"),
        (name = "products", description = "Product catalogue"),
        (name = "enquiries", description = "Leads and follow-up tracking"),
        (name = "orders", description = "Orders, line items and invoices"),
        (name = "plans", description = "Subscription plan catalogue"),
        (name = "subscriptions", description = "Subscription checkout and listing"),
        (name = "payments", description = "Payment confirmation and history"),
        (name = "wallet", description = "Wallet balance and ledger"),
        (name = "referrals", description = "Referral program"),
        (name = "notifications", description = "In-app notifications"),
        (name = "users", description = "Account management"),
        (name = "webhooks", description = "Signed gateway callbacks"),
        (name = "cron", description = "Scheduled maintenance"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_builds() {
        let doc = ApiDoc::openapi();
        let json = doc.to_json().unwrap();

        assert!(json.contains("/api/v1/orders/{id}/invoice"));
        assert!(json.contains("/webhooks/payments"));
        assert!(json.contains("session_token"));
    }
}
