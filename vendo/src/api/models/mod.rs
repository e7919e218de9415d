//! API request and response data models.
//!
//! These models define the public API contract and are distinct from the
//! database models, so the wire format and storage representation can evolve
//! independently. All models carry `utoipa` annotations for the generated
//! OpenAPI document.

pub mod auth;
pub mod customers;
pub mod enquiries;
pub mod notifications;
pub mod orders;
pub mod pagination;
pub mod payments;
pub mod plans;
pub mod products;
pub mod referrals;
pub mod subscriptions;
pub mod users;
pub mod wallet;
