//! Database record models matching table schemas.
//!
//! This module contains struct definitions that directly correspond to database
//! table rows. These models are used by repositories to return query results
//! and accept insertion/update data.
//!
//! # Design Principles
//!
//! - **Schema Mapping**: Each model struct matches a database table schema
//! - **SQLx Integration**: Models derive `sqlx::FromRow` for query results
//! - **Separation**: Database models are distinct from API models to allow
//!   independent evolution of storage and API representations
//! - **Type Safety**: Uses type aliases for IDs (UserId, CustomerId, etc.)

pub mod customers;
pub mod enquiries;
pub mod notifications;
pub mod orders;
pub mod password_reset_tokens;
pub mod payments;
pub mod plans;
pub mod products;
pub mod referrals;
pub mod subscriptions;
pub mod users;
pub mod wallet;
