//! Repository implementations for database access.
//!
//! This module provides repository structs for each major entity in the system.
//! Repositories follow a consistent pattern and (where the entity is plain CRUD)
//! implement the [`Repository`] trait.
//!
//! # Design Pattern
//!
//! Each repository:
//! - Wraps a SQLx connection or transaction
//! - Provides strongly-typed CRUD operations
//! - Handles query construction and parameter binding
//! - Returns domain models from [`crate::db::models`]
//! - Uses the connection's transaction for ACID guarantees
//!
//! # Common Pattern
//!
//! All repositories follow this usage pattern:
//!
//! ```ignore
//! use vendo::db::handlers::{Customers, Repository};
//!
//! async fn example(pool: &sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//!     // Start a transaction
//!     let mut tx = pool.begin().await?;
//!
//!     // Create repository from transaction
//!     let mut repo = Customers::new(&mut tx);
//!
//!     // Perform operations
//!     let customers = repo.list(&filter).await?;
//!
//!     // Commit or rollback
//!     tx.commit().await?;
//!     Ok(())
//! }
//! ```

pub mod customers;
pub mod enquiries;
pub mod notifications;
pub mod orders;
pub mod password_reset_tokens;
pub mod payments;
pub mod plans;
pub mod products;
pub mod referrals;
pub mod repository;
pub mod subscriptions;
pub mod users;
pub mod wallet;

pub use customers::Customers;
pub use enquiries::Enquiries;
pub use notifications::Notifications;
pub use orders::Orders;
pub use password_reset_tokens::PasswordResetTokens;
pub use payments::Payments;
pub use plans::Plans;
pub use products::Products;
pub use referrals::Referrals;
pub use repository::Repository;
pub use subscriptions::Subscriptions;
pub use users::Users;
pub use wallet::Wallet;
