//! HTTP request handlers for all API endpoints.
//!
//! This module contains Axum route handlers organized by resource type.
//! Each handler is responsible for:
//! - Request validation and deserialization
//! - Authentication and authorization checks
//! - Business logic execution via database repositories
//! - Response serialization
//!
//! # Handler Modules
//!
//! - [`auth`]: Authentication, login, registration, and password management
//! - [`config`]: Public application configuration retrieval
//! - [`cron`]: Bearer-token scheduled maintenance endpoint
//! - [`customers`]: Customer CRUD operations
//! - [`enquiries`]: Enquiry CRUD, status transitions, and conversion to orders
//! - [`notifications`]: Notification listing and read tracking
//! - [`orders`]: Order creation, status transitions, and invoices
//! - [`payments`]: Payment confirmation and transaction history
//! - [`plans`]: Plan catalogue management
//! - [`products`]: Product catalogue CRUD operations
//! - [`referrals`]: Referral summaries
//! - [`subscriptions`]: Subscription checkout and listing
//! - [`users`]: User CRUD operations and profile management
//! - [`wallet`]: Wallet balance, history, and admin grants
//! - [`webhooks`]: Signed payment gateway callbacks
//!
//! # Authentication
//!
//! Most handlers require authentication via the session cookie or a bearer
//! JWT. The [`crate::auth::current_user`] extractor gives handlers the
//! authenticated user.
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`] which automatically converts to
//! appropriate HTTP status codes and JSON error responses.

pub mod auth;
pub mod config;
pub mod cron;
pub mod customers;
pub mod enquiries;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod plans;
pub mod products;
pub mod referrals;
pub mod subscriptions;
pub mod users;
pub mod wallet;
pub mod webhooks;
