//! API layer for HTTP request handling and data models.
//!
//! This module contains the REST API implementation, organized into:
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! The API is divided into several functional areas:
//!
//! - **Authentication** (`/authentication/*`): Login, registration, password management
//! - **Customers** (`/api/v1/customers/*`): End-customer records
//! - **Products** (`/api/v1/products/*`): Catalogue management
//! - **Enquiries** (`/api/v1/enquiries/*`): Lead tracking and follow-ups
//! - **Orders** (`/api/v1/orders/*`): Orders, line items, and invoices
//! - **Billing** (`/api/v1/plans/*`, `/api/v1/subscriptions/*`, `/api/v1/payments/*`):
//!   Subscription checkout and payment confirmation
//! - **Wallet & Referrals** (`/api/v1/wallet/*`, `/api/v1/referrals/*`)
//! - **Webhooks** (`/webhooks/payments`): Signed gateway callbacks
//! - **Cron** (`/internal/cron/run`): Bearer-token scheduled maintenance
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with OpenAPI annotations using `utoipa`.
//! API documentation is available at `/docs` when the server is running.

pub mod handlers;
pub mod models;
