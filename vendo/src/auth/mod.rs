//! Authentication and authorization.
//!
//! Browser-based authentication using secure HTTP-only cookies:
//! - Users log in via `/authentication/login` with email/password
//! - A signed JWT carrying the session claims is stored in the cookie
//! - API clients may instead pass the same JWT as `Authorization: Bearer <token>`
//!
//! Authorization is two-tier: platform admins manage plans, users and wallet
//! grants; resellers only touch rows scoped to their own `owner_id`.
//!
//! # Modules
//!
//! - [`current_user`]: Extractor for getting the authenticated user in handlers
//! - [`password`]: Password hashing and verification using Argon2
//! - [`permissions`]: Role-based permission checks
//! - [`session`]: JWT session token creation and verification

pub mod current_user;
pub mod password;
pub mod permissions;
pub mod session;
