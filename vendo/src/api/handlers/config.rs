//! Public application configuration endpoint.
//!
//! Unauthenticated; exposes only what the dashboard needs before login.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::AppState;

/// Configuration the dashboard may see without authenticating.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicConfigResponse {
    /// Application name for branding
    pub app_name: String,
    /// Organization name, if configured
    pub organization: Option<String>,
    /// Support contact shown in the UI
    pub support_email: Option<String>,
    /// Whether self-registration is open
    pub registration_enabled: bool,
    /// Whether the referral program is running
    pub referrals_enabled: bool,
}

/// Get public application configuration
#[utoipa::path(
    get,
    path = "/api/v1/config",
    tag = "config",
    responses(
        (status = 200, description = "Public configuration", body = PublicConfigResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_config(State(state): State<AppState>) -> Json<PublicConfigResponse> {
    let config = &state.config;
    Json(PublicConfigResponse {
        app_name: config.metadata.app_name.clone(),
        organization: config.metadata.organization.clone(),
        support_email: config.metadata.support_email.clone(),
        registration_enabled: config.auth.native.enabled && config.auth.native.allow_registration,
        referrals_enabled: config.referrals.enabled,
    })
}
