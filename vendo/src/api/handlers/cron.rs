//! Scheduled maintenance endpoint.
//!
//! An external scheduler hits this route on an interval. It is authenticated
//! by a shared bearer token from configuration; when no token is configured
//! the endpoint refuses every call rather than running unauthenticated.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    AppState,
    db::{
        handlers::{Enquiries, Notifications, Subscriptions},
        models::notifications::NotificationCreateDBRequest,
    },
    errors::Error,
};

/// What a maintenance run did.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CronRunResponse {
    /// Active subscriptions whose period had lapsed and were expired
    pub expired_subscriptions: usize,
    /// New enquiries older than the follow-up window that were flagged
    pub flagged_enquiries: usize,
}

/// Run scheduled maintenance
///
/// Expires lapsed subscriptions and flags stale enquiries for follow-up.
/// Requires the configured cron secret as a bearer token.
#[utoipa::path(
    post,
    path = "/internal/cron/run",
    tag = "cron",
    responses(
        (status = 200, description = "Maintenance completed", body = CronRunResponse),
        (status = 401, description = "Missing or invalid cron secret"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn run_maintenance(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CronRunResponse>, Error> {
    authorize(&state, &headers)?;

    let now = Utc::now();
    let stale_before = now - state.config.enquiries.follow_up_after;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let expired = Subscriptions::new(&mut conn).expire_lapsed(now).await?;
    let flagged = Enquiries::new(&mut conn).flag_stale(stale_before).await?;

    tracing::info!(
        expired_subscriptions = expired.len(),
        flagged_enquiries = flagged.len(),
        "maintenance run completed"
    );

    // Best effort: failed notifications must not fail the run
    for subscription in &expired {
        if let Err(error) = Notifications::new(&mut conn)
            .create(&NotificationCreateDBRequest {
                user_id: subscription.user_id,
                kind: "subscription".to_string(),
                title: "Subscription expired".to_string(),
                body: "Your subscription period has ended. Renew to keep access.".to_string(),
            })
            .await
        {
            tracing::warn!(%error, subscription_id = %subscription.id, "failed to notify expired subscription");
        }
    }
    for enquiry in &flagged {
        if let Err(error) = Notifications::new(&mut conn)
            .create(&NotificationCreateDBRequest {
                user_id: enquiry.owner_id,
                kind: "enquiry".to_string(),
                title: "Enquiry needs follow-up".to_string(),
                body: format!("The enquiry from {} has had no activity", enquiry.customer_name),
            })
            .await
        {
            tracing::warn!(%error, enquiry_id = %enquiry.id, "failed to notify stale enquiry");
        }
    }

    Ok(Json(CronRunResponse {
        expired_subscriptions: expired.len(),
        flagged_enquiries: flagged.len(),
    }))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), Error> {
    let Some(secret) = &state.config.cron.secret else {
        return Err(Error::Unauthenticated {
            message: Some("Cron endpoint is not configured".to_string()),
        });
    };

    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match presented {
        Some(token) if token == secret => Ok(()),
        _ => Err(Error::Unauthenticated {
            message: Some("Invalid cron secret".to_string()),
        }),
    }
}
