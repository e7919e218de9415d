//! Referral summary endpoint.

use axum::{Json, extract::State};

use crate::{
    AppState,
    api::models::{
        referrals::{ReferralResponse, ReferralSummaryResponse},
        users::CurrentUser,
    },
    auth::permissions::ensure,
    db::handlers::{Referrals, Repository, Users},
    errors::Error,
    types::{Operation, Resource},
};

/// Get the authenticated user's referral standing
#[utoipa::path(
    get,
    path = "/api/v1/referrals",
    tag = "referrals",
    responses(
        (status = 200, description = "Referral code and referred accounts", body = ReferralSummaryResponse),
        (status = 401, description = "Not authenticated"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_referral_summary(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<ReferralSummaryResponse>, Error> {
    ensure(&current_user, Resource::Referrals, Operation::ReadOwn)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let user = Users::new(&mut conn)
        .get_by_id(current_user.id)
        .await?
        .ok_or_else(|| Error::Unauthenticated {
            message: Some("User not found".to_string()),
        })?;

    let referrals = Referrals::new(&mut conn).list_for_referrer(current_user.id).await?;

    let total_rewarded = referrals.iter().filter_map(|r| r.reward_amount).sum();

    Ok(Json(ReferralSummaryResponse {
        referral_code: user.referral_code,
        referrals: referrals.into_iter().map(ReferralResponse::from).collect(),
        total_rewarded,
    }))
}
