//! API request/response models for referrals.

use crate::db::models::referrals::{ReferralDBResponse, ReferralStatus};
use crate::types::{ReferralId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReferralResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ReferralId,
    #[schema(value_type = String, format = "uuid")]
    pub referrer_id: UserId,
    #[schema(value_type = String, format = "uuid")]
    pub referee_id: UserId,
    pub status: ReferralStatus,
    #[schema(value_type = Option<String>)]
    pub reward_amount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub rewarded_at: Option<DateTime<Utc>>,
}

/// The caller's referral standing: their shareable code plus everyone they
/// have referred.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReferralSummaryResponse {
    pub referral_code: Option<String>,
    pub referrals: Vec<ReferralResponse>,
    #[schema(value_type = String)]
    pub total_rewarded: Decimal,
}

impl From<ReferralDBResponse> for ReferralResponse {
    fn from(db: ReferralDBResponse) -> Self {
        Self {
            id: db.id,
            referrer_id: db.referrer_id,
            referee_id: db.referee_id,
            status: db.status,
            reward_amount: db.reward_amount,
            created_at: db.created_at,
            rewarded_at: db.rewarded_at,
        }
    }
}
