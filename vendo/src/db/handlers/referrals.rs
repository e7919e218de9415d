//! Database repository for referrals.

use crate::types::{ReferralId, UserId, abbrev_uuid};
use crate::db::{
    errors::{DbError, Result},
    models::referrals::{ReferralCreateDBRequest, ReferralDBResponse, ReferralStatus},
};
use rust_decimal::Decimal;
use sqlx::PgConnection;
use tracing::instrument;

pub struct Referrals<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Referrals<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(referrer_id = %abbrev_uuid(&request.referrer_id)), err)]
    pub async fn create(&mut self, request: &ReferralCreateDBRequest) -> Result<ReferralDBResponse> {
        let referral = sqlx::query_as::<_, ReferralDBResponse>(
            "INSERT INTO referrals (referrer_id, referee_id) VALUES ($1, $2) RETURNING *",
        )
        .bind(request.referrer_id)
        .bind(request.referee_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(referral)
    }

    #[instrument(skip(self), fields(referral_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: ReferralId) -> Result<Option<ReferralDBResponse>> {
        let referral = sqlx::query_as::<_, ReferralDBResponse>("SELECT * FROM referrals WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(referral)
    }

    #[instrument(skip(self), fields(referee_id = %abbrev_uuid(&referee_id)), err)]
    pub async fn get_by_referee(&mut self, referee_id: UserId) -> Result<Option<ReferralDBResponse>> {
        let referral = sqlx::query_as::<_, ReferralDBResponse>("SELECT * FROM referrals WHERE referee_id = $1")
            .bind(referee_id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(referral)
    }

    #[instrument(skip(self), fields(referrer_id = %abbrev_uuid(&referrer_id)), err)]
    pub async fn list_for_referrer(&mut self, referrer_id: UserId) -> Result<Vec<ReferralDBResponse>> {
        let referrals = sqlx::query_as::<_, ReferralDBResponse>(
            "SELECT * FROM referrals WHERE referrer_id = $1 ORDER BY created_at DESC",
        )
        .bind(referrer_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(referrals)
    }

    /// Flip a pending referral to rewarded, recording the amount. Returns
    /// `None` if the referral was already rewarded, which makes the reward
    /// a one-shot even under concurrent confirmations.
    #[instrument(skip(self), fields(referral_id = %abbrev_uuid(&id), amount = %amount), err)]
    pub async fn mark_rewarded(&mut self, id: ReferralId, amount: Decimal) -> Result<Option<ReferralDBResponse>> {
        let referral = sqlx::query_as::<_, ReferralDBResponse>(
            r#"
            UPDATE referrals
            SET status = 'rewarded', reward_amount = $2, rewarded_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(amount)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(referral)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_reseller;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_referee_can_only_be_referred_once(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let referrer_a = create_test_reseller(&mut conn, "ref_a").await;
        let referrer_b = create_test_reseller(&mut conn, "ref_b").await;
        let referee = create_test_reseller(&mut conn, "referee").await;

        let mut repo = Referrals::new(&mut conn);
        repo.create(&ReferralCreateDBRequest {
            referrer_id: referrer_a.id,
            referee_id: referee.id,
        })
        .await
        .unwrap();

        let err = repo
            .create(&ReferralCreateDBRequest {
                referrer_id: referrer_b.id,
                referee_id: referee.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_mark_rewarded_is_one_shot(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let referrer = create_test_reseller(&mut conn, "rewarder").await;
        let referee = create_test_reseller(&mut conn, "rewardee").await;

        let mut repo = Referrals::new(&mut conn);
        let referral = repo
            .create(&ReferralCreateDBRequest {
                referrer_id: referrer.id,
                referee_id: referee.id,
            })
            .await
            .unwrap();
        assert_eq!(referral.status, ReferralStatus::Pending);

        let rewarded = repo
            .mark_rewarded(referral.id, Decimal::new(10000, 2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rewarded.status, ReferralStatus::Rewarded);
        assert_eq!(rewarded.reward_amount, Some(Decimal::new(10000, 2)));
        assert!(rewarded.rewarded_at.is_some());

        // Second attempt finds no pending row
        let again = repo.mark_rewarded(referral.id, Decimal::new(10000, 2)).await.unwrap();
        assert!(again.is_none());
    }
}
