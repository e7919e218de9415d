//! Database repository for subscriptions.

use crate::types::{SubscriptionId, UserId, abbrev_uuid};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::subscriptions::{SubscriptionCreateDBRequest, SubscriptionDBResponse, SubscriptionStatus},
};
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use tracing::instrument;

/// Filter for listing subscriptions
#[derive(Debug, Clone)]
pub struct SubscriptionFilter {
    pub user_id: Option<UserId>,
    pub status: Option<SubscriptionStatus>,
    pub skip: i64,
    pub limit: i64,
}

impl SubscriptionFilter {
    pub fn new(user_id: Option<UserId>, skip: i64, limit: i64) -> Self {
        Self {
            user_id,
            status: None,
            skip,
            limit,
        }
    }
}

/// Status and period-end changes applied by the billing flow.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionUpdateDBRequest {
    pub status: Option<SubscriptionStatus>,
    pub current_period_end: Option<DateTime<Utc>>,
}

pub struct Subscriptions<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Subscriptions<'c> {
    type CreateRequest = SubscriptionCreateDBRequest;
    type UpdateRequest = SubscriptionUpdateDBRequest;
    type Response = SubscriptionDBResponse;
    type Id = SubscriptionId;
    type Filter = SubscriptionFilter;

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let subscription = sqlx::query_as::<_, SubscriptionDBResponse>(
            "INSERT INTO subscriptions (user_id, plan_id) VALUES ($1, $2) RETURNING *",
        )
        .bind(request.user_id)
        .bind(request.plan_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(subscription)
    }

    #[instrument(skip(self), fields(subscription_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let subscription = sqlx::query_as::<_, SubscriptionDBResponse>("SELECT * FROM subscriptions WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(subscription)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let subscriptions = sqlx::query_as::<_, SubscriptionDBResponse>(
            r#"
            SELECT * FROM subscriptions
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::subscription_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.user_id)
        .bind(filter.status)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(subscriptions)
    }

    #[instrument(skip(self), fields(subscription_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(subscription_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let subscription = sqlx::query_as::<_, SubscriptionDBResponse>(
            r#"
            UPDATE subscriptions SET
                status = COALESCE($2, status),
                current_period_end = COALESCE($3, current_period_end),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.status)
        .bind(request.current_period_end)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(subscription)
    }
}

impl<'c> Subscriptions<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Total rows matching the filter, ignoring pagination.
    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &SubscriptionFilter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM subscriptions
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::subscription_status IS NULL OR status = $2)
            "#,
        )
        .bind(filter.user_id)
        .bind(filter.status)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(count)
    }

    /// The user's active subscription, if any.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn get_active_for_user(&mut self, user_id: UserId) -> Result<Option<SubscriptionDBResponse>> {
        let subscription = sqlx::query_as::<_, SubscriptionDBResponse>(
            "SELECT * FROM subscriptions WHERE user_id = $1 AND status = 'active' ORDER BY created_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(subscription)
    }

    /// Expire active subscriptions whose period has lapsed.
    /// Returns the subscriptions that were expired.
    #[instrument(skip(self), err)]
    pub async fn expire_lapsed(&mut self, now: DateTime<Utc>) -> Result<Vec<SubscriptionDBResponse>> {
        let expired = sqlx::query_as::<_, SubscriptionDBResponse>(
            r#"
            UPDATE subscriptions
            SET status = 'expired', updated_at = NOW()
            WHERE status = 'active' AND current_period_end IS NOT NULL AND current_period_end < $1
            RETURNING *
            "#,
        )
        .bind(now)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_plan, create_test_reseller};
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_new_subscription_is_pending(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = create_test_reseller(&mut conn, "subuser").await;
        let plan = create_test_plan(&mut conn, "starter").await;

        let mut repo = Subscriptions::new(&mut conn);
        let sub = repo
            .create(&SubscriptionCreateDBRequest {
                user_id: user.id,
                plan_id: plan.id,
            })
            .await
            .unwrap();

        assert_eq!(sub.status, SubscriptionStatus::Pending);
        assert!(sub.current_period_end.is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_expire_lapsed_only_touches_overdue_active(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = create_test_reseller(&mut conn, "expuser").await;
        let plan = create_test_plan(&mut conn, "starter").await;

        let mut repo = Subscriptions::new(&mut conn);
        let request = SubscriptionCreateDBRequest {
            user_id: user.id,
            plan_id: plan.id,
        };
        let lapsed = repo.create(&request).await.unwrap();
        let current = repo.create(&request).await.unwrap();
        let pending = repo.create(&request).await.unwrap();

        let now = Utc::now();
        repo.update(
            lapsed.id,
            &SubscriptionUpdateDBRequest {
                status: Some(SubscriptionStatus::Active),
                current_period_end: Some(now - chrono::Duration::days(1)),
            },
        )
        .await
        .unwrap();
        repo.update(
            current.id,
            &SubscriptionUpdateDBRequest {
                status: Some(SubscriptionStatus::Active),
                current_period_end: Some(now + chrono::Duration::days(10)),
            },
        )
        .await
        .unwrap();

        let expired = repo.expire_lapsed(now).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, lapsed.id);
        assert_eq!(expired[0].status, SubscriptionStatus::Expired);

        assert_eq!(
            repo.get_by_id(current.id).await.unwrap().unwrap().status,
            SubscriptionStatus::Active
        );
        assert_eq!(
            repo.get_by_id(pending.id).await.unwrap().unwrap().status,
            SubscriptionStatus::Pending
        );
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_get_active_for_user(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = create_test_reseller(&mut conn, "activeuser").await;
        let plan = create_test_plan(&mut conn, "starter").await;

        let mut repo = Subscriptions::new(&mut conn);
        assert!(repo.get_active_for_user(user.id).await.unwrap().is_none());

        let sub = repo
            .create(&SubscriptionCreateDBRequest {
                user_id: user.id,
                plan_id: plan.id,
            })
            .await
            .unwrap();
        repo.update(
            sub.id,
            &SubscriptionUpdateDBRequest {
                status: Some(SubscriptionStatus::Active),
                current_period_end: Some(Utc::now() + chrono::Duration::days(30)),
            },
        )
        .await
        .unwrap();

        let active = repo.get_active_for_user(user.id).await.unwrap().unwrap();
        assert_eq!(active.id, sub.id);
    }
}
