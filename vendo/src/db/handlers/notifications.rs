//! Database repository for in-app notifications.

use crate::types::{NotificationId, UserId, abbrev_uuid};
use crate::db::{
    errors::Result,
    models::notifications::{NotificationCreateDBRequest, NotificationDBResponse},
};
use sqlx::PgConnection;
use tracing::instrument;

/// Filter for listing notifications
#[derive(Debug, Clone)]
pub struct NotificationFilter {
    pub user_id: UserId,
    /// When true, only unread notifications are returned.
    pub unread_only: bool,
    pub skip: i64,
    pub limit: i64,
}

impl NotificationFilter {
    pub fn new(user_id: UserId, skip: i64, limit: i64) -> Self {
        Self {
            user_id,
            unread_only: false,
            skip,
            limit,
        }
    }
}

pub struct Notifications<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Notifications<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id), kind = %request.kind), err)]
    pub async fn create(&mut self, request: &NotificationCreateDBRequest) -> Result<NotificationDBResponse> {
        let notification = sqlx::query_as::<_, NotificationDBResponse>(
            "INSERT INTO notifications (user_id, kind, title, body) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(request.user_id)
        .bind(&request.kind)
        .bind(&request.title)
        .bind(&request.body)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(notification)
    }

    #[instrument(skip(self, filter), fields(user_id = %abbrev_uuid(&filter.user_id)), err)]
    pub async fn list(&mut self, filter: &NotificationFilter) -> Result<Vec<NotificationDBResponse>> {
        let notifications = sqlx::query_as::<_, NotificationDBResponse>(
            r#"
            SELECT * FROM notifications
            WHERE user_id = $1 AND (NOT $2 OR read_at IS NULL)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.user_id)
        .bind(filter.unread_only)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(notifications)
    }

    /// Total rows matching the filter, ignoring pagination.
    #[instrument(skip(self, filter), fields(user_id = %abbrev_uuid(&filter.user_id)), err)]
    pub async fn count(&mut self, filter: &NotificationFilter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND (NOT $2 OR read_at IS NULL)",
        )
        .bind(filter.user_id)
        .bind(filter.unread_only)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(count)
    }

    /// Mark one notification read, scoped to its owner. Returns the updated
    /// row, or `None` when the id does not exist or belongs to someone else.
    #[instrument(skip(self), fields(notification_id = %abbrev_uuid(&id)), err)]
    pub async fn mark_read(&mut self, id: NotificationId, user_id: UserId) -> Result<Option<NotificationDBResponse>> {
        let notification = sqlx::query_as::<_, NotificationDBResponse>(
            r#"
            UPDATE notifications SET read_at = COALESCE(read_at, NOW())
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(notification)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn mark_all_read(&mut self, user_id: UserId) -> Result<u64> {
        let result = sqlx::query("UPDATE notifications SET read_at = NOW() WHERE user_id = $1 AND read_at IS NULL")
            .bind(user_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn unread_count(&mut self, user_id: UserId) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read_at IS NULL")
                .bind(user_id)
                .fetch_one(&mut *self.db)
                .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_reseller;
    use sqlx::PgPool;

    fn notify(user_id: UserId, title: &str) -> NotificationCreateDBRequest {
        NotificationCreateDBRequest {
            user_id,
            kind: "subscription".to_string(),
            title: title.to_string(),
            body: "body".to_string(),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unread_filter_and_counts(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = create_test_reseller(&mut conn, "notifuser").await;
        let mut repo = Notifications::new(&mut conn);

        let first = repo.create(&notify(user.id, "first")).await.unwrap();
        repo.create(&notify(user.id, "second")).await.unwrap();
        assert_eq!(repo.unread_count(user.id).await.unwrap(), 2);

        repo.mark_read(first.id, user.id).await.unwrap().unwrap();
        assert_eq!(repo.unread_count(user.id).await.unwrap(), 1);

        let mut filter = NotificationFilter::new(user.id, 0, 50);
        filter.unread_only = true;
        let unread = repo.list(&filter).await.unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].title, "second");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_mark_read_is_owner_scoped(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let owner = create_test_reseller(&mut conn, "notifowner").await;
        let other = create_test_reseller(&mut conn, "notifother").await;
        let mut repo = Notifications::new(&mut conn);

        let notification = repo.create(&notify(owner.id, "private")).await.unwrap();

        assert!(repo.mark_read(notification.id, other.id).await.unwrap().is_none());
        assert_eq!(repo.unread_count(owner.id).await.unwrap(), 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_mark_all_read(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = create_test_reseller(&mut conn, "notifall").await;
        let mut repo = Notifications::new(&mut conn);

        repo.create(&notify(user.id, "a")).await.unwrap();
        repo.create(&notify(user.id, "b")).await.unwrap();

        assert_eq!(repo.mark_all_read(user.id).await.unwrap(), 2);
        assert_eq!(repo.unread_count(user.id).await.unwrap(), 0);
    }
}
