//! Database repository for password reset tokens.

use crate::types::{UserId, abbrev_uuid};
use crate::db::{
    errors::Result,
    models::password_reset_tokens::{PasswordResetTokenCreateDBRequest, PasswordResetTokenDBResponse},
};
use sqlx::PgConnection;
use tracing::instrument;

pub struct PasswordResetTokens<'c> {
    db: &'c mut PgConnection,
}

impl<'c> PasswordResetTokens<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id)), err)]
    pub async fn create(&mut self, request: &PasswordResetTokenCreateDBRequest) -> Result<PasswordResetTokenDBResponse> {
        let token = sqlx::query_as::<_, PasswordResetTokenDBResponse>(
            "INSERT INTO password_reset_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(request.user_id)
        .bind(&request.token_hash)
        .bind(request.expires_at)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(token)
    }

    #[instrument(skip(self, token_hash), err)]
    pub async fn get_by_hash(&mut self, token_hash: &str) -> Result<Option<PasswordResetTokenDBResponse>> {
        let token = sqlx::query_as::<_, PasswordResetTokenDBResponse>(
            "SELECT * FROM password_reset_tokens WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(token)
    }

    /// Consume a token. Returns `None` if it was already used, making resets
    /// single-use under concurrent submissions.
    #[instrument(skip(self), fields(token_id = %abbrev_uuid(&id)), err)]
    pub async fn mark_used(&mut self, id: uuid::Uuid) -> Result<Option<PasswordResetTokenDBResponse>> {
        let token = sqlx::query_as::<_, PasswordResetTokenDBResponse>(
            "UPDATE password_reset_tokens SET used_at = NOW() WHERE id = $1 AND used_at IS NULL RETURNING *",
        )
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(token)
    }

    /// Invalidate any outstanding tokens for a user, called before issuing a
    /// new one so only the latest reset email works.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn invalidate_for_user(&mut self, user_id: UserId) -> Result<u64> {
        let result = sqlx::query("UPDATE password_reset_tokens SET used_at = NOW() WHERE user_id = $1 AND used_at IS NULL")
            .bind(user_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_reseller;
    use chrono::Utc;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_token_is_single_use(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = create_test_reseller(&mut conn, "resetuser").await;
        let mut repo = PasswordResetTokens::new(&mut conn);

        let token = repo
            .create(&PasswordResetTokenCreateDBRequest {
                user_id: user.id,
                token_hash: "hash123".to_string(),
                expires_at: Utc::now() + chrono::Duration::minutes(30),
            })
            .await
            .unwrap();
        assert!(token.is_usable(Utc::now()));

        assert!(repo.mark_used(token.id).await.unwrap().is_some());
        assert!(repo.mark_used(token.id).await.unwrap().is_none());

        let fetched = repo.get_by_hash("hash123").await.unwrap().unwrap();
        assert!(!fetched.is_usable(Utc::now()));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_new_token_invalidates_previous(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = create_test_reseller(&mut conn, "resetuser2").await;
        let mut repo = PasswordResetTokens::new(&mut conn);

        let expires_at = Utc::now() + chrono::Duration::minutes(30);
        repo.create(&PasswordResetTokenCreateDBRequest {
            user_id: user.id,
            token_hash: "old".to_string(),
            expires_at,
        })
        .await
        .unwrap();

        assert_eq!(repo.invalidate_for_user(user.id).await.unwrap(), 1);
        repo.create(&PasswordResetTokenCreateDBRequest {
            user_id: user.id,
            token_hash: "new".to_string(),
            expires_at,
        })
        .await
        .unwrap();

        let old = repo.get_by_hash("old").await.unwrap().unwrap();
        assert!(!old.is_usable(Utc::now()));
        assert!(repo.get_by_hash("new").await.unwrap().unwrap().is_usable(Utc::now()));
    }
}
