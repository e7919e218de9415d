//! Database repository for enquiries.
//!
//! Status changes go through [`Enquiries::transition`], which validates the
//! move against the state machine and, when the change carries a note,
//! records an audit row in `enquiry_followups` inside the same transaction.

use crate::types::{EnquiryId, UserId, abbrev_uuid};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::enquiries::{
        EnquiryCreateDBRequest, EnquiryDBResponse, EnquiryFollowupDBResponse, EnquiryStatus, EnquiryUpdateDBRequest,
    },
};
use chrono::{DateTime, Utc};
use sqlx::{Connection, PgConnection};
use tracing::instrument;

/// Filter for listing enquiries
#[derive(Debug, Clone)]
pub struct EnquiryFilter {
    pub owner_id: Option<UserId>,
    pub status: Option<EnquiryStatus>,
    pub skip: i64,
    pub limit: i64,
}

impl EnquiryFilter {
    pub fn new(owner_id: Option<UserId>, skip: i64, limit: i64) -> Self {
        Self {
            owner_id,
            status: None,
            skip,
            limit,
        }
    }
}

pub struct Enquiries<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Enquiries<'c> {
    type CreateRequest = EnquiryCreateDBRequest;
    type UpdateRequest = EnquiryUpdateDBRequest;
    type Response = EnquiryDBResponse;
    type Id = EnquiryId;
    type Filter = EnquiryFilter;

    #[instrument(skip(self, request), fields(owner_id = %abbrev_uuid(&request.owner_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let enquiry = sqlx::query_as::<_, EnquiryDBResponse>(
            r#"
            INSERT INTO enquiries (owner_id, customer_name, phone, email, product_interest, source, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(request.owner_id)
        .bind(&request.customer_name)
        .bind(&request.phone)
        .bind(&request.email)
        .bind(&request.product_interest)
        .bind(&request.source)
        .bind(&request.notes)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(enquiry)
    }

    #[instrument(skip(self), fields(enquiry_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let enquiry = sqlx::query_as::<_, EnquiryDBResponse>("SELECT * FROM enquiries WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(enquiry)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let enquiries = sqlx::query_as::<_, EnquiryDBResponse>(
            r#"
            SELECT * FROM enquiries
            WHERE ($1::uuid IS NULL OR owner_id = $1)
              AND ($2::enquiry_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.owner_id)
        .bind(filter.status)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(enquiries)
    }

    #[instrument(skip(self), fields(enquiry_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM enquiries WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(enquiry_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let enquiry = sqlx::query_as::<_, EnquiryDBResponse>(
            r#"
            UPDATE enquiries SET
                customer_name = COALESCE($2, customer_name),
                phone = COALESCE($3, phone),
                email = COALESCE($4, email),
                product_interest = COALESCE($5, product_interest),
                source = COALESCE($6, source),
                notes = COALESCE($7, notes),
                next_follow_up_at = COALESCE($8, next_follow_up_at),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.customer_name)
        .bind(&request.phone)
        .bind(&request.email)
        .bind(&request.product_interest)
        .bind(&request.source)
        .bind(&request.notes)
        .bind(request.next_follow_up_at)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(enquiry)
    }
}

impl<'c> Enquiries<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Total rows matching the filter, ignoring pagination.
    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &EnquiryFilter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM enquiries
            WHERE ($1::uuid IS NULL OR owner_id = $1)
              AND ($2::enquiry_status IS NULL OR status = $2)
            "#,
        )
        .bind(filter.owner_id)
        .bind(filter.status)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(count)
    }

    /// Move an enquiry to `new_status`. When a note is given, the audit row
    /// is recorded atomically with the change.
    ///
    /// Returns `DbError::CheckViolation` when the transition is illegal so the
    /// API layer can surface a 400 without special-casing.
    #[instrument(skip(self, note), fields(enquiry_id = %abbrev_uuid(&id), ?new_status), err)]
    pub async fn transition(
        &mut self,
        id: EnquiryId,
        new_status: EnquiryStatus,
        note: Option<&str>,
    ) -> Result<EnquiryDBResponse> {
        let mut tx = self.db.begin().await?;

        let current = sqlx::query_as::<_, EnquiryDBResponse>("SELECT * FROM enquiries WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DbError::NotFound)?;

        if !current.status.can_transition_to(new_status) {
            return Err(DbError::CheckViolation {
                constraint: Some("enquiry_status_transition".to_string()),
                table: Some("enquiries".to_string()),
                message: format!("Cannot move enquiry from {:?} to {:?}", current.status, new_status),
            });
        }

        let updated = sqlx::query_as::<_, EnquiryDBResponse>(
            "UPDATE enquiries SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(new_status)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(note) = note {
            sqlx::query(
                "INSERT INTO enquiry_followups (enquiry_id, old_status, new_status, note) VALUES ($1, $2, $3, $4)",
            )
            .bind(id)
            .bind(current.status)
            .bind(new_status)
            .bind(note)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(updated)
    }

    #[instrument(skip(self), fields(enquiry_id = %abbrev_uuid(&id)), err)]
    pub async fn list_followups(&mut self, id: EnquiryId) -> Result<Vec<EnquiryFollowupDBResponse>> {
        let followups = sqlx::query_as::<_, EnquiryFollowupDBResponse>(
            "SELECT * FROM enquiry_followups WHERE enquiry_id = $1 ORDER BY created_at ASC",
        )
        .bind(id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(followups)
    }

    /// Flag `new` enquiries older than `stale_before` for follow-up.
    /// Returns the enquiries that were flagged.
    #[instrument(skip(self), err)]
    pub async fn flag_stale(&mut self, stale_before: DateTime<Utc>) -> Result<Vec<EnquiryDBResponse>> {
        let mut tx = self.db.begin().await?;

        let stale = sqlx::query_as::<_, EnquiryDBResponse>(
            r#"
            UPDATE enquiries
            SET status = 'needs_follow_up', updated_at = NOW()
            WHERE status = 'new' AND created_at < $1
            RETURNING *
            "#,
        )
        .bind(stale_before)
        .fetch_all(&mut *tx)
        .await?;

        for enquiry in &stale {
            sqlx::query(
                "INSERT INTO enquiry_followups (enquiry_id, old_status, new_status, note) VALUES ($1, 'new', 'needs_follow_up', $2)",
            )
            .bind(enquiry.id)
            .bind("Automatically flagged: no activity since creation")
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(stale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_reseller;
    use sqlx::PgPool;

    async fn create_enquiry(conn: &mut PgConnection, owner_id: UserId) -> EnquiryDBResponse {
        Enquiries::new(conn)
            .create(&EnquiryCreateDBRequest {
                owner_id,
                customer_name: "Walk-in".to_string(),
                phone: Some("+15550123".to_string()),
                email: None,
                product_interest: Some("Gadget".to_string()),
                source: Some("whatsapp".to_string()),
                notes: None,
            })
            .await
            .unwrap()
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_transition_records_followup(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let owner = create_test_reseller(&mut conn, "enqowner").await;
        let enquiry = create_enquiry(&mut conn, owner.id).await;

        let mut repo = Enquiries::new(&mut conn);
        let updated = repo
            .transition(enquiry.id, EnquiryStatus::NeedsFollowUp, Some("called, no answer"))
            .await
            .unwrap();
        assert_eq!(updated.status, EnquiryStatus::NeedsFollowUp);

        let followups = repo.list_followups(enquiry.id).await.unwrap();
        assert_eq!(followups.len(), 1);
        assert_eq!(followups[0].old_status, EnquiryStatus::New);
        assert_eq!(followups[0].new_status, EnquiryStatus::NeedsFollowUp);
        assert_eq!(followups[0].note.as_deref(), Some("called, no answer"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_terminal_enquiry_rejects_transition(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let owner = create_test_reseller(&mut conn, "enqowner2").await;
        let enquiry = create_enquiry(&mut conn, owner.id).await;

        let mut repo = Enquiries::new(&mut conn);
        repo.transition(enquiry.id, EnquiryStatus::Dropped, Some("not interested"))
            .await
            .unwrap();

        let err = repo
            .transition(enquiry.id, EnquiryStatus::NeedsFollowUp, Some("second thoughts"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));

        // The failed attempt must not leave an audit row behind
        let followups = repo.list_followups(enquiry.id).await.unwrap();
        assert_eq!(followups.len(), 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_transition_without_note_records_no_followup(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let owner = create_test_reseller(&mut conn, "enqowner3").await;
        let enquiry = create_enquiry(&mut conn, owner.id).await;

        let mut repo = Enquiries::new(&mut conn);
        let updated = repo
            .transition(enquiry.id, EnquiryStatus::NeedsFollowUp, None)
            .await
            .unwrap();
        assert_eq!(updated.status, EnquiryStatus::NeedsFollowUp);

        assert!(repo.list_followups(enquiry.id).await.unwrap().is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_flag_stale_only_touches_new(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let owner = create_test_reseller(&mut conn, "staleowner").await;
        let old_new = create_enquiry(&mut conn, owner.id).await;
        let old_dropped = create_enquiry(&mut conn, owner.id).await;

        // Backdate both so they are older than the cutoff
        sqlx::query("UPDATE enquiries SET created_at = NOW() - INTERVAL '3 days' WHERE id = ANY($1)")
            .bind(vec![old_new.id, old_dropped.id])
            .execute(&mut *conn)
            .await
            .unwrap();

        let mut repo = Enquiries::new(&mut conn);
        repo.transition(old_dropped.id, EnquiryStatus::Dropped, None).await.unwrap();

        let flagged = repo.flag_stale(Utc::now() - chrono::Duration::hours(48)).await.unwrap();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].id, old_new.id);
        assert_eq!(flagged[0].status, EnquiryStatus::NeedsFollowUp);
    }
}
