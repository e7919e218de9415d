//! In-app notification endpoints.
//!
//! Notifications are strictly per-user; the repository scopes every write to
//! the requester so a notification id from another account behaves as absent.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use uuid::Uuid;

use crate::{
    AppState,
    api::models::{
        notifications::{ListNotificationsQuery, NotificationResponse, UnreadCountResponse},
        pagination::PaginatedResponse,
        users::CurrentUser,
    },
    auth::permissions::ensure,
    db::handlers::{Notifications, notifications::NotificationFilter},
    errors::Error,
    types::{NotificationId, Operation, Resource},
};

/// List the authenticated user's notifications, newest first
#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    params(ListNotificationsQuery),
    tag = "notifications",
    responses(
        (status = 200, description = "Notifications", body = PaginatedResponse<NotificationResponse>),
        (status = 401, description = "Not authenticated"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_notifications(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<PaginatedResponse<NotificationResponse>>, Error> {
    ensure(&current_user, Resource::Notifications, Operation::ReadOwn)?;

    let (skip, limit) = query.pagination.params();
    let mut filter = NotificationFilter::new(current_user.id, skip, limit);
    filter.unread_only = query.unread_only;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Notifications::new(&mut conn);
    let total_count = repo.count(&filter).await?;
    let notifications = repo.list(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        notifications.into_iter().map(NotificationResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

/// Count unread notifications
#[utoipa::path(
    get,
    path = "/api/v1/notifications/unread-count",
    tag = "notifications",
    responses(
        (status = 200, description = "Unread notification count", body = UnreadCountResponse),
        (status = 401, description = "Not authenticated"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn unread_count(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<UnreadCountResponse>, Error> {
    ensure(&current_user, Resource::Notifications, Operation::ReadOwn)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let unread = Notifications::new(&mut conn).unread_count(current_user.id).await?;

    Ok(Json(UnreadCountResponse { unread }))
}

/// Mark one notification as read
#[utoipa::path(
    post,
    path = "/api/v1/notifications/{id}/read",
    params(("id" = Uuid, Path, description = "Notification id")),
    tag = "notifications",
    responses(
        (status = 200, description = "The notification, now read", body = NotificationResponse),
        (status = 404, description = "Notification not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn mark_read(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<NotificationId>,
) -> Result<Json<NotificationResponse>, Error> {
    ensure(&current_user, Resource::Notifications, Operation::UpdateOwn)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let notification = Notifications::new(&mut conn)
        .mark_read(id, current_user.id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "notification".to_string(),
            id: id.to_string(),
        })?;

    Ok(Json(notification.into()))
}

/// Mark all notifications as read
#[utoipa::path(
    post,
    path = "/api/v1/notifications/read-all",
    tag = "notifications",
    responses(
        (status = 200, description = "Unread count after the operation", body = UnreadCountResponse),
        (status = 401, description = "Not authenticated"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<UnreadCountResponse>, Error> {
    ensure(&current_user, Resource::Notifications, Operation::UpdateOwn)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    Notifications::new(&mut conn).mark_all_read(current_user.id).await?;

    Ok(Json(UnreadCountResponse { unread: 0 }))
}
