//! Subscription plan catalogue endpoints.
//!
//! Every authenticated user can browse active plans; creating, editing and
//! retiring plans is admin-only. Plans are retired by flipping `is_active`
//! rather than deleted, so historic subscriptions keep their reference.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    api::models::{
        pagination::{PaginatedResponse, Pagination},
        plans::{PlanCreate, PlanResponse, PlanUpdate},
        users::CurrentUser,
    },
    auth::permissions::{ensure, require_admin},
    db::{
        handlers::{Plans, Repository, plans::PlanFilter},
        models::plans::PlanUpdateDBRequest,
    },
    errors::Error,
    types::{Operation, PlanId, Resource},
};

/// List plans
///
/// Non-admins only see active plans; admins see the full catalogue.
#[utoipa::path(
    get,
    path = "/api/v1/plans",
    params(Pagination),
    tag = "plans",
    responses(
        (status = 200, description = "Available plans, cheapest first", body = PaginatedResponse<PlanResponse>),
        (status = 401, description = "Not authenticated"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_plans(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<PlanResponse>>, Error> {
    ensure(&current_user, Resource::Plans, Operation::ReadAll)?;

    let (skip, limit) = pagination.params();
    let filter = PlanFilter::new(!current_user.is_admin, skip, limit);

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let plans = Plans::new(&mut conn).list(&filter).await?;

    let total_count = plans.len() as i64;
    Ok(Json(PaginatedResponse::new(
        plans.into_iter().map(PlanResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

/// Get a plan by id
#[utoipa::path(
    get,
    path = "/api/v1/plans/{id}",
    params(("id" = Uuid, Path, description = "Plan id")),
    tag = "plans",
    responses(
        (status = 200, description = "The plan", body = PlanResponse),
        (status = 404, description = "Plan not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_plan(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<PlanId>,
) -> Result<Json<PlanResponse>, Error> {
    ensure(&current_user, Resource::Plans, Operation::ReadAll)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let plan = Plans::new(&mut conn)
        .get_by_id(id)
        .await?
        .filter(|p| current_user.is_admin || p.is_active)
        .ok_or_else(|| Error::NotFound {
            resource: "plan".to_string(),
            id: id.to_string(),
        })?;

    Ok(Json(plan.into()))
}

/// Create a plan (admin only)
#[utoipa::path(
    post,
    path = "/api/v1/plans",
    request_body = PlanCreate,
    tag = "plans",
    responses(
        (status = 201, description = "Plan created", body = PlanResponse),
        (status = 403, description = "Not an admin"),
        (status = 409, description = "Plan code already exists"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_plan(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<PlanCreate>,
) -> Result<(StatusCode, Json<PlanResponse>), Error> {
    require_admin(&current_user, Resource::Plans, Operation::CreateAll)?;

    if request.duration_days <= 0 {
        return Err(Error::BadRequest {
            message: "Plan duration must be a positive number of days".to_string(),
        });
    }
    if request.price < rust_decimal::Decimal::ZERO {
        return Err(Error::BadRequest {
            message: "Plan price cannot be negative".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let plan = Plans::new(&mut conn).create(&request.into()).await?;

    Ok((StatusCode::CREATED, Json(plan.into())))
}

/// Update a plan (admin only)
#[utoipa::path(
    put,
    path = "/api/v1/plans/{id}",
    params(("id" = Uuid, Path, description = "Plan id")),
    request_body = PlanUpdate,
    tag = "plans",
    responses(
        (status = 200, description = "Updated plan", body = PlanResponse),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Plan not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_plan(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<PlanId>,
    Json(request): Json<PlanUpdate>,
) -> Result<Json<PlanResponse>, Error> {
    require_admin(&current_user, Resource::Plans, Operation::UpdateAll)?;

    if request.duration_days.is_some_and(|d| d <= 0) {
        return Err(Error::BadRequest {
            message: "Plan duration must be a positive number of days".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let plan = Plans::new(&mut conn).update(id, &request.into()).await?;

    Ok(Json(plan.into()))
}

/// Retire a plan (admin only)
///
/// Retiring deactivates the plan instead of deleting it, so existing
/// subscriptions keep a valid plan reference.
#[utoipa::path(
    delete,
    path = "/api/v1/plans/{id}",
    params(("id" = Uuid, Path, description = "Plan id")),
    tag = "plans",
    responses(
        (status = 200, description = "Retired plan", body = PlanResponse),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Plan not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn retire_plan(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<PlanId>,
) -> Result<Json<PlanResponse>, Error> {
    require_admin(&current_user, Resource::Plans, Operation::DeleteAll)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let plan = Plans::new(&mut conn)
        .update(
            id,
            &PlanUpdateDBRequest {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await?;

    Ok(Json(plan.into()))
}
