//! Subscription checkout and listing endpoints.
//!
//! The heavy lifting lives in [`crate::billing`]; these handlers do the
//! permission checks and shape the wire responses.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

use crate::{
    AppState, billing,
    api::models::{
        pagination::PaginatedResponse,
        subscriptions::{CheckoutRequest, CheckoutResponse, ListSubscriptionsQuery, SubscriptionResponse},
        users::CurrentUser,
    },
    auth::permissions::{ensure, owner_scope},
    db::handlers::{Repository, Subscriptions, subscriptions::SubscriptionFilter},
    errors::Error,
    types::{Operation, Resource},
};

/// Start a subscription checkout
///
/// Reserves a pending subscription for the chosen plan. With `use_wallet`,
/// available balance is applied first; a checkout the wallet covers in full
/// activates immediately and returns no gateway order.
#[utoipa::path(
    post,
    path = "/api/v1/subscriptions/checkout",
    request_body = CheckoutRequest,
    tag = "subscriptions",
    responses(
        (status = 201, description = "Checkout started", body = CheckoutResponse),
        (status = 404, description = "Plan not found or retired"),
        (status = 409, description = "An active subscription already exists"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn checkout(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), Error> {
    ensure(&current_user, Resource::Subscriptions, Operation::CreateOwn)?;

    let outcome = billing::checkout(
        &state.db,
        &state.config,
        current_user.id,
        request.plan_id,
        request.use_wallet,
    )
    .await?;

    let amount_due = outcome.payment.amount - outcome.payment.wallet_amount;
    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            subscription: outcome.subscription.into(),
            gateway_order_id: outcome.payment.gateway_order_id,
            amount_due,
            wallet_amount: outcome.payment.wallet_amount,
        }),
    ))
}

/// List subscriptions
///
/// Resellers see their own subscriptions; admins see everyone's.
#[utoipa::path(
    get,
    path = "/api/v1/subscriptions",
    params(ListSubscriptionsQuery),
    tag = "subscriptions",
    responses(
        (status = 200, description = "Subscriptions, newest first", body = PaginatedResponse<SubscriptionResponse>),
        (status = 401, description = "Not authenticated"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_subscriptions(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListSubscriptionsQuery>,
) -> Result<Json<PaginatedResponse<SubscriptionResponse>>, Error> {
    ensure(&current_user, Resource::Subscriptions, Operation::ReadOwn)?;

    let (skip, limit) = query.pagination.params();
    let mut filter = SubscriptionFilter::new(owner_scope(&current_user), skip, limit);
    filter.status = query.status;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Subscriptions::new(&mut conn);
    let total_count = repo.count(&filter).await?;
    let subscriptions = repo.list(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        subscriptions.into_iter().map(SubscriptionResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}
