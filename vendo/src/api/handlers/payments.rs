//! Payment confirmation and transaction history endpoints.

use axum::{
    Json,
    extract::{Query, State},
};

use crate::{
    AppState, billing,
    api::models::{
        pagination::PaginatedResponse,
        payments::{ListPaymentsQuery, PaymentConfirmRequest, PaymentResponse},
        users::CurrentUser,
    },
    auth::permissions::{ensure, owner_scope},
    db::handlers::{Payments, Repository, payments::PaymentFilter},
    errors::Error,
    payment_providers,
    types::{Operation, Resource},
};

/// Confirm a gateway payment
///
/// Called by the client after completing payment at the gateway. The
/// signature is the hex HMAC-SHA256 of `"{gateway_order_id}|{gateway_payment_id}"`
/// keyed on the gateway key secret. Confirmation is idempotent.
#[utoipa::path(
    post,
    path = "/api/v1/payments/confirm",
    request_body = PaymentConfirmRequest,
    tag = "payments",
    responses(
        (status = 200, description = "Payment confirmed", body = PaymentResponse),
        (status = 400, description = "Invalid signature"),
        (status = 404, description = "Unknown gateway order"),
        (status = 409, description = "Payment already failed"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn confirm_payment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<PaymentConfirmRequest>,
) -> Result<Json<PaymentResponse>, Error> {
    ensure(&current_user, Resource::Payments, Operation::UpdateOwn)?;

    let provider = payment_providers::from_config(&state.config)?;
    if !provider.verify_confirmation(&request.gateway_order_id, &request.gateway_payment_id, &request.signature) {
        return Err(Error::BadRequest {
            message: "Invalid payment signature".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let payment = Payments::new(&mut conn)
        .get_by_gateway_order_id(&request.gateway_order_id)
        .await?
        .filter(|p| current_user.is_admin || p.user_id == current_user.id)
        .ok_or_else(|| Error::NotFound {
            resource: "payment".to_string(),
            id: request.gateway_order_id.clone(),
        })?;
    drop(conn);

    let payment = billing::confirm_payment(&state.db, &state.config, payment.id).await?;

    Ok(Json(payment.into()))
}

/// List payment transactions
///
/// Resellers see their own payments; admins see everyone's.
#[utoipa::path(
    get,
    path = "/api/v1/payments",
    params(ListPaymentsQuery),
    tag = "payments",
    responses(
        (status = 200, description = "Payments, newest first", body = PaginatedResponse<PaymentResponse>),
        (status = 401, description = "Not authenticated"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_payments(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListPaymentsQuery>,
) -> Result<Json<PaginatedResponse<PaymentResponse>>, Error> {
    ensure(&current_user, Resource::Payments, Operation::ReadOwn)?;

    let (skip, limit) = query.pagination.params();
    let mut filter = PaymentFilter::new(owner_scope(&current_user), skip, limit);
    filter.status = query.status;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Payments::new(&mut conn);
    let total_count = repo.count(&filter).await?;
    let payments = repo.list(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        payments.into_iter().map(PaymentResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}
