//! Wallet endpoints: balance, ledger history, and admin grants.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        pagination::PaginatedResponse,
        users::CurrentUser,
        wallet::{ListWalletTransactionsQuery, WalletBalanceResponse, WalletGrantRequest, WalletTransactionResponse},
    },
    auth::permissions::{ensure, require_admin},
    db::{
        handlers::{Notifications, Repository, Users, Wallet, wallet::WalletFilter},
        models::{
            notifications::NotificationCreateDBRequest,
            wallet::{WalletTransactionCreateDBRequest, WalletTransactionType},
        },
    },
    errors::Error,
    types::{Operation, Resource},
};

/// Get the authenticated user's wallet balance
#[utoipa::path(
    get,
    path = "/api/v1/wallet/balance",
    tag = "wallet",
    responses(
        (status = 200, description = "Current balance", body = WalletBalanceResponse),
        (status = 401, description = "Not authenticated"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_balance(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<WalletBalanceResponse>, Error> {
    ensure(&current_user, Resource::Wallet, Operation::ReadOwn)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let balance = Wallet::new(&mut conn).balance(current_user.id).await?;

    Ok(Json(WalletBalanceResponse {
        user_id: current_user.id,
        balance,
    }))
}

/// List the authenticated user's ledger entries, newest first
#[utoipa::path(
    get,
    path = "/api/v1/wallet/transactions",
    params(ListWalletTransactionsQuery),
    tag = "wallet",
    responses(
        (status = 200, description = "Ledger entries", body = PaginatedResponse<WalletTransactionResponse>),
        (status = 401, description = "Not authenticated"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_transactions(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListWalletTransactionsQuery>,
) -> Result<Json<PaginatedResponse<WalletTransactionResponse>>, Error> {
    ensure(&current_user, Resource::Wallet, Operation::ReadOwn)?;

    let (skip, limit) = query.pagination.params();
    let filter = WalletFilter::new(current_user.id, skip, limit);

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut wallet = Wallet::new(&mut conn);
    let total_count = wallet.count(&filter).await?;
    let entries = wallet.list(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        entries.into_iter().map(WalletTransactionResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

/// Credit a reseller's wallet (admin only)
#[utoipa::path(
    post,
    path = "/api/v1/wallet/grants",
    request_body = WalletGrantRequest,
    tag = "wallet",
    responses(
        (status = 201, description = "Ledger entry for the grant", body = WalletTransactionResponse),
        (status = 400, description = "Amount is not positive"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "User not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn grant(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<WalletGrantRequest>,
) -> Result<(StatusCode, Json<WalletTransactionResponse>), Error> {
    require_admin(&current_user, Resource::Wallet, Operation::CreateAll)?;

    if request.amount <= rust_decimal::Decimal::ZERO {
        return Err(Error::BadRequest {
            message: "Grant amount must be positive".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    Users::new(&mut conn)
        .get_by_id(request.user_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "user".to_string(),
            id: request.user_id.to_string(),
        })?;

    let entry = Wallet::new(&mut conn)
        .append(&WalletTransactionCreateDBRequest {
            user_id: request.user_id,
            transaction_type: WalletTransactionType::AdminGrant,
            amount: request.amount,
            description: request.description.clone(),
            source_id: None,
        })
        .await?
        .into_inner();

    // Best effort: a failed notification must not undo the grant
    if let Err(error) = Notifications::new(&mut conn)
        .create(&NotificationCreateDBRequest {
            user_id: request.user_id,
            kind: "wallet".to_string(),
            title: "Wallet credited".to_string(),
            body: format!("Your wallet was credited with {}", request.amount),
        })
        .await
    {
        tracing::warn!(%error, "failed to create wallet grant notification");
    }

    Ok((StatusCode::CREATED, Json(entry.into())))
}
