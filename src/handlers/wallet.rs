// Wallet balance, ledger and card top-ups

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    app::AppState,
    middleware::AuthenticatedUser,
    models::{
        pagination::Page,
        payment::Payment,
        wallet::{TopUpRequest, Wallet, WalletTransaction, WalletTransactionQuery},
    },
    services::WalletService,
    utils::service_error::ServiceError,
};

#[utoipa::path(
    get,
    path = "/api/v1/wallet",
    tag = "Wallet",
    operation_id = "getWallet",
    responses(
        (status = 200, description = "Caller's wallet", body = Wallet),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_wallet(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Wallet>, ServiceError> {
    Ok(Json(WalletService::new(&state).get_wallet(&user).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/wallet/transactions",
    tag = "Wallet",
    operation_id = "listWalletTransactions",
    params(WalletTransactionQuery),
    responses((status = 200, description = "Ledger entries, newest first", body = WalletTransactionPage)),
    security(("bearerAuth" = []))
)]
pub async fn list_wallet_transactions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<WalletTransactionQuery>,
) -> Result<Json<Page<WalletTransaction>>, ServiceError> {
    let page = WalletService::new(&state)
        .list_transactions(&user, query)
        .await?;
    Ok(Json(page))
}

/// Opens a pending card payment. The wallet is credited once the provider
/// callback reports success.
#[utoipa::path(
    post,
    path = "/api/v1/wallet/top-up",
    tag = "Wallet",
    operation_id = "topUpWallet",
    request_body = TopUpRequest,
    responses(
        (status = 201, description = "Pending top-up payment", body = Payment),
        (status = 400, description = "Amount out of range")
    ),
    security(("bearerAuth" = []))
)]
pub async fn top_up_wallet(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<TopUpRequest>,
) -> Result<(StatusCode, Json<Payment>), ServiceError> {
    let payment = WalletService::new(&state).top_up(&user, request).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}
