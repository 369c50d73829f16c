// Loyalty points balance, history and redemption

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    app::AppState,
    middleware::AuthenticatedUser,
    models::{
        pagination::Page,
        points::{
            PointTransaction, PointTransactionQuery, PointsSummary, RedeemPointsRequest,
            RedemptionResult,
        },
    },
    services::PointsService,
    utils::service_error::ServiceError,
};

#[utoipa::path(
    get,
    path = "/api/v1/points",
    tag = "Points",
    operation_id = "getPoints",
    responses((status = 200, description = "Balance and redemption policy", body = PointsSummary)),
    security(("bearerAuth" = []))
)]
pub async fn get_points(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<PointsSummary>, ServiceError> {
    Ok(Json(PointsService::new(&state).summary(&user).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/points/transactions",
    tag = "Points",
    operation_id = "listPointTransactions",
    params(PointTransactionQuery),
    responses((status = 200, description = "Point ledger, newest first", body = PointTransactionPage)),
    security(("bearerAuth" = []))
)]
pub async fn list_point_transactions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<PointTransactionQuery>,
) -> Result<Json<Page<PointTransaction>>, ServiceError> {
    let page = PointsService::new(&state)
        .list_transactions(&user, query)
        .await?;
    Ok(Json(page))
}

#[utoipa::path(
    post,
    path = "/api/v1/points/redeem",
    tag = "Points",
    operation_id = "redeemPoints",
    request_body = RedeemPointsRequest,
    responses(
        (status = 200, description = "Points converted to wallet credit", body = RedemptionResult),
        (status = 400, description = "Not a positive multiple of the redemption block"),
        (status = 422, description = "Insufficient points")
    ),
    security(("bearerAuth" = []))
)]
pub async fn redeem_points(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<RedeemPointsRequest>,
) -> Result<Json<RedemptionResult>, ServiceError> {
    Ok(Json(PointsService::new(&state).redeem(&user, request).await?))
}
