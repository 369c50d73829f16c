// Administrative endpoints. Every handler checks its permission in the
// service layer, so a non-admin token gets 403 rather than 404.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::{
    app::AppState,
    middleware::AuthenticatedUser,
    models::{
        dashboard::DashboardStats,
        pagination::Page,
        payment::Payment,
        points::{AdjustPointsRequest, PointTransaction},
        reward::{PayoutResult, RewardListQuery, RewardSummary},
        user::{AdminUserUpdateRequest, UserListQuery, UserProfile},
        wallet::{AdjustWalletRequest, WalletTransaction},
    },
    services::{
        DashboardService, PaymentService, PointsService, RewardService, UserService,
        WalletService,
    },
    utils::service_error::ServiceError,
};

#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    tag = "Admin",
    operation_id = "adminListUsers",
    params(UserListQuery),
    responses(
        (status = 200, description = "Users", body = UserPage),
        (status = 403, description = "Admin only")
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Page<UserProfile>>, ServiceError> {
    Ok(Json(UserService::new(&state).list_users(&user, query).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/admin/users/{id}",
    tag = "Admin",
    operation_id = "adminUpdateUser",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = AdminUserUpdateRequest,
    responses(
        (status = 200, description = "Updated user", body = UserProfile),
        (status = 403, description = "Admin only, and never against the caller's own account"),
        (status = 404, description = "User not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<AdminUserUpdateRequest>,
) -> Result<Json<UserProfile>, ServiceError> {
    Ok(Json(UserService::new(&state).update_user(&user, id, request).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/dashboard",
    tag = "Admin",
    operation_id = "adminDashboard",
    responses(
        (status = 200, description = "Platform aggregates", body = DashboardStats),
        (status = 403, description = "Admin only")
    ),
    security(("bearerAuth" = []))
)]
pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<DashboardStats>, ServiceError> {
    Ok(Json(DashboardService::new(&state).stats(&user).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/wallets/{user_id}/adjust",
    tag = "Admin",
    operation_id = "adminAdjustWallet",
    params(("user_id" = Uuid, Path, description = "Wallet owner")),
    request_body = AdjustWalletRequest,
    responses(
        (status = 200, description = "Ledger entry written", body = WalletTransaction),
        (status = 400, description = "Zero amount"),
        (status = 402, description = "Debit exceeds balance")
    ),
    security(("bearerAuth" = []))
)]
pub async fn adjust_wallet(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<Uuid>,
    Json(request): Json<AdjustWalletRequest>,
) -> Result<Json<WalletTransaction>, ServiceError> {
    let entry = WalletService::new(&state)
        .admin_adjust(&user, user_id, request)
        .await?;
    Ok(Json(entry))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/points/{user_id}/adjust",
    tag = "Admin",
    operation_id = "adminAdjustPoints",
    params(("user_id" = Uuid, Path, description = "Points holder")),
    request_body = AdjustPointsRequest,
    responses(
        (status = 200, description = "Ledger entry written", body = PointTransaction),
        (status = 400, description = "Zero points"),
        (status = 422, description = "Deduction exceeds balance")
    ),
    security(("bearerAuth" = []))
)]
pub async fn adjust_points(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<Uuid>,
    Json(request): Json<AdjustPointsRequest>,
) -> Result<Json<PointTransaction>, ServiceError> {
    let entry = PointsService::new(&state)
        .admin_adjust(&user, user_id, request)
        .await?;
    Ok(Json(entry))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/payments/{id}/refund",
    tag = "Admin",
    operation_id = "adminRefundPayment",
    params(("id" = Uuid, Path, description = "Payment id")),
    responses(
        (status = 200, description = "Refunded; invoice cancelled", body = Payment),
        (status = 409, description = "Payment is not completed")
    ),
    security(("bearerAuth" = []))
)]
pub async fn refund_payment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Payment>, ServiceError> {
    Ok(Json(PaymentService::new(&state).refund(&user, id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/rewards",
    tag = "Admin",
    operation_id = "adminListRewards",
    params(RewardListQuery),
    responses((status = 200, description = "Reward balances per business", body = RewardSummaryPage)),
    security(("bearerAuth" = []))
)]
pub async fn list_rewards(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<RewardListQuery>,
) -> Result<Json<Page<RewardSummary>>, ServiceError> {
    Ok(Json(RewardService::new(&state).list_rewards(&user, query).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/rewards/{business_id}/payout",
    tag = "Admin",
    operation_id = "adminPayoutRewards",
    params(("business_id" = Uuid, Path, description = "Business id")),
    responses(
        (status = 200, description = "Balance paid into the owner's wallet", body = PayoutResult),
        (status = 409, description = "Nothing to pay out")
    ),
    security(("bearerAuth" = []))
)]
pub async fn payout_rewards(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(business_id): Path<Uuid>,
) -> Result<Json<PayoutResult>, ServiceError> {
    Ok(Json(RewardService::new(&state).payout(&user, business_id).await?))
}
