// Registration, login, token refresh and the caller's profile

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    app::AppState,
    middleware::AuthenticatedUser,
    models::{
        auth::{LoginRequest, RefreshRequest, RegisterRequest, TokenResponse},
        user::UserProfile,
    },
    services::AuthService,
    utils::service_error::ServiceError,
};

/// Register a customer or business account
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Authentication",
    operation_id = "register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, tokens issued", body = TokenResponse),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Role cannot be self-assigned"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ServiceError> {
    let response = AuthService::new(&state).register(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Authentication",
    operation_id = "login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = TokenResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ServiceError> {
    Ok(Json(AuthService::new(&state).login(request).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "Authentication",
    operation_id = "refreshToken",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenResponse),
        (status = 401, description = "Refresh token invalid or expired")
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, ServiceError> {
    Ok(Json(AuthService::new(&state).refresh(request).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Authentication",
    operation_id = "getCurrentUser",
    responses(
        (status = 200, description = "Caller profile with points balance", body = UserProfile),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearerAuth" = []))
)]
pub async fn me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<UserProfile>, ServiceError> {
    Ok(Json(AuthService::new(&state).me(user.user_id).await?))
}
