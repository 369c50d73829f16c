// Authentication middleware for protected routes
// Validates the bearer token and injects AuthenticatedUser into request extensions

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use uuid::Uuid;

use crate::{app::AppState, middleware::auth::AuthenticatedUser, models::user::UserRole};

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": message,
            "status": StatusCode::UNAUTHORIZED.as_u16()
        })),
    )
        .into_response()
}

/// Resolve the caller from an `Authorization: Bearer` header.
fn authenticate(headers: &HeaderMap, state: &AppState) -> Result<AuthenticatedUser, &'static str> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or("Missing or invalid authorization header")?;

    let claims = state.jwt_service.validate_access_token(token).map_err(|e| {
        tracing::warn!("JWT validation failed: {}", e);
        "Invalid or expired token"
    })?;

    let (user_id, role) = match (Uuid::parse_str(&claims.sub), UserRole::from_string(&claims.role)) {
        (Ok(user_id), Some(role)) => (user_id, role),
        _ => {
            tracing::warn!("Token {} carries malformed subject or role", claims.jti);
            return Err("Invalid or expired token");
        },
    };

    Ok(AuthenticatedUser {
        user_id,
        token_id: claims.jti,
        email: claims.email,
        role,
        exp: claims.exp,
    })
}

pub async fn auth_middleware(
    State(app_state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    match authenticate(request.headers(), &app_state) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        },
        Err(message) => unauthorized(message),
    }
}

/// Caller identity on public routes. A missing or invalid token yields `None`
/// rather than a rejection.
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<AuthenticatedUser>);

impl OptionalUser {
    pub fn user(&self) -> Option<&AuthenticatedUser> {
        self.0.as_ref()
    }
}

impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(OptionalUser(Some(user.clone())));
        }
        Ok(OptionalUser(authenticate(&parts.headers, state).ok()))
    }
}

/// Lets handlers take `AuthenticatedUser` directly. Behind `auth_middleware`
/// the identity comes from the request extensions; on routes that mix public
/// and private methods the token is validated here.
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(user.clone());
        }
        authenticate(&parts.headers, state).map_err(unauthorized)
    }
}
