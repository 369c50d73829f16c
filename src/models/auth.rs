// Token claims and auth request/response DTOs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::user::{UserProfile, UserRole};
use crate::utils::validation::{validate_password_strength, PHONE_REGEX};

/// Access token claims
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessTokenClaims {
    /// User ID
    pub sub: String,
    pub jti: String,
    pub email: String,
    /// `customer`, `business` or `admin`
    pub role: String,
    pub aud: String,
    pub iss: String,
    pub iat: u64,
    pub exp: u64,
}

/// Refresh tokens carry only identity; role and status are re-read on refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefreshTokenClaims {
    pub sub: String,
    pub jti: String,
    pub aud: String,
    pub iss: String,
    pub iat: u64,
    pub exp: u64,
}

impl AccessTokenClaims {
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.exp
    }

    pub fn role(&self) -> Option<UserRole> {
        UserRole::from_string(&self.role)
    }
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[schema(example = json!({
    "email": "ayse@example.com",
    "password": "Randevu2025!",
    "full_name": "Ayşe Yılmaz",
    "phone": "+905321234567",
    "role": "customer"
}))]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    #[validate(length(max = 320, message = "Email must be less than 320 characters"))]
    pub email: String,

    #[validate(custom(function = "validate_password_strength"))]
    pub password: String,

    #[validate(length(
        min = 1,
        max = 255,
        message = "Full name must be between 1 and 255 characters"
    ))]
    pub full_name: String,

    #[validate(regex(path = "PHONE_REGEX", message = "Invalid phone number"))]
    pub phone: Option<String>,

    /// Defaults to `customer`
    pub role: Option<UserRole>,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
    pub user: UserProfile,
}
