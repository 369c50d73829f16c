// JWT issuing and validation (HS256, separate access and refresh secrets)

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

use crate::app_config::AppConfig;
use crate::models::auth::{AccessTokenClaims, RefreshTokenClaims};
use crate::models::user::UserRole;

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("JWT encoding error: {0}")]
    EncodingError(String),

    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,
}

impl JwtError {
    fn from_decode(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::TokenExpired,
            _ => JwtError::InvalidToken,
        }
    }
}

#[derive(Clone)]
pub struct JwtConfig {
    /// Seconds
    pub access_token_expiry: u64,
    /// Seconds
    pub refresh_token_expiry: u64,
    pub algorithm: Algorithm,
    pub audience: String,
    pub issuer: String,
    pub access_encoding_key: EncodingKey,
    pub access_decoding_key: DecodingKey,
    pub refresh_encoding_key: EncodingKey,
    pub refresh_decoding_key: DecodingKey,
    pub key_version: u32,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_token_expiry", &self.access_token_expiry)
            .field("refresh_token_expiry", &self.refresh_token_expiry)
            .field("algorithm", &self.algorithm)
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .field("access_encoding_key", &"<redacted>")
            .field("access_decoding_key", &"<redacted>")
            .field("refresh_encoding_key", &"<redacted>")
            .field("refresh_decoding_key", &"<redacted>")
            .field("key_version", &self.key_version)
            .finish()
    }
}

impl JwtConfig {
    fn build_from_params(
        access_secret: &str,
        refresh_secret: &str,
        access_expiry: u64,
        refresh_expiry: u64,
        audience: String,
        issuer: String,
        key_version: u32,
    ) -> Self {
        JwtConfig {
            access_token_expiry: access_expiry,
            refresh_token_expiry: refresh_expiry,
            algorithm: Algorithm::HS256,
            audience,
            issuer,
            access_encoding_key: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding_key: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding_key: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding_key: DecodingKey::from_secret(refresh_secret.as_bytes()),
            key_version,
        }
    }

    pub fn from_app_config(config: &AppConfig) -> Self {
        let jwt = &config.jwt;
        Self::build_from_params(
            &jwt.access_secret,
            &jwt.refresh_secret,
            jwt.access_expiry,
            jwt.refresh_expiry,
            jwt.audience.clone(),
            jwt.issuer.clone(),
            jwt.key_version,
        )
    }

    #[cfg(test)]
    pub fn for_test() -> Self {
        Self::build_from_params(
            "test-access-secret-hs256-0123456789abcdef",
            "test-refresh-secret-hs256-0123456789abcdef",
            3600,
            604800,
            "test.wellness.local".to_string(),
            "test.wellness.local".to_string(),
            1,
        )
    }
}

/// Access and refresh token pair handed to clients.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

pub struct JwtService {
    config: JwtConfig,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }

    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(JwtConfig::from_app_config(config))
    }

    fn now() -> Result<u64, JwtError> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .map_err(|e| JwtError::KeyGenerationError(e.to_string()))
    }

    fn header(&self) -> Header {
        let mut header = Header::new(self.config.algorithm);
        header.kid = Some(self.config.key_version.to_string());
        header
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.config.algorithm);
        validation.set_audience(&[self.config.audience.clone()]);
        validation.set_issuer(&[self.config.issuer.clone()]);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation
    }

    pub fn generate_access_token(
        &self,
        user_id: Uuid,
        email: &str,
        role: UserRole,
    ) -> Result<String, JwtError> {
        let now = Self::now()?;
        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.as_str().to_string(),
            aud: self.config.audience.clone(),
            iss: self.config.issuer.clone(),
            iat: now,
            exp: now + self.config.access_token_expiry,
        };

        encode(&self.header(), &claims, &self.config.access_encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))
    }

    pub fn generate_refresh_token(&self, user_id: Uuid) -> Result<String, JwtError> {
        let now = Self::now()?;
        let claims = RefreshTokenClaims {
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            aud: self.config.audience.clone(),
            iss: self.config.issuer.clone(),
            iat: now,
            exp: now + self.config.refresh_token_expiry,
        };

        encode(&self.header(), &claims, &self.config.refresh_encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))
    }

    pub fn issue_pair(
        &self,
        user_id: Uuid,
        email: &str,
        role: UserRole,
    ) -> Result<TokenPair, JwtError> {
        Ok(TokenPair {
            access_token: self.generate_access_token(user_id, email, role)?,
            refresh_token: self.generate_refresh_token(user_id)?,
            expires_in: self.config.access_token_expiry,
        })
    }

    fn decode_with<T: DeserializeOwned>(&self, token: &str, key: &DecodingKey) -> Result<T, JwtError> {
        decode::<T>(token, key, &self.validation())
            .map(|data| data.claims)
            .map_err(JwtError::from_decode)
    }

    /// Validate an access token (signature, audience, issuer and expiry, no leeway).
    pub fn validate_access_token(&self, token: &str) -> Result<AccessTokenClaims, JwtError> {
        self.decode_with(token, &self.config.access_decoding_key)
    }

    pub fn validate_refresh_token(&self, token: &str) -> Result<RefreshTokenClaims, JwtError> {
        self.decode_with(token, &self.config.refresh_decoding_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_round_trip() {
        let service = JwtService::new(JwtConfig::for_test());
        let user_id = Uuid::new_v4();

        let token = service
            .generate_access_token(user_id, "ayse@example.com", UserRole::Business)
            .unwrap();
        let claims = service.validate_access_token(&token).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "ayse@example.com");
        assert_eq!(claims.role, "business");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let service = JwtService::new(JwtConfig::for_test());
        let pair = service
            .issue_pair(Uuid::new_v4(), "a@b.co", UserRole::Customer)
            .unwrap();

        assert!(service.validate_refresh_token(&pair.refresh_token).is_ok());
        assert!(matches!(
            service.validate_access_token(&pair.refresh_token),
            Err(JwtError::InvalidToken)
        ));
        assert!(matches!(
            service.validate_refresh_token(&pair.access_token),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn test_garbage_token_is_invalid() {
        let service = JwtService::new(JwtConfig::for_test());
        assert!(matches!(
            service.validate_access_token("not.a.jwt"),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token() {
        let mut config = JwtConfig::for_test();
        config.access_token_expiry = 0;
        let service = JwtService::new(config);

        let token = service
            .generate_access_token(Uuid::new_v4(), "a@b.co", UserRole::Admin)
            .unwrap();
        // exp == iat; with zero leeway the token is already expired
        std::thread::sleep(std::time::Duration::from_millis(1100));
        assert!(matches!(
            service.validate_access_token(&token),
            Err(JwtError::TokenExpired)
        ));
    }

    #[test]
    fn test_wrong_audience_is_rejected() {
        let service = JwtService::new(JwtConfig::for_test());
        let token = service
            .generate_access_token(Uuid::new_v4(), "a@b.co", UserRole::Customer)
            .unwrap();

        let mut other = JwtConfig::for_test();
        other.audience = "other.audience".to_string();
        let other_service = JwtService::new(other);
        assert!(matches!(
            other_service.validate_access_token(&token),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn test_debug_redacts_keys() {
        let debug = format!("{:?}", JwtConfig::for_test());
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("test-access-secret"));
    }
}
