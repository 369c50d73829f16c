// Service error type shared by every service and handler
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use diesel::result::DatabaseErrorKind;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found")]
    NotFound,

    #[error("{0} not found")]
    ResourceNotFound(&'static str),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Cannot move {entity} from '{from}' to '{to}'")]
    InvalidStateTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("Insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: i64, required: i64 },

    #[error("Insufficient points: balance {balance}, required {required}")]
    InsufficientPoints { balance: i64, required: i64 },

    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i32,
        requested: i32,
    },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal server error")]
    InternalError,
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::DatabaseError(_) | ServiceError::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
            ServiceError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound | ServiceError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) | ServiceError::InvalidStateTransition { .. } => {
                StatusCode::CONFLICT
            },
            ServiceError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
            ServiceError::InsufficientPoints { .. } | ServiceError::InsufficientStock { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            },
            ServiceError::Unauthorized | ServiceError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            },
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ServiceError::Forbidden(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ServiceError::ValidationError(msg.into())
    }

    /// `map_err` adapter naming the missing resource on `NotFound`
    pub fn not_found(resource: &'static str) -> impl Fn(diesel::result::Error) -> ServiceError {
        move |error| match error {
            diesel::result::Error::NotFound => ServiceError::ResourceNotFound(resource),
            other => other.into(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Never leak database internals to clients
        let error_message = match &self {
            ServiceError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                "Internal server error".to_string()
            },
            ServiceError::NotFound => "Resource not found".to_string(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

// Conversion from various error types
impl From<diesel::result::Error> for ServiceError {
    fn from(error: diesel::result::Error) -> Self {
        match error {
            diesel::result::Error::NotFound => ServiceError::NotFound,
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                ServiceError::Conflict(
                    info.constraint_name()
                        .map(|c| format!("duplicate value violates {}", c))
                        .unwrap_or_else(|| "duplicate value".to_string()),
                )
            },
            diesel::result::Error::DatabaseError(DatabaseErrorKind::CheckViolation, info) => {
                tracing::warn!(
                    "Check constraint {:?} rejected write: {}",
                    info.constraint_name(),
                    info.message()
                );
                ServiceError::ValidationError("value rejected by a data constraint".to_string())
            },
            _ => ServiceError::DatabaseError(error.to_string()),
        }
    }
}

impl From<bb8::RunError<diesel_async::pooled_connection::PoolError>> for ServiceError {
    fn from(error: bb8::RunError<diesel_async::pooled_connection::PoolError>) -> Self {
        ServiceError::DatabaseError(format!("connection pool: {}", error))
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(error: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(error.to_string())
    }
}

impl From<crate::utils::password::PasswordError> for ServiceError {
    fn from(error: crate::utils::password::PasswordError) -> Self {
        tracing::error!("Password hashing failure: {}", error);
        ServiceError::InternalError
    }
}

impl From<crate::services::jwt::JwtError> for ServiceError {
    fn from(error: crate::services::jwt::JwtError) -> Self {
        use crate::services::jwt::JwtError;
        match error {
            JwtError::EncodingError(msg) | JwtError::KeyGenerationError(msg) => {
                tracing::error!("JWT failure: {}", msg);
                ServiceError::InternalError
            },
            JwtError::TokenExpired | JwtError::InvalidToken => ServiceError::Unauthorized,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_violation_hides_database_message() {
        let error = diesel::result::Error::DatabaseError(
            DatabaseErrorKind::CheckViolation,
            Box::new(
                "new row for relation \"reward_transactions\" violates check constraint"
                    .to_string(),
            ),
        );

        let service_error = ServiceError::from(error);
        assert_eq!(service_error.status_code(), StatusCode::BAD_REQUEST);
        assert!(!service_error.to_string().contains("reward_transactions"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ServiceError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ServiceError::InsufficientFunds {
                balance: 100,
                required: 500
            }
            .status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            ServiceError::InvalidStateTransition {
                entity: "appointment",
                from: "completed".to_string(),
                to: "cancelled".to_string(),
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::forbidden("nope").status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_diesel_not_found_maps_to_404() {
        let err: ServiceError = diesel::result::Error::NotFound.into();
        assert!(matches!(err, ServiceError::NotFound));
    }

    #[test]
    fn test_transition_message() {
        let err = ServiceError::InvalidStateTransition {
            entity: "order",
            from: "delivered".to_string(),
            to: "cancelled".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot move order from 'delivered' to 'cancelled'"
        );
    }

    #[tokio::test]
    async fn test_database_error_is_masked() {
        let response =
            ServiceError::DatabaseError("relation users does not exist".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal server error");
        assert_eq!(json["status"], 500);
    }
}
