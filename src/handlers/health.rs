use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{app::AppState, db};

#[derive(Debug, Serialize, ToSchema)]
pub struct ComponentHealth {
    /// `healthy` or `unhealthy`
    pub status: String,
    pub max_connections: Option<u32>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthComponents {
    pub postgresql: ComponentHealth,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: String,
    pub service: String,
    pub timestamp: String,
    pub components: HealthComponents,
}

#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    operation_id = "healthCheck",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let postgresql = match db::check_diesel_health(&state.diesel_pool).await {
        Ok(()) => ComponentHealth {
            status: "healthy".to_string(),
            max_connections: Some(state.config.database.max_connections),
            error: None,
        },
        Err(e) => {
            tracing::warn!("Health check: database unavailable: {}", e);
            ComponentHealth {
                status: "unhealthy".to_string(),
                max_connections: None,
                error: Some(format!("Database connection failed: {}", e)),
            }
        },
    };

    let healthy = postgresql.error.is_none();
    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        components: HealthComponents { postgresql },
    };

    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(response))
}
