// Library exports for the wellness marketplace backend

pub mod app;
pub mod app_config;
pub mod config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod migrations;
pub mod models;
pub mod schema;
pub mod services;
pub mod utils;

pub use app::AppState;
pub use app_config::AppConfig;
pub use db::DieselPool;
pub use middleware::{auth_middleware, AuthenticatedUser};
pub use services::{JwtService, PointsLedger, WalletLedger};
pub use utils::ServiceError;

use axum::{middleware::from_fn_with_state, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

pub const API_PREFIX: &str = "/api/v1";

/// Full application router with tracing and CORS applied.
pub fn build_router(state: AppState) -> Router {
    let api = handlers::public_routes().merge(handlers::protected_routes(state.clone()));

    Router::new()
        .nest(API_PREFIX, api)
        .layer(from_fn_with_state(state.clone(), middleware::dynamic_cors_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Load configuration, connect to Postgres and apply pending migrations.
pub async fn initialize_app_state() -> Result<AppState, Box<dyn std::error::Error + Send + Sync>> {
    dotenv::dotenv().ok();

    let config = AppConfig::from_env()?;

    info!("Initializing database pool...");
    let db_config = db::DieselDatabaseConfig::from_app_config(&config);
    let diesel_pool = db::create_diesel_pool(db_config).await?;

    if migrations::should_run_migrations(&config) {
        info!("Running embedded migrations...");
        migrations::run_all_migrations(&config).await?;
    } else {
        info!("Embedded migrations disabled");
    }

    Ok(AppState::new(config, diesel_pool))
}
