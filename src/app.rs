// Application state shared across handlers
use std::sync::Arc;

use crate::{app_config::AppConfig, db::DieselPool, services::JwtService};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub diesel_pool: DieselPool,
    pub jwt_service: Arc<JwtService>,
}

impl AppState {
    pub fn new(config: AppConfig, diesel_pool: DieselPool) -> Self {
        let jwt_service = Arc::new(JwtService::from_app_config(&config));
        Self {
            config: Arc::new(config),
            diesel_pool,
            jwt_service,
        }
    }
}
