//! Shared application state for the Axum API server.

use std::sync::Arc;

use assure_common::config::AppConfig;
use assure_engine::services::Services;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<Services>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(services: Services, config: AppConfig) -> Self {
        Self {
            services: Arc::new(services),
            config: Arc::new(config),
        }
    }
}
