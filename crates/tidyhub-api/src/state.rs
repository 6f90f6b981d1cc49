//! Application state shared across all handlers.

use std::sync::Arc;

use tidyhub_core::config::AppConfig;
use tidyhub_database::Stores;
use tidyhub_realtime::RealtimeEngine;
use tidyhub_service::ChatServices;

use crate::jwt::JwtVerifier;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`. Every field is cheap
/// to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Store handles, for health checks
    pub stores: Stores,
    /// Chat services
    pub services: ChatServices,
    /// WebSocket realtime engine
    pub realtime: RealtimeEngine,
    /// Bearer token verifier
    pub jwt: Arc<JwtVerifier>,
}

impl AppState {
    /// Assemble the state; the realtime engine shares `services`.
    pub fn new(config: AppConfig, stores: Stores, services: ChatServices) -> Self {
        let realtime = RealtimeEngine::new(services.clone(), config.realtime.clone());
        let jwt = Arc::new(JwtVerifier::new(&config.auth));
        Self {
            config: Arc::new(config),
            stores,
            services,
            realtime,
            jwt,
        }
    }
}
