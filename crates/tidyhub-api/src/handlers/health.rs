//! Health check handler.

use axum::Json;
use axum::extract::State;
use tracing::warn;

use crate::dto::response::{ApiResponse, HealthResponse};
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let database_ok = match state.stores.health_check().await {
        Ok(ok) => ok,
        Err(e) => {
            warn!(error = %e, "Database health check failed");
            false
        }
    };

    Json(ApiResponse::ok(HealthResponse {
        status: if database_ok { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if database_ok { "connected" } else { "unavailable" }.to_string(),
        ws_connections: state.realtime.connections.connection_count(),
        online_users: state.realtime.online.online_users().len(),
    }))
}
