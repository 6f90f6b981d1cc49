//! Route definitions for the chat HTTP API.
//!
//! REST routes are mounted under `/api`; the WebSocket endpoint lives at
//! `/ws`. The router receives `AppState` and passes it to all handlers via
//! Axum's `State` extractor.

use std::time::Duration;

use axum::{
    Router,
    routing::{get, post, put},
};
use http::{Method, header};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(conversation_routes())
        .merge(notification_routes())
        .merge(health_routes());

    let ws_routes = Router::new().route("/ws", get(handlers::ws::ws_handler));

    let cors = build_cors_layer(&state);

    Router::new()
        .nest("/api", api_routes)
        .merge(ws_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Conversation directory and message endpoints
fn conversation_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/conversations",
            get(handlers::conversation::list_conversations)
                .post(handlers::conversation::get_or_create_conversation),
        )
        .route(
            "/conversations/{id}/messages",
            get(handlers::message::history).post(handlers::message::send_message),
        )
        .route(
            "/conversations/{id}/read",
            post(handlers::message::mark_read),
        )
}

/// Notification endpoints
fn notification_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications",
            get(handlers::notification::list_notifications),
        )
        .route(
            "/notifications/unread-count",
            get(handlers::notification::unread_count),
        )
        .route(
            "/notifications/{id}/read",
            put(handlers::notification::mark_read),
        )
        .route(
            "/notifications/read-all",
            put(handlers::notification::mark_all_read),
        )
}

/// Health check endpoint (no auth required)
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}

/// Build CORS layer from configuration
fn build_cors_layer(state: &AppState) -> CorsLayer {
    let cors_config = &state.config.server.cors;

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(cors_config.max_age_seconds));

    if cors_config.allowed_origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<http::HeaderValue> = cors_config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}
