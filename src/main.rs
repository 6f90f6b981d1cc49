//! TidyHub Chat Server: realtime customer/provider messaging
//!
//! Main entry point that wires all crates together and starts the server.

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

use tidyhub_cache::CacheManager;
use tidyhub_core::config::AppConfig;
use tidyhub_core::error::AppError;
use tidyhub_core::traits::SystemClock;
use tidyhub_database::{ChangeFeed, Stores};
use tidyhub_service::ChatServices;

#[tokio::main]
async fn main() {
    let env = std::env::var("TIDYHUB_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting TidyHub chat v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Backend stores (migrations run on connect) ───────
    tracing::info!("Connecting to backend...");
    let stores = Stores::connect(&config.database).await?;

    // ── Step 2: Cache, change feed, services ─────────────────────
    let cache = CacheManager::new(&config.cache);
    let feed = ChangeFeed::new(config.realtime.channel_buffer_size);
    let services = ChatServices::new(&stores, cache, feed, Arc::new(SystemClock), &config);
    tracing::info!("Services initialized");

    // ── Step 3: Build and start HTTP server ──────────────────────
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);

    let state = tidyhub_api::AppState::new(config, stores.clone(), services);
    let realtime = state.realtime.clone();
    let app = tidyhub_api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;
    tracing::info!("TidyHub chat server listening on {}", addr);

    let shutdown = realtime.shutdown_token();
    let mut server = tokio::spawn(
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .into_future(),
    );

    // ── Step 4: Graceful shutdown ────────────────────────────────
    tokio::select! {
        result = &mut server => {
            stores.close().await;
            return match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(AppError::internal(format!("Server error: {}", e))),
                Err(e) => Err(AppError::internal(format!("Server task failed: {}", e))),
            };
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received, starting graceful shutdown...");
        }
    }

    // Closing every client session lets open WebSockets finish.
    realtime.shutdown();
    match tokio::time::timeout(grace, server).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => tracing::error!("Server error during shutdown: {}", e),
        Ok(Err(e)) => tracing::error!("Server task failed: {}", e),
        Err(_) => tracing::warn!(
            grace_seconds = grace.as_secs(),
            "Connections still open after grace period, exiting"
        ),
    }

    stores.close().await;
    tracing::info!("TidyHub chat server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
