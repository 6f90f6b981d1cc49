//! Top-level real-time engine that ties together all subsystems.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use tidyhub_core::config::RealtimeConfig;
use tidyhub_core::result::AppResult;
use tidyhub_core::types::UserId;
use tidyhub_service::ChatServices;

use crate::connection::ConnectionManager;
use crate::message::types::OutboundMessage;
use crate::presence::{OnlineDirectory, PresenceHub};
use crate::session::ClientSession;

/// Central real-time engine that coordinates all WebSocket subsystems.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Chat services the sessions act through.
    pub services: ChatServices,
    /// Connection manager.
    pub connections: Arc<ConnectionManager>,
    /// Presence topics.
    pub presence: PresenceHub,
    /// Global online status.
    pub online: OnlineDirectory,
    config: Arc<RealtimeConfig>,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine")
            .field("connections", &self.connections.connection_count())
            .field("presence_topics", &self.presence.topic_count())
            .finish()
    }
}

impl RealtimeEngine {
    /// Creates a new real-time engine with all subsystems.
    pub fn new(services: ChatServices, config: RealtimeConfig) -> Self {
        let presence = PresenceHub::new(config.channel_buffer_size);
        let online = OnlineDirectory::new(presence.clone(), services.clock.clone());
        let connections = Arc::new(ConnectionManager::new(config.outbound_buffer_size));

        info!("Real-time engine initialized");

        Self {
            services,
            connections,
            presence,
            online,
            config: Arc::new(config),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    /// Register a connection for `user` and start its session.
    ///
    /// Returns the session and the receiver of its outbound frames; the
    /// initial snapshot is already queued.
    pub async fn connect(
        &self,
        user: UserId,
    ) -> AppResult<(ClientSession, mpsc::Receiver<OutboundMessage>)> {
        let (connection, outbound) = self.connections.register(user);
        let id = connection.id;
        match ClientSession::start(self.clone(), connection).await {
            Ok(session) => Ok((session, outbound)),
            Err(e) => {
                self.connections.unregister(&id);
                Err(e)
            }
        }
    }

    /// Token cancelled when the engine shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Initiates a graceful shutdown of the real-time engine.
    pub fn shutdown(&self) {
        info!("Shutting down real-time engine");
        self.shutdown.cancel();
        self.connections.close_all();
        info!("Real-time engine shut down");
    }
}
