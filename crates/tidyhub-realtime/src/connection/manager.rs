//! Connection manager: registry of live WebSocket connections.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::info;

use tidyhub_core::types::UserId;

use super::handle::{ConnectionHandle, ConnectionId};
use crate::message::types::OutboundMessage;

/// Tracks all active WebSocket connections.
#[derive(Debug)]
pub struct ConnectionManager {
    connections: DashMap<ConnectionId, Arc<ConnectionHandle>>,
    /// Outbound queue length per connection.
    buffer_size: usize,
}

impl ConnectionManager {
    /// Creates a new connection manager.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            connections: DashMap::new(),
            buffer_size: buffer_size.max(1),
        }
    }

    /// Registers a new authenticated connection.
    ///
    /// Returns the connection handle and a receiver for outbound messages.
    pub fn register(
        &self,
        user_id: UserId,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<OutboundMessage>) {
        let (tx, rx) = mpsc::channel(self.buffer_size);
        let handle = Arc::new(ConnectionHandle::new(user_id, tx));
        self.connections.insert(handle.id, handle.clone());

        info!(conn_id = %handle.id, user_id = %user_id, "WebSocket connection registered");
        (handle, rx)
    }

    /// Unregisters a connection.
    pub fn unregister(&self, conn_id: &ConnectionId) {
        if let Some((_, handle)) = self.connections.remove(conn_id) {
            handle.mark_dead();
            info!(conn_id = %conn_id, user_id = %handle.user_id, "WebSocket connection unregistered");
        }
    }

    /// Total number of live connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of live connections of one user.
    pub fn user_connection_count(&self, user_id: UserId) -> usize {
        self.connections
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .count()
    }

    /// Marks every connection dead; their sessions notice and close.
    pub fn close_all(&self) {
        for entry in self.connections.iter() {
            entry.value().mark_dead();
        }
        info!(count = self.connections.len(), "Closed all connections");
    }
}
