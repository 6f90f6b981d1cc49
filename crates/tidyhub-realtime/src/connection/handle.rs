//! Individual WebSocket connection handle.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;

use tidyhub_core::types::UserId;

use crate::message::types::OutboundMessage;

/// Unique connection identifier
pub type ConnectionId = Uuid;

/// A handle to a single WebSocket connection.
///
/// Holds the sender channel for pushing messages to the client plus the
/// connected user.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// User who owns this connection
    pub user_id: UserId,
    /// Sender for outbound messages
    sender: mpsc::Sender<OutboundMessage>,
    /// When the connection was established
    pub connected_at: DateTime<Utc>,
    /// Whether the connection is still alive
    alive: AtomicBool,
    /// Cancelled once the connection is marked dead
    closed: CancellationToken,
}

impl ConnectionHandle {
    /// Create a new connection handle
    pub fn new(user_id: UserId, sender: mpsc::Sender<OutboundMessage>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            sender,
            connected_at: Utc::now(),
            alive: AtomicBool::new(true),
            closed: CancellationToken::new(),
        }
    }

    /// Queue an outbound message. Returns `false` if it was dropped.
    ///
    /// A client that lets its buffer fill has missed a frame and can no
    /// longer trust its view, so the connection is marked dead and the
    /// client has to reconnect and reload.
    pub fn send(&self, msg: OutboundMessage) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(conn_id = %self.id, user_id = %self.user_id, "Connection send buffer full, closing connection");
                self.mark_dead();
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                false
            }
        }
    }

    /// Check if connection is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark connection as dead
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
        self.closed.cancel();
    }

    /// Token cancelled when the connection is marked dead.
    pub fn closed(&self) -> CancellationToken {
        self.closed.clone()
    }
}
