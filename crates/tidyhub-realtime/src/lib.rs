//! # tidyhub-realtime
//!
//! Real-time engine for TidyHub chat. Provides:
//!
//! - Live message streams with read marking for open conversations
//! - Per-conversation presence with typing indicators
//! - Process-wide online status
//! - A live notification center and desktop alerts
//! - WebSocket client sessions owning all of the above

pub mod channel;
pub mod connection;
pub mod message;
pub mod notification;
pub mod presence;
pub mod server;
pub mod session;
pub mod stream;

#[cfg(test)]
mod testing;

pub use connection::ConnectionManager;
pub use message::{InboundMessage, OutboundMessage};
pub use presence::{ConversationPresence, OnlineDirectory, PresenceHub, PresenceView};
pub use server::RealtimeEngine;
pub use session::ClientSession;
pub use stream::{MessageStream, MessageStreamHandle, StreamUpdate};
