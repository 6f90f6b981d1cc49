//! Message entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tidyhub_core::types::{ConversationId, MessageId, UserId};

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Message {
    /// Unique message identifier.
    pub id: MessageId,
    /// The conversation this message belongs to.
    pub conversation_id: ConversationId,
    /// Who sent the message.
    pub sender_id: UserId,
    /// Message text.
    pub body: String,
    /// Optional attachment reference.
    pub attachment_url: Option<String>,
    /// When the recipient read the message. Set once, never cleared.
    pub read_at: Option<DateTime<Utc>>,
    /// When the message was sent.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Check whether this message counts as unread for `viewer`.
    ///
    /// A viewer's own messages are never unread for them.
    pub fn is_unread_for(&self, viewer: UserId) -> bool {
        self.read_at.is_none() && self.sender_id != viewer
    }
}

/// Data for inserting a new message.
#[derive(Debug, Clone)]
pub struct NewMessage {
    /// Target conversation.
    pub conversation_id: ConversationId,
    /// Sender (must participate in the conversation).
    pub sender_id: UserId,
    /// Message text, already trimmed and non-empty.
    pub body: String,
    /// Optional attachment reference.
    pub attachment_url: Option<String>,
}

impl NewMessage {
    /// Materialize the row with a fresh id and creation time.
    pub fn into_message(self, now: DateTime<Utc>) -> Message {
        Message {
            id: MessageId::new(),
            conversation_id: self.conversation_id,
            sender_id: self.sender_id,
            body: self.body,
            attachment_url: self.attachment_url,
            read_at: None,
            created_at: now,
        }
    }
}
