//! Inbound and outbound WebSocket message type definitions.

use serde::{Deserialize, Serialize};

use tidyhub_core::types::{ConversationId, NotificationId, UserId};
use tidyhub_entity::conversation::{Conversation, ConversationSummary};
use tidyhub_entity::message::Message;
use tidyhub_entity::notification::Notification;

use crate::notification::{DesktopAlert, NotificationPermission, Surface};
use crate::presence::PresenceView;

/// Messages sent by the client to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Open a conversation: stream its messages and join its presence.
    OpenConversation {
        conversation_id: ConversationId,
    },
    /// Close a previously opened conversation.
    CloseConversation {
        conversation_id: ConversationId,
    },
    /// Send a message into an open conversation.
    SendMessage {
        conversation_id: ConversationId,
        body: String,
        #[serde(default)]
        attachment_url: Option<String>,
    },
    /// Typing indicator for an open conversation.
    Typing {
        conversation_id: ConversationId,
        typing: bool,
    },
    /// The client navigated to another surface.
    View {
        surface: Surface,
    },
    /// The browser's desktop notification permission.
    NotificationPermission {
        permission: NotificationPermission,
    },
    /// Mark one notification as read.
    MarkNotificationRead {
        notification_id: NotificationId,
    },
    /// Mark every notification as read.
    MarkAllNotificationsRead,
}

/// Messages sent by the server to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// A conversation was opened; carries its current window of messages.
    ConversationOpened {
        conversation: Conversation,
        messages: Vec<Message>,
        presence: PresenceView,
    },
    /// A new message in an open conversation.
    MessageInserted {
        message: Message,
    },
    /// A message in an open conversation changed.
    MessageUpdated {
        message: Message,
    },
    /// Partner presence of an open conversation changed.
    PresenceChanged {
        conversation_id: ConversationId,
        presence: PresenceView,
    },
    /// The set of online users.
    OnlineUsers {
        users: Vec<UserId>,
    },
    /// The caller's conversation list changed.
    ConversationsChanged {
        conversations: Vec<ConversationSummary>,
    },
    /// Notification state changed. `notification` is absent on the initial
    /// snapshot.
    NotificationsChanged {
        notification: Option<Notification>,
        unread_count: u64,
    },
    /// Show a desktop alert.
    DesktopAlert {
        alert: DesktopAlert,
    },
    /// Ask the browser for desktop notification permission.
    RequestNotificationPermission,
    /// A request on this socket failed.
    Error {
        code: String,
        message: String,
    },
}

impl OutboundMessage {
    /// Error frame from an application error.
    pub fn error(err: &tidyhub_core::error::AppError) -> Self {
        Self::Error {
            code: err.kind.to_string(),
            message: err.message.clone(),
        }
    }
}
