//! Notification content rules: what a notification for a given event says.

use serde_json::json;

use tidyhub_core::config::NotificationRealtimeConfig;
use tidyhub_core::types::UserId;
use tidyhub_entity::message::Message;
use tidyhub_entity::notification::{NewNotification, NotificationKind};

use crate::text::truncate_chars;

/// Builds notifications for chat events.
#[derive(Debug, Clone)]
pub struct NotificationRules {
    excerpt_chars: usize,
    fallback_sender_name: String,
}

impl NotificationRules {
    /// Creates the rules from the notification settings.
    pub fn new(config: &NotificationRealtimeConfig) -> Self {
        Self {
            excerpt_chars: config.excerpt_chars,
            fallback_sender_name: config.fallback_sender_name.clone(),
        }
    }

    /// Name used when a sender has no usable profile.
    pub fn fallback_sender_name(&self) -> &str {
        &self.fallback_sender_name
    }

    /// Leading excerpt of a message body.
    pub fn excerpt<'a>(&self, body: &'a str) -> &'a str {
        truncate_chars(body, self.excerpt_chars)
    }

    /// Link that opens a conversation in the client.
    pub fn conversation_link(message: &Message) -> String {
        format!("/messages?conversation={}", message.conversation_id)
    }

    /// Notification telling `recipient` that `message` arrived.
    pub fn message_received(
        &self,
        recipient: UserId,
        sender_name: &str,
        message: &Message,
    ) -> NewNotification {
        NewNotification {
            user_id: recipient,
            kind: NotificationKind::Message,
            title: format!("New message from {sender_name}"),
            body: Some(self.excerpt(&message.body).to_string()),
            link: Some(Self::conversation_link(message)),
            payload: Some(json!({
                "conversation_id": message.conversation_id,
                "message_id": message.id,
                "sender_id": message.sender_id,
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tidyhub_core::types::ConversationId;
    use tidyhub_entity::message::NewMessage;

    #[test]
    fn test_message_received_excerpt() {
        let rules = NotificationRules::new(&NotificationRealtimeConfig::default());
        let message = NewMessage {
            conversation_id: ConversationId::new(),
            sender_id: UserId::new(),
            body: "a".repeat(250),
            attachment_url: None,
        }
        .into_message(Utc::now());
        let recipient = UserId::new();

        let n = rules.message_received(recipient, "Someone", &message);
        assert_eq!(n.user_id, recipient);
        assert_eq!(n.kind, NotificationKind::Message);
        assert_eq!(n.body.as_deref().map(str::len), Some(100));
        assert_eq!(
            n.link,
            Some(format!("/messages?conversation={}", message.conversation_id))
        );
        assert_eq!(
            n.payload.as_ref().and_then(|p| p.get("message_id")),
            Some(&json!(message.id))
        );
    }
}
