//! Conversation, message, and notification behaviour.

use serde::{Deserialize, Serialize};

/// Chat behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Number of most recent messages loaded when a conversation is opened.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Default page size for the notification list.
    #[serde(default = "default_notification_page_size")]
    pub notification_page_size: u64,
    /// Maximum characters kept in a conversation's last-message preview.
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
    /// Maximum accepted message body length in characters.
    #[serde(default = "default_max_body_chars")]
    pub max_body_chars: usize,
    /// Whether sending a message persists a `message` notification for the recipient.
    #[serde(default = "default_true")]
    pub notify_recipient: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            notification_page_size: default_notification_page_size(),
            preview_chars: default_preview_chars(),
            max_body_chars: default_max_body_chars(),
            notify_recipient: true,
        }
    }
}

fn default_history_window() -> usize {
    100
}

fn default_notification_page_size() -> u64 {
    10
}

fn default_preview_chars() -> usize {
    120
}

fn default_max_body_chars() -> usize {
    5000
}

fn default_true() -> bool {
    true
}
