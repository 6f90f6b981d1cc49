//! Realtime engine configuration.

use serde::{Deserialize, Serialize};

/// Realtime (feeds, presence, WebSocket sessions) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Buffer size for change-feed and presence broadcast channels.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Buffer size for a session's outbound message queue.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer_size: usize,
    /// Delay after which a typing announcement reverts to not typing.
    #[serde(default = "default_typing_timeout")]
    pub typing_timeout_ms: u64,
    /// Maximum conversations a single connection may keep open.
    #[serde(default = "default_max_open_conversations")]
    pub max_open_conversations: usize,
    /// Notification and desktop alert settings.
    #[serde(default)]
    pub notifications: NotificationRealtimeConfig,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: default_channel_buffer(),
            outbound_buffer_size: default_outbound_buffer(),
            typing_timeout_ms: default_typing_timeout(),
            max_open_conversations: default_max_open_conversations(),
            notifications: NotificationRealtimeConfig::default(),
        }
    }
}

/// Desktop alert settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRealtimeConfig {
    /// Maximum characters of the message body shown in a desktop alert.
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,
    /// Icon URL attached to desktop alerts.
    #[serde(default = "default_alert_icon")]
    pub alert_icon: String,
    /// Sender name used when the sender has no usable profile name.
    #[serde(default = "default_fallback_sender")]
    pub fallback_sender_name: String,
}

impl Default for NotificationRealtimeConfig {
    fn default() -> Self {
        Self {
            excerpt_chars: default_excerpt_chars(),
            alert_icon: default_alert_icon(),
            fallback_sender_name: default_fallback_sender(),
        }
    }
}

fn default_channel_buffer() -> usize {
    256
}

fn default_outbound_buffer() -> usize {
    128
}

fn default_typing_timeout() -> u64 {
    3000
}

fn default_max_open_conversations() -> usize {
    20
}

fn default_excerpt_chars() -> usize {
    100
}

fn default_alert_icon() -> String {
    "/favicon.ico".to_string()
}

fn default_fallback_sender() -> String {
    "Someone".to_string()
}
