//! Presence state value objects.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tidyhub_core::types::UserId;

/// What one connection announces about its user on a presence topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceMeta {
    /// Identifies the announcing connection.
    pub connection_ref: String,
    /// Whether the user is currently composing a message.
    pub typing: bool,
    /// When this announcement was last refreshed.
    pub last_seen_at: DateTime<Utc>,
}

/// Full member state of a topic: every present user with one meta per connection.
pub type PresenceSnapshot = HashMap<UserId, Vec<PresenceMeta>>;
