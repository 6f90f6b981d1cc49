//! Conversation list entry enriched for display.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tidyhub_core::types::{ConversationId, UserId};

/// One row of a user's conversation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Conversation identifier.
    pub id: ConversationId,
    /// The participant that is not the viewer.
    pub other_user_id: UserId,
    /// Resolved display name of the other participant.
    pub other_user_name: String,
    /// Avatar of the other participant.
    pub other_user_avatar: Option<String>,
    /// When the last message was sent.
    pub last_message_at: Option<DateTime<Utc>>,
    /// Truncated body of the last message.
    pub last_message_preview: Option<String>,
    /// Messages from the other participant the viewer has not read.
    pub unread_count: u64,
    /// When the conversation was created.
    pub created_at: DateTime<Utc>,
}
