//! Topic definitions and parsing.

use std::fmt;

use tidyhub_core::types::ConversationId;

/// Typed presence topic identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Per-conversation presence (online + typing of both participants).
    Conversation(ConversationId),
    /// Process-wide online status.
    PresenceGlobal,
}

impl Topic {
    /// Parses a topic string into a typed topic.
    pub fn parse(topic: &str) -> Option<Self> {
        match topic.split_once(':') {
            Some(("conversation", id)) => id.parse().ok().map(Topic::Conversation),
            Some(("presence", "global")) => Some(Topic::PresenceGlobal),
            _ => None,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Conversation(id) => write!(f, "conversation:{id}"),
            Topic::PresenceGlobal => f.write_str("presence:global"),
        }
    }
}
