//! Conversation entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tidyhub_core::types::{ConversationId, UserId};

/// A one-to-one thread between a customer and a service provider.
///
/// At most one conversation exists per unordered participant pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Conversation {
    /// Unique conversation identifier.
    pub id: ConversationId,
    /// The customer participant.
    pub customer_id: UserId,
    /// The provider participant.
    pub provider_id: UserId,
    /// When the last message was sent.
    pub last_message_at: Option<DateTime<Utc>>,
    /// Truncated body of the last message.
    pub last_message_preview: Option<String>,
    /// When the conversation was created.
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Build a fresh conversation row for the given pair.
    pub fn new(customer_id: UserId, provider_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: ConversationId::new(),
            customer_id,
            provider_id,
            last_message_at: None,
            last_message_preview: None,
            created_at: now,
        }
    }

    /// Check whether `user` is one of the two participants.
    pub fn has_participant(&self, user: UserId) -> bool {
        self.customer_id == user || self.provider_id == user
    }

    /// Return the participant that is not `user`, if `user` participates.
    pub fn other_participant(&self, user: UserId) -> Option<UserId> {
        if self.customer_id == user {
            Some(self.provider_id)
        } else if self.provider_id == user {
            Some(self.customer_id)
        } else {
            None
        }
    }

    /// Check whether this conversation joins `a` and `b` in either order.
    pub fn joins(&self, a: UserId, b: UserId) -> bool {
        (self.customer_id == a && self.provider_id == b)
            || (self.customer_id == b && self.provider_id == a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participants() {
        let customer = UserId::new();
        let provider = UserId::new();
        let stranger = UserId::new();
        let conv = Conversation::new(customer, provider, Utc::now());

        assert!(conv.has_participant(customer));
        assert!(conv.has_participant(provider));
        assert!(!conv.has_participant(stranger));
        assert_eq!(conv.other_participant(customer), Some(provider));
        assert_eq!(conv.other_participant(provider), Some(customer));
        assert_eq!(conv.other_participant(stranger), None);
    }

    #[test]
    fn test_joins_is_unordered() {
        let a = UserId::new();
        let b = UserId::new();
        let conv = Conversation::new(a, b, Utc::now());
        assert!(conv.joins(a, b));
        assert!(conv.joins(b, a));
        assert!(!conv.joins(a, a));
    }
}
