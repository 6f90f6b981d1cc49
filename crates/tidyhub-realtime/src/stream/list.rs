//! Ordered, de-duplicated, bounded message list.

use tidyhub_core::types::{MessageId, UserId};
use tidyhub_entity::message::Message;

/// The messages of one open conversation, oldest first.
///
/// History loads and live inserts both go through [`MessageList::insert`],
/// so a message delivered by both paths appears once. Order is
/// `(created_at, id)`; past `capacity` the oldest messages fall off.
#[derive(Debug, Clone)]
pub struct MessageList {
    messages: Vec<Message>,
    capacity: usize,
}

impl MessageList {
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Insert a message. Returns `false` for a duplicate id or a message
    /// too old to fit.
    ///
    /// A duplicate keeps the read mark if either copy has one.
    pub fn insert(&mut self, message: Message) -> bool {
        if let Some(existing) = self.messages.iter_mut().find(|m| m.id == message.id) {
            existing.read_at = existing.read_at.or(message.read_at);
            return false;
        }

        let key = (message.created_at, message.id);
        let pos = self
            .messages
            .partition_point(|m| (m.created_at, m.id) <= key);
        self.messages.insert(pos, message);

        if self.messages.len() > self.capacity {
            self.messages.remove(0);
            return pos > 0;
        }
        true
    }

    /// Insert a history page.
    pub fn extend_history(&mut self, history: impl IntoIterator<Item = Message>) {
        for message in history {
            self.insert(message);
        }
    }

    /// Replace a known message in place. Unknown ids are ignored.
    pub fn apply_update(&mut self, message: &Message) -> bool {
        match self.messages.iter_mut().find(|m| m.id == message.id) {
            Some(existing) if existing != message => {
                *existing = message.clone();
                true
            }
            _ => false,
        }
    }

    /// Ids of messages unread by `viewer`.
    pub fn unread_from(&self, viewer: UserId) -> Vec<MessageId> {
        self.messages
            .iter()
            .filter(|m| m.is_unread_for(viewer))
            .map(|m| m.id)
            .collect()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tidyhub_core::types::ConversationId;

    fn message(conversation: ConversationId, sender: UserId, offset_secs: i64) -> Message {
        Message {
            id: MessageId::new(),
            conversation_id: conversation,
            sender_id: sender,
            body: format!("at {offset_secs}"),
            attachment_url: None,
            read_at: None,
            created_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    #[test]
    fn test_history_and_live_copy_appear_once() {
        let conv = ConversationId::new();
        let sender = UserId::new();
        let first = message(conv, sender, 0);
        let second = message(conv, sender, 1);

        let mut list = MessageList::new(100);
        assert!(list.insert(second.clone()));
        list.extend_history(vec![first.clone(), second.clone()]);

        assert_eq!(list.len(), 2);
        assert_eq!(list.messages()[0].id, first.id);
        assert_eq!(list.messages()[1].id, second.id);
    }

    #[test]
    fn test_duplicate_keeps_read_mark() {
        let conv = ConversationId::new();
        let mut read = message(conv, UserId::new(), 0);
        let unread = read.clone();
        read.read_at = Some(Utc::now());

        let mut list = MessageList::new(10);
        list.insert(read);
        assert!(!list.insert(unread));
        assert!(list.messages()[0].read_at.is_some());
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let conv = ConversationId::new();
        let sender = UserId::new();
        let mut list = MessageList::new(2);
        let a = message(conv, sender, 0);
        let b = message(conv, sender, 1);
        let c = message(conv, sender, 2);
        list.insert(a.clone());
        list.insert(b.clone());
        assert!(list.insert(c.clone()));
        assert_eq!(
            list.messages().iter().map(|m| m.id).collect::<Vec<_>>(),
            vec![b.id, c.id]
        );
        // Older than everything retained.
        assert!(!list.insert(a));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_apply_update_and_unread() {
        let conv = ConversationId::new();
        let me = UserId::new();
        let partner = UserId::new();
        let mine = message(conv, me, 0);
        let theirs = message(conv, partner, 1);

        let mut list = MessageList::new(10);
        list.extend_history(vec![mine, theirs.clone()]);
        assert_eq!(list.unread_from(me), vec![theirs.id]);

        let mut updated = theirs.clone();
        updated.read_at = Some(Utc::now());
        assert!(list.apply_update(&updated));
        assert!(!list.apply_update(&updated));
        assert!(list.unread_from(me).is_empty());

        assert!(!list.apply_update(&message(conv, partner, 5)));
    }
}
