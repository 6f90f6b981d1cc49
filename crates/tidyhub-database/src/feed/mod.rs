//! Row-level change feed.
//!
//! Every write made through the service layer is published here as a
//! [`ChangeEvent`]. Subscribers pick a [`Table`] and a [`RowFilter`]; the
//! filter is evaluated on the publishing side of the subscription so a
//! subscriber never sees rows it is not entitled to.

pub mod event;
pub mod subscription;

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::trace;

pub use event::{ChangeEvent, ChangeKind, Row, RowFilter, Table};
pub use subscription::FeedSubscription;

/// In-process change feed with one broadcast channel per table.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    inner: Arc<FeedChannels>,
}

#[derive(Debug)]
struct FeedChannels {
    conversations: broadcast::Sender<Arc<ChangeEvent>>,
    messages: broadcast::Sender<Arc<ChangeEvent>>,
    notifications: broadcast::Sender<Arc<ChangeEvent>>,
}

impl ChangeFeed {
    /// Create a feed whose per-table channels retain `buffer_size` events.
    pub fn new(buffer_size: usize) -> Self {
        let buffer_size = buffer_size.max(1);
        Self {
            inner: Arc::new(FeedChannels {
                conversations: broadcast::channel(buffer_size).0,
                messages: broadcast::channel(buffer_size).0,
                notifications: broadcast::channel(buffer_size).0,
            }),
        }
    }

    fn sender(&self, table: Table) -> &broadcast::Sender<Arc<ChangeEvent>> {
        match table {
            Table::Conversations => &self.inner.conversations,
            Table::Messages => &self.inner.messages,
            Table::Notifications => &self.inner.notifications,
        }
    }

    /// Publish an event. Returns how many subscriptions received it.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        let table = event.table();
        let kind = event.kind;
        let delivered = self.sender(table).send(Arc::new(event)).unwrap_or(0);
        trace!(table = %table, kind = %kind, delivered, "Published change event");
        delivered
    }

    /// Subscribe to changes on `table` that pass `filter`.
    pub fn subscribe(&self, table: Table, filter: RowFilter) -> FeedSubscription {
        FeedSubscription::new(table, filter, self.sender(table).subscribe())
    }

    /// Number of live subscriptions on `table`.
    pub fn subscriber_count(&self, table: Table) -> usize {
        self.sender(table).receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tidyhub_core::types::{ConversationId, UserId};
    use tidyhub_entity::message::NewMessage;

    fn message_in(conversation: ConversationId) -> Row {
        Row::Message(
            NewMessage {
                conversation_id: conversation,
                sender_id: UserId::new(),
                body: "hello".into(),
                attachment_url: None,
            }
            .into_message(Utc::now()),
        )
    }

    #[tokio::test]
    async fn test_filtered_delivery() {
        let feed = ChangeFeed::new(16);
        let mine = ConversationId::new();
        let theirs = ConversationId::new();
        let mut sub = feed.subscribe(Table::Messages, RowFilter::Conversation(mine));

        feed.publish(ChangeEvent::insert(message_in(theirs)));
        feed.publish(ChangeEvent::insert(message_in(mine)));

        let event = sub.recv().await.unwrap();
        match event.new.as_ref() {
            Some(Row::Message(m)) => assert_eq!(m.conversation_id, mine),
            other => panic!("unexpected row: {other:?}"),
        }
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_drop_releases_subscription() {
        let feed = ChangeFeed::new(16);
        assert_eq!(feed.subscriber_count(Table::Messages), 0);
        let sub = feed.subscribe(Table::Messages, RowFilter::All);
        assert_eq!(feed.subscriber_count(Table::Messages), 1);
        assert_eq!(feed.subscriber_count(Table::Notifications), 0);
        drop(sub);
        assert_eq!(feed.subscriber_count(Table::Messages), 0);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let feed = ChangeFeed::new(4);
        assert_eq!(feed.publish(ChangeEvent::insert(message_in(ConversationId::new()))), 0);
    }

    #[tokio::test]
    async fn test_lagged_subscriber_continues() {
        let feed = ChangeFeed::new(2);
        let conv = ConversationId::new();
        let mut sub = feed.subscribe(Table::Messages, RowFilter::All);
        for _ in 0..5 {
            feed.publish(ChangeEvent::insert(message_in(conv)));
        }
        assert!(sub.recv().await.is_some());
        assert!(sub.recv().await.is_some());
        assert!(sub.try_recv().is_none());
    }
}
