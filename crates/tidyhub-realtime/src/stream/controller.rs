//! Live message stream of one open conversation.
//!
//! The feed subscription is taken before history is loaded so no insert can
//! fall between the two; both paths converge in a [`MessageList`].

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use tidyhub_core::result::AppResult;
use tidyhub_core::types::{ConversationId, MessageId};
use tidyhub_database::feed::{ChangeEvent, ChangeKind, FeedSubscription, RowFilter, Table};
use tidyhub_entity::message::Message;
use tidyhub_service::{ChatServices, MessageService, RequestContext};

use super::list::MessageList;

const UPDATE_BUFFER: usize = 64;

/// A change to the open conversation's message list.
#[derive(Debug, Clone)]
pub enum StreamUpdate {
    /// A new message entered the list.
    Inserted(Message),
    /// A known message changed (typically its read mark).
    Updated(Message),
    /// The stream read-marked these messages for the viewer.
    ReadMarked(Vec<MessageId>),
}

/// Opens message streams.
pub struct MessageStream;

impl MessageStream {
    /// Open the live stream of `conversation` for the caller.
    ///
    /// Fails with `Authorization` if the caller is not a participant. The
    /// partner's unread history is read-marked before this returns.
    pub async fn open(
        services: &ChatServices,
        ctx: RequestContext,
        conversation: ConversationId,
    ) -> AppResult<MessageStreamHandle> {
        services
            .directory
            .require_participant(conversation, ctx.user_id)
            .await?;

        let subscription = services
            .feed
            .subscribe(Table::Messages, RowFilter::Conversation(conversation));
        let history = services.messages.history(&ctx, conversation).await?;

        let mut list = MessageList::new(services.messages.history_window());
        list.extend_history(history);
        let list = Arc::new(Mutex::new(list));
        let (updates, _) = broadcast::channel(UPDATE_BUFFER);

        let worker = StreamWorker {
            ctx,
            conversation,
            messages: services.messages.clone(),
            list: list.clone(),
            updates: updates.clone(),
        };
        let initially_marked = worker.mark_partner_read().await;
        let task = tokio::spawn(worker.run(subscription));

        info!(
            user_id = %ctx.user_id,
            conversation_id = %conversation,
            marked = initially_marked.len(),
            "Message stream opened"
        );

        Ok(MessageStreamHandle {
            ctx,
            conversation,
            messages: services.messages.clone(),
            list,
            updates,
            initially_marked,
            task,
        })
    }
}

fn lock(list: &Mutex<MessageList>) -> MutexGuard<'_, MessageList> {
    list.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct StreamWorker {
    ctx: RequestContext,
    conversation: ConversationId,
    messages: MessageService,
    list: Arc<Mutex<MessageList>>,
    updates: broadcast::Sender<StreamUpdate>,
}

impl StreamWorker {
    async fn run(self, mut subscription: FeedSubscription) {
        while let Some(event) = subscription.recv().await {
            let mut arrived = self.apply(&event);
            // Drain what is already buffered so a burst is read-marked once.
            while let Some(event) = subscription.try_recv() {
                arrived |= self.apply(&event);
            }
            if arrived {
                self.mark_partner_read().await;
            }
        }
        debug!(conversation_id = %self.conversation, "Message stream ended");
    }

    /// Returns whether a new message entered the list.
    fn apply(&self, event: &ChangeEvent) -> bool {
        let Some(message) = event.message() else {
            return false;
        };
        match event.kind {
            ChangeKind::Insert => {
                let inserted = lock(&self.list).insert(message.clone());
                if inserted {
                    let _ = self.updates.send(StreamUpdate::Inserted(message.clone()));
                }
                inserted
            }
            ChangeKind::Update => {
                if lock(&self.list).apply_update(message) {
                    let _ = self.updates.send(StreamUpdate::Updated(message.clone()));
                }
                false
            }
            ChangeKind::Delete => false,
        }
    }

    /// Read-mark the partner's unread messages in one batch.
    ///
    /// Failures are logged and leave the messages unread.
    async fn mark_partner_read(&self) -> Vec<MessageId> {
        let unread = lock(&self.list).unread_from(self.ctx.user_id);
        if unread.is_empty() {
            return unread;
        }

        let ctx = RequestContext::new(self.ctx.user_id);
        match self
            .messages
            .mark_read(&ctx, self.conversation, &unread)
            .await
        {
            Ok(changed) => {
                let ids: Vec<MessageId> = changed.iter().map(|m| m.id).collect();
                {
                    let mut list = lock(&self.list);
                    for message in &changed {
                        list.apply_update(message);
                    }
                }
                for message in changed {
                    let _ = self.updates.send(StreamUpdate::Updated(message));
                }
                if !ids.is_empty() {
                    let _ = self.updates.send(StreamUpdate::ReadMarked(ids.clone()));
                }
                ids
            }
            Err(e) => {
                warn!(
                    user_id = %self.ctx.user_id,
                    conversation_id = %self.conversation,
                    error = %e,
                    "Failed to mark messages read"
                );
                Vec::new()
            }
        }
    }
}

/// An open message stream. Dropping it stops the stream and releases the
/// feed subscription.
#[derive(Debug)]
pub struct MessageStreamHandle {
    ctx: RequestContext,
    conversation: ConversationId,
    messages: MessageService,
    list: Arc<Mutex<MessageList>>,
    updates: broadcast::Sender<StreamUpdate>,
    initially_marked: Vec<MessageId>,
    task: JoinHandle<()>,
}

impl MessageStreamHandle {
    pub fn conversation(&self) -> ConversationId {
        self.conversation
    }

    /// Current messages, oldest first.
    pub fn messages(&self) -> Vec<Message> {
        lock(&self.list).messages().to_vec()
    }

    /// Messages read-marked when the stream opened.
    pub fn initially_marked(&self) -> &[MessageId] {
        &self.initially_marked
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StreamUpdate> {
        self.updates.subscribe()
    }

    /// Send a message as the stream's viewer. Blank bodies return `None`.
    pub async fn send(&self, body: &str, attachment_url: Option<String>) -> AppResult<Option<Message>> {
        let ctx = RequestContext::new(self.ctx.user_id);
        self.messages
            .send(&ctx, self.conversation, body, attachment_url)
            .await
    }
}

impl Drop for MessageStreamHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tidyhub_core::error::ErrorKind;
    use tidyhub_core::types::UserId;

    use crate::testing::TestEnv;

    async fn next_update(rx: &mut broadcast::Receiver<StreamUpdate>) -> StreamUpdate {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("no stream update")
            .expect("update channel closed")
    }

    #[tokio::test]
    async fn test_open_marks_partner_history_once() {
        let env = TestEnv::new();
        let (customer, provider, conv) = env.conversation_pair().await;
        let customer_ctx = RequestContext::new(customer);

        env.messages.send(&customer_ctx, conv.id, "hi", None).await.unwrap();
        env.messages.send(&customer_ctx, conv.id, "there", None).await.unwrap();

        let provider_ctx = RequestContext::new(provider);
        let first = MessageStream::open(&env, provider_ctx, conv.id).await.unwrap();
        assert_eq!(first.initially_marked().len(), 2);
        let read_at: Vec<_> = first.messages().iter().map(|m| m.read_at).collect();
        assert!(read_at.iter().all(Option::is_some));
        drop(first);

        let again = MessageStream::open(&env, provider_ctx, conv.id).await.unwrap();
        assert!(again.initially_marked().is_empty());
        let reread: Vec<_> = again.messages().iter().map(|m| m.read_at).collect();
        assert_eq!(read_at, reread);
        assert_eq!(env.messages.unread_count(&provider_ctx, conv.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_live_delivery_is_read_marked_and_sender_unread_stays_zero() {
        let env = TestEnv::new();
        let (customer, provider, conv) = env.conversation_pair().await;

        let viewer = MessageStream::open(&env, RequestContext::new(provider), conv.id)
            .await
            .unwrap();
        let mut updates = viewer.subscribe();

        let sent = env
            .messages
            .send(&RequestContext::new(customer), conv.id, "hello", None)
            .await
            .unwrap()
            .unwrap();

        match next_update(&mut updates).await {
            StreamUpdate::Inserted(m) => assert_eq!(m.id, sent.id),
            other => panic!("unexpected update {other:?}"),
        }
        loop {
            if let StreamUpdate::ReadMarked(ids) = next_update(&mut updates).await {
                assert_eq!(ids, vec![sent.id]);
                break;
            }
        }

        assert!(viewer.messages()[0].read_at.is_some());
        let customer_ctx = RequestContext::new(customer);
        assert_eq!(env.messages.unread_count(&customer_ctx, conv.id).await.unwrap(), 0);
        let provider_ctx = RequestContext::new(provider);
        assert_eq!(env.messages.unread_count(&provider_ctx, conv.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_own_messages_arrive_without_read_mark() {
        let env = TestEnv::new();
        let (customer, _provider, conv) = env.conversation_pair().await;
        let stream = MessageStream::open(&env, RequestContext::new(customer), conv.id)
            .await
            .unwrap();
        let mut updates = stream.subscribe();

        assert!(stream.send("   ", None).await.unwrap().is_none());
        let sent = stream.send("mine", None).await.unwrap().unwrap();

        match next_update(&mut updates).await {
            StreamUpdate::Inserted(m) => assert_eq!(m.id, sent.id),
            other => panic!("unexpected update {other:?}"),
        }
        assert!(stream.messages()[0].read_at.is_none());
        assert_eq!(env.memory.message_count().await, 1);
    }

    #[tokio::test]
    async fn test_non_participant_cannot_open() {
        let env = TestEnv::new();
        let (_, _, conv) = env.conversation_pair().await;
        let err = MessageStream::open(&env, RequestContext::new(UserId::new()), conv.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);
    }

    #[tokio::test]
    async fn test_drop_releases_feed_subscription() {
        let env = TestEnv::new();
        let (customer, _, conv) = env.conversation_pair().await;
        let stream = MessageStream::open(&env, RequestContext::new(customer), conv.id)
            .await
            .unwrap();
        assert_eq!(env.feed.subscriber_count(Table::Messages), 1);

        drop(stream);
        for _ in 0..100 {
            if env.feed.subscriber_count(Table::Messages) == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(env.feed.subscriber_count(Table::Messages), 0);
    }
}
