//! Message persistence operations behind the live stream controller.

use std::sync::Arc;

use tracing::{debug, info, warn};

use tidyhub_core::config::ChatConfig;
use tidyhub_core::error::AppError;
use tidyhub_core::result::AppResult;
use tidyhub_core::traits::Clock;
use tidyhub_core::types::{ConversationId, MessageId};
use tidyhub_database::feed::{ChangeEvent, ChangeFeed, Row};
use tidyhub_database::store::{ConversationStore, MessageStore};
use tidyhub_database::Stores;
use tidyhub_entity::conversation::Conversation;
use tidyhub_entity::message::{Message, NewMessage};

use crate::context::RequestContext;
use crate::conversation::ConversationDirectory;
use crate::notification::{NotificationRules, NotificationService};
use crate::text::truncate_chars;

/// Loads history, sends messages, and records read state.
#[derive(Debug, Clone)]
pub struct MessageService {
    directory: ConversationDirectory,
    notifications: NotificationService,
    rules: NotificationRules,
    conversations: Arc<dyn ConversationStore>,
    messages: Arc<dyn MessageStore>,
    feed: ChangeFeed,
    clock: Arc<dyn Clock>,
    config: ChatConfig,
}

impl MessageService {
    /// Creates a new message service.
    pub fn new(
        stores: &Stores,
        directory: ConversationDirectory,
        notifications: NotificationService,
        rules: NotificationRules,
        feed: ChangeFeed,
        clock: Arc<dyn Clock>,
        config: ChatConfig,
    ) -> Self {
        Self {
            directory,
            notifications,
            rules,
            conversations: stores.conversations.clone(),
            messages: stores.messages.clone(),
            feed,
            clock,
            config,
        }
    }

    /// Number of messages a history load returns.
    pub fn history_window(&self) -> usize {
        self.config.history_window
    }

    /// The newest messages of a conversation, oldest first.
    ///
    /// Only the last `chat.history_window` messages are returned; there is
    /// no scroll-back.
    pub async fn history(
        &self,
        ctx: &RequestContext,
        conversation: ConversationId,
    ) -> AppResult<Vec<Message>> {
        self.directory
            .require_participant(conversation, ctx.user_id)
            .await?;
        self.messages
            .recent(conversation, self.config.history_window as u64)
            .await
    }

    /// Send a message as the caller.
    ///
    /// A body that is blank after trimming is a no-op returning `None`. The
    /// conversation preview, cache invalidation, and recipient notification
    /// are side effects whose failures are logged, not returned.
    pub async fn send(
        &self,
        ctx: &RequestContext,
        conversation: ConversationId,
        body: &str,
        attachment_url: Option<String>,
    ) -> AppResult<Option<Message>> {
        let body = body.trim();
        if body.is_empty() {
            debug!(user_id = %ctx.user_id, conversation_id = %conversation, "Ignoring blank message");
            return Ok(None);
        }
        if body.chars().count() > self.config.max_body_chars {
            return Err(AppError::validation(format!(
                "Message exceeds {} characters",
                self.config.max_body_chars
            )));
        }

        let conv = self
            .directory
            .require_participant(conversation, ctx.user_id)
            .await?;

        let message = self
            .messages
            .insert(
                &NewMessage {
                    conversation_id: conversation,
                    sender_id: ctx.user_id,
                    body: body.to_string(),
                    attachment_url,
                }
                .into_message(self.clock.now()),
            )
            .await?;

        info!(
            message_id = %message.id,
            conversation_id = %conversation,
            sender_id = %ctx.user_id,
            "Message sent"
        );
        self.feed
            .publish(ChangeEvent::insert(Row::Message(message.clone())));

        self.touch_preview(&conv, &message).await;
        self.directory.invalidate(conv.customer_id).await;
        self.directory.invalidate(conv.provider_id).await;

        if self.config.notify_recipient {
            self.notify_recipient(&conv, &message).await;
        }

        Ok(Some(message))
    }

    async fn touch_preview(&self, conv: &Conversation, message: &Message) {
        let preview = truncate_chars(&message.body, self.config.preview_chars);
        match self
            .conversations
            .touch_last_message(conv.id, message.created_at, preview)
            .await
        {
            Ok(Some(updated)) => {
                self.feed.publish(ChangeEvent::update(
                    Some(Row::Conversation(conv.clone())),
                    Row::Conversation(updated),
                ));
            }
            Ok(None) => {}
            Err(e) => {
                warn!(conversation_id = %conv.id, error = %e, "Failed to update conversation preview");
            }
        }
    }

    async fn notify_recipient(&self, conv: &Conversation, message: &Message) {
        let Some(recipient) = conv.other_participant(message.sender_id) else {
            return;
        };
        let sender_name = match self
            .directory
            .display_name(message.sender_id, self.rules.fallback_sender_name())
            .await
        {
            Ok(name) => name,
            Err(e) => {
                warn!(sender_id = %message.sender_id, error = %e, "Failed to resolve sender name");
                self.rules.fallback_sender_name().to_string()
            }
        };

        let notification = self.rules.message_received(recipient, &sender_name, message);
        if let Err(e) = self.notifications.create(notification).await {
            warn!(
                message_id = %message.id,
                recipient_id = %recipient,
                error = %e,
                "Failed to create message notification"
            );
        }
    }

    /// Mark the given messages read for the caller.
    ///
    /// Only messages that belong to the conversation, are unread, and were
    /// not sent by the caller change; repeating the call is a no-op.
    pub async fn mark_read(
        &self,
        ctx: &RequestContext,
        conversation: ConversationId,
        ids: &[MessageId],
    ) -> AppResult<Vec<Message>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.directory
            .require_participant(conversation, ctx.user_id)
            .await?;

        let changed = self
            .messages
            .mark_read(conversation, ids, ctx.user_id, self.clock.now())
            .await?;

        if !changed.is_empty() {
            debug!(
                user_id = %ctx.user_id,
                conversation_id = %conversation,
                count = changed.len(),
                "Messages marked read"
            );
            for message in &changed {
                let old = Message {
                    read_at: None,
                    ..message.clone()
                };
                self.feed.publish(ChangeEvent::update(
                    Some(Row::Message(old)),
                    Row::Message(message.clone()),
                ));
            }
            self.directory.invalidate(ctx.user_id).await;
        }
        Ok(changed)
    }

    /// Unread messages in the conversation not sent by the caller.
    pub async fn unread_count(
        &self,
        ctx: &RequestContext,
        conversation: ConversationId,
    ) -> AppResult<u64> {
        self.directory
            .require_participant(conversation, ctx.user_id)
            .await?;
        self.messages.count_unread(conversation, ctx.user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidyhub_core::error::ErrorKind;
    use tidyhub_core::types::{PageRequest, UserId};
    use tidyhub_database::{RowFilter, Table};

    use crate::testing::Harness;

    async fn pair(h: &Harness) -> (UserId, UserId, ConversationId) {
        let customer = UserId::new();
        let provider = UserId::new();
        let conv = h
            .directory
            .get_or_create(&RequestContext::new(customer), customer, provider)
            .await
            .unwrap();
        (customer, provider, conv.id)
    }

    #[tokio::test]
    async fn test_blank_send_never_reaches_store() {
        let h = Harness::new();
        let (customer, _, conv) = pair(&h).await;
        let sent = h
            .messages
            .send(&RequestContext::new(customer), conv, "   \n\t", None)
            .await
            .unwrap();
        assert!(sent.is_none());
        assert_eq!(h.memory.message_count().await, 0);
    }

    #[tokio::test]
    async fn test_send_trims_and_publishes() {
        let h = Harness::new();
        let (customer, _, conv) = pair(&h).await;
        let mut sub = h.feed.subscribe(Table::Messages, RowFilter::Conversation(conv));

        let sent = h
            .messages
            .send(&RequestContext::new(customer), conv, "  hi there  ", None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sent.body, "hi there");
        assert_eq!(sub.try_recv().and_then(|e| e.message().map(|m| m.id)), Some(sent.id));

        let stored = h.directory.conversation(conv).await.unwrap();
        assert_eq!(stored.last_message_preview.as_deref(), Some("hi there"));
        assert_eq!(stored.last_message_at, Some(sent.created_at));
    }

    #[tokio::test]
    async fn test_outsider_cannot_read_or_send() {
        let h = Harness::new();
        let (_, _, conv) = pair(&h).await;
        let outsider = RequestContext::new(UserId::new());

        let err = h.messages.history(&outsider, conv).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);
        let err = h.messages.send(&outsider, conv, "hey", None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);
        assert_eq!(h.memory.message_count().await, 0);
    }

    #[tokio::test]
    async fn test_overlong_body_rejected() {
        let h = Harness::new();
        let (customer, _, conv) = pair(&h).await;
        let body = "x".repeat(5001);
        let err = h
            .messages
            .send(&RequestContext::new(customer), conv, &body, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_history_window_is_bounded() {
        let h = Harness::with_history_window(3);
        let (customer, _, conv) = pair(&h).await;
        let ctx = RequestContext::new(customer);
        for i in 0..5 {
            h.messages.send(&ctx, conv, &format!("m{i}"), None).await.unwrap();
        }

        let history = h.messages.history(&ctx, conv).await.unwrap();
        let bodies: Vec<&str> = history.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["m2", "m3", "m4"]);
    }

    #[tokio::test]
    async fn test_mark_read_is_idempotent() {
        let h = Harness::new();
        let (customer, provider, conv) = pair(&h).await;
        let sent = h
            .messages
            .send(&RequestContext::new(customer), conv, "quote please", None)
            .await
            .unwrap()
            .unwrap();
        let reader = RequestContext::new(provider);

        let own = h
            .messages
            .mark_read(&RequestContext::new(customer), conv, &[sent.id])
            .await
            .unwrap();
        assert!(own.is_empty(), "a sender cannot read-mark their own message");

        let first = h.messages.mark_read(&reader, conv, &[sent.id]).await.unwrap();
        assert_eq!(first.len(), 1);
        let read_at = first[0].read_at;
        assert!(read_at.is_some());

        let second = h.messages.mark_read(&reader, conv, &[sent.id]).await.unwrap();
        assert!(second.is_empty());
        let history = h.messages.history(&reader, conv).await.unwrap();
        assert_eq!(history[0].read_at, read_at);
        assert_eq!(h.messages.unread_count(&reader, conv).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_send_notifies_recipient() {
        let h = Harness::new();
        let (customer, provider, conv) = pair(&h).await;
        h.memory
            .seed_profile(tidyhub_entity::profile::Profile {
                user_id: customer,
                full_name: Some("Dana".into()),
                business_name: None,
                avatar_url: None,
            })
            .await;

        h.messages
            .send(&RequestContext::new(customer), conv, "Are you free Friday?", None)
            .await
            .unwrap();

        let page = h
            .notifications
            .list(&RequestContext::new(provider), &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].title, "New message from Dana");
        assert_eq!(page.items[0].body.as_deref(), Some("Are you free Friday?"));

        let sender_page = h
            .notifications
            .list(&RequestContext::new(customer), &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(sender_page.total, 0);
    }
}
