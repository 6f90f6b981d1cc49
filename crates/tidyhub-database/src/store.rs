//! Store traits implemented by every persistence backend.

use std::collections::HashMap;
use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tidyhub_core::result::AppResult;
use tidyhub_core::types::{ConversationId, MessageId, NotificationId, PageRequest, PageResponse, UserId};
use tidyhub_entity::conversation::Conversation;
use tidyhub_entity::message::Message;
use tidyhub_entity::notification::Notification;
use tidyhub_entity::profile::Profile;

/// Persistence for conversations.
#[async_trait]
pub trait ConversationStore: Send + Sync + Debug + 'static {
    /// Find the conversation joining `a` and `b`, in either role order.
    async fn find_by_pair(&self, a: UserId, b: UserId) -> AppResult<Option<Conversation>>;

    /// Find a conversation by id.
    async fn find_by_id(&self, id: ConversationId) -> AppResult<Option<Conversation>>;

    /// Insert a conversation.
    ///
    /// Fails with `ErrorKind::Conflict` when the unordered pair already has one.
    async fn insert(&self, conversation: &Conversation) -> AppResult<Conversation>;

    /// All conversations `user` participates in, most recent activity first.
    async fn list_for_user(&self, user: UserId) -> AppResult<Vec<Conversation>>;

    /// Record the last message time and preview. Returns the updated row.
    async fn touch_last_message(
        &self,
        id: ConversationId,
        at: DateTime<Utc>,
        preview: &str,
    ) -> AppResult<Option<Conversation>>;
}

/// Persistence for messages.
#[async_trait]
pub trait MessageStore: Send + Sync + Debug + 'static {
    /// The newest `limit` messages of a conversation, oldest first.
    async fn recent(&self, conversation: ConversationId, limit: u64) -> AppResult<Vec<Message>>;

    /// Insert a message.
    async fn insert(&self, message: &Message) -> AppResult<Message>;

    /// Set `read_at = at` on those of `ids` that belong to `conversation`,
    /// are unread and were not sent by `reader`. Returns the changed rows.
    async fn mark_read(
        &self,
        conversation: ConversationId,
        ids: &[MessageId],
        reader: UserId,
        at: DateTime<Utc>,
    ) -> AppResult<Vec<Message>>;

    /// Unread messages in `conversation` not sent by `viewer`.
    async fn count_unread(&self, conversation: ConversationId, viewer: UserId) -> AppResult<u64>;

    /// [`MessageStore::count_unread`] for many conversations at once.
    /// Conversations without unread messages may be absent from the map.
    async fn unread_counts(
        &self,
        conversations: &[ConversationId],
        viewer: UserId,
    ) -> AppResult<HashMap<ConversationId, u64>>;
}

/// Persistence for notifications.
#[async_trait]
pub trait NotificationStore: Send + Sync + Debug + 'static {
    /// One page of a user's notifications, newest first.
    async fn page(&self, user: UserId, page: &PageRequest) -> AppResult<PageResponse<Notification>>;

    /// Unread notifications of `user`.
    async fn count_unread(&self, user: UserId) -> AppResult<u64>;

    /// Insert a notification.
    async fn insert(&self, notification: &Notification) -> AppResult<Notification>;

    /// Mark one notification read if it belongs to `user` and is unread.
    /// Returns the changed row, or `None` when nothing changed.
    async fn mark_read(
        &self,
        id: NotificationId,
        user: UserId,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Notification>>;

    /// Mark every unread notification of `user` read. Returns the changed rows.
    async fn mark_all_read(&self, user: UserId, at: DateTime<Utc>) -> AppResult<Vec<Notification>>;
}

/// Read-only access to user profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync + Debug + 'static {
    /// Profile of one user.
    async fn find(&self, user: UserId) -> AppResult<Option<Profile>>;

    /// Profiles of many users, keyed by user id. Unknown users are absent.
    async fn find_many(&self, users: &[UserId]) -> AppResult<HashMap<UserId, Profile>>;
}
