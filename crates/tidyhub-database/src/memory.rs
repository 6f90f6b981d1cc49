//! In-memory store for tests and `memory://` development runs.
//!
//! Implements every store trait with the same observable semantics as the
//! PostgreSQL repositories, including pair uniqueness for conversations and
//! the conditional read-mark update.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use tidyhub_core::error::AppError;
use tidyhub_core::result::AppResult;
use tidyhub_core::types::{
    ConversationId, MessageId, NotificationId, PageRequest, PageResponse, UserId,
};
use tidyhub_entity::conversation::Conversation;
use tidyhub_entity::message::Message;
use tidyhub_entity::notification::Notification;
use tidyhub_entity::profile::Profile;

use crate::store::{ConversationStore, MessageStore, NotificationStore, ProfileStore};

/// In-memory implementation of all store traits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    conversations: RwLock<HashMap<ConversationId, Conversation>>,
    messages: RwLock<Vec<Message>>,
    notifications: RwLock<Vec<Notification>>,
    profiles: RwLock<HashMap<UserId, Profile>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a profile. Profiles are external data, so this only
    /// exists for seeding.
    pub async fn seed_profile(&self, profile: Profile) {
        self.profiles.write().await.insert(profile.user_id, profile);
    }

    /// Number of stored messages across all conversations.
    pub async fn message_count(&self) -> usize {
        self.messages.read().await.len()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn find_by_pair(&self, a: UserId, b: UserId) -> AppResult<Option<Conversation>> {
        Ok(self
            .conversations
            .read()
            .await
            .values()
            .find(|c| c.joins(a, b))
            .cloned())
    }

    async fn find_by_id(&self, id: ConversationId) -> AppResult<Option<Conversation>> {
        Ok(self.conversations.read().await.get(&id).cloned())
    }

    async fn insert(&self, conversation: &Conversation) -> AppResult<Conversation> {
        let mut conversations = self.conversations.write().await;
        if conversations
            .values()
            .any(|c| c.joins(conversation.customer_id, conversation.provider_id))
        {
            return Err(AppError::conflict(format!(
                "Conversation between {} and {} already exists",
                conversation.customer_id, conversation.provider_id
            )));
        }
        conversations.insert(conversation.id, conversation.clone());
        Ok(conversation.clone())
    }

    async fn list_for_user(&self, user: UserId) -> AppResult<Vec<Conversation>> {
        let mut list: Vec<Conversation> = self
            .conversations
            .read()
            .await
            .values()
            .filter(|c| c.has_participant(user))
            .cloned()
            .collect();
        list.sort_by(|a, b| {
            b.last_message_at
                .is_some()
                .cmp(&a.last_message_at.is_some())
                .then(b.last_message_at.cmp(&a.last_message_at))
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(list)
    }

    async fn touch_last_message(
        &self,
        id: ConversationId,
        at: DateTime<Utc>,
        preview: &str,
    ) -> AppResult<Option<Conversation>> {
        let mut conversations = self.conversations.write().await;
        Ok(conversations.get_mut(&id).map(|c| {
            c.last_message_at = Some(at);
            c.last_message_preview = Some(preview.to_string());
            c.clone()
        }))
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn recent(&self, conversation: ConversationId, limit: u64) -> AppResult<Vec<Message>> {
        let mut list: Vec<Message> = self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| m.conversation_id == conversation)
            .cloned()
            .collect();
        list.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        let skip = list.len().saturating_sub(limit as usize);
        Ok(list.split_off(skip))
    }

    async fn insert(&self, message: &Message) -> AppResult<Message> {
        let mut messages = self.messages.write().await;
        if messages.iter().any(|m| m.id == message.id) {
            return Err(AppError::conflict(format!("Message {} already exists", message.id)));
        }
        messages.push(message.clone());
        Ok(message.clone())
    }

    async fn mark_read(
        &self,
        conversation: ConversationId,
        ids: &[MessageId],
        reader: UserId,
        at: DateTime<Utc>,
    ) -> AppResult<Vec<Message>> {
        let mut messages = self.messages.write().await;
        Ok(messages
            .iter_mut()
            .filter(|m| {
                m.conversation_id == conversation && ids.contains(&m.id) && m.is_unread_for(reader)
            })
            .map(|m| {
                m.read_at = Some(at);
                m.clone()
            })
            .collect())
    }

    async fn count_unread(&self, conversation: ConversationId, viewer: UserId) -> AppResult<u64> {
        Ok(self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| m.conversation_id == conversation && m.is_unread_for(viewer))
            .count() as u64)
    }

    async fn unread_counts(
        &self,
        conversations: &[ConversationId],
        viewer: UserId,
    ) -> AppResult<HashMap<ConversationId, u64>> {
        let mut counts = HashMap::new();
        for m in self.messages.read().await.iter() {
            if conversations.contains(&m.conversation_id) && m.is_unread_for(viewer) {
                *counts.entry(m.conversation_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn page(&self, user: UserId, page: &PageRequest) -> AppResult<PageResponse<Notification>> {
        let mut mine: Vec<Notification> = self
            .notifications
            .read()
            .await
            .iter()
            .filter(|n| n.user_id == user)
            .cloned()
            .collect();
        mine.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        let total = mine.len() as u64;
        let items = mine
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(page.limit()).unwrap_or(usize::MAX))
            .collect();
        Ok(PageResponse::new(items, page, total))
    }

    async fn count_unread(&self, user: UserId) -> AppResult<u64> {
        Ok(self
            .notifications
            .read()
            .await
            .iter()
            .filter(|n| n.user_id == user && n.is_unread())
            .count() as u64)
    }

    async fn insert(&self, notification: &Notification) -> AppResult<Notification> {
        self.notifications.write().await.push(notification.clone());
        Ok(notification.clone())
    }

    async fn mark_read(
        &self,
        id: NotificationId,
        user: UserId,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Notification>> {
        let mut notifications = self.notifications.write().await;
        Ok(notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user)
            .and_then(|n| n.mark_read(at).then(|| n.clone())))
    }

    async fn mark_all_read(&self, user: UserId, at: DateTime<Utc>) -> AppResult<Vec<Notification>> {
        let mut notifications = self.notifications.write().await;
        Ok(notifications
            .iter_mut()
            .filter(|n| n.user_id == user)
            .filter_map(|n| n.mark_read(at).then(|| n.clone()))
            .collect())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn find(&self, user: UserId) -> AppResult<Option<Profile>> {
        Ok(self.profiles.read().await.get(&user).cloned())
    }

    async fn find_many(&self, users: &[UserId]) -> AppResult<HashMap<UserId, Profile>> {
        let profiles = self.profiles.read().await;
        Ok(users
            .iter()
            .filter_map(|u| profiles.get(u).map(|p| (*u, p.clone())))
            .collect())
    }
}
