//! Conversation lookup, lazy creation, and the enriched per-user list.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::{debug, info, warn};

use tidyhub_cache::{CacheManager, keys};
use tidyhub_core::error::AppError;
use tidyhub_core::result::AppResult;
use tidyhub_core::traits::{CacheProvider, Clock};
use tidyhub_core::types::{ConversationId, UserId};
use tidyhub_database::feed::{ChangeEvent, ChangeFeed, Row};
use tidyhub_database::store::{ConversationStore, MessageStore, ProfileStore};
use tidyhub_database::Stores;
use tidyhub_entity::conversation::{Conversation, ConversationSummary};
use tidyhub_entity::profile::Profile;

use crate::context::RequestContext;

/// Display name used when the other participant has no usable profile.
pub const UNKNOWN_USER: &str = "Unknown user";

/// Resolves, creates, and lists conversations.
#[derive(Debug, Clone)]
pub struct ConversationDirectory {
    conversations: Arc<dyn ConversationStore>,
    messages: Arc<dyn MessageStore>,
    profiles: Arc<dyn ProfileStore>,
    cache: CacheManager,
    feed: ChangeFeed,
    clock: Arc<dyn Clock>,
    list_ttl: Duration,
    /// Per-user invalidation counter; a list loaded across a bump is stale.
    generations: Arc<DashMap<UserId, u64>>,
}

impl ConversationDirectory {
    /// Creates a new conversation directory.
    pub fn new(
        stores: &Stores,
        cache: CacheManager,
        feed: ChangeFeed,
        clock: Arc<dyn Clock>,
        list_ttl: Duration,
    ) -> Self {
        Self {
            conversations: stores.conversations.clone(),
            messages: stores.messages.clone(),
            profiles: stores.profiles.clone(),
            cache,
            feed,
            clock,
            list_ttl,
            generations: Arc::new(DashMap::new()),
        }
    }

    /// Return the conversation between `customer_id` and `provider_id`,
    /// creating it if none exists. The caller must be one of the two.
    ///
    /// Concurrent calls for the same pair (from either side) converge on a
    /// single row: losing an insert race falls back to fetching the winner.
    pub async fn get_or_create(
        &self,
        ctx: &RequestContext,
        customer_id: UserId,
        provider_id: UserId,
    ) -> AppResult<Conversation> {
        if customer_id == provider_id {
            return Err(AppError::validation(
                "A conversation needs two different participants",
            ));
        }
        if ctx.user_id != customer_id && ctx.user_id != provider_id {
            return Err(AppError::authorization(
                "Cannot open a conversation you do not participate in",
            ));
        }

        if let Some(existing) = self.conversations.find_by_pair(customer_id, provider_id).await? {
            return Ok(existing);
        }

        let fresh = Conversation::new(customer_id, provider_id, self.clock.now());
        match self.conversations.insert(&fresh).await {
            Ok(created) => {
                info!(
                    conversation_id = %created.id,
                    customer_id = %customer_id,
                    provider_id = %provider_id,
                    "Conversation created"
                );
                self.feed
                    .publish(ChangeEvent::insert(Row::Conversation(created.clone())));
                self.invalidate(customer_id).await;
                self.invalidate(provider_id).await;
                Ok(created)
            }
            Err(e) if e.is_conflict() => {
                debug!(
                    customer_id = %customer_id,
                    provider_id = %provider_id,
                    "Lost conversation insert race, fetching existing row"
                );
                self.conversations
                    .find_by_pair(customer_id, provider_id)
                    .await?
                    .ok_or_else(|| AppError::internal("Conversation missing after insert conflict"))
            }
            Err(e) => Err(e),
        }
    }

    /// Every conversation of the caller, enriched for display and sorted by
    /// most recent message (conversations without messages last).
    pub async fn list(&self, ctx: &RequestContext) -> AppResult<Vec<ConversationSummary>> {
        let key = keys::conversation_list(ctx.user_id);
        match self.cache.get_json::<Vec<ConversationSummary>>(&key).await {
            Ok(Some(cached)) => return Ok(cached),
            Ok(None) => {}
            Err(e) => warn!(user_id = %ctx.user_id, error = %e, "Conversation list cache read failed"),
        }

        let generation = self.generation(ctx.user_id);
        let list = self.load_list(ctx.user_id).await?;
        if self.generation(ctx.user_id) != generation {
            debug!(user_id = %ctx.user_id, "Conversation list changed during load, not caching");
            return Ok(list);
        }
        if let Err(e) = self.cache.set_json(&key, &list, self.list_ttl).await {
            warn!(user_id = %ctx.user_id, error = %e, "Conversation list cache write failed");
        }
        // An invalidation between the check and the write must still win.
        if self.generation(ctx.user_id) != generation {
            self.evict(ctx.user_id).await;
        }
        Ok(list)
    }

    fn generation(&self, user: UserId) -> u64 {
        self.generations.get(&user).map_or(0, |g| *g)
    }

    async fn load_list(&self, user: UserId) -> AppResult<Vec<ConversationSummary>> {
        let conversations = self.conversations.list_for_user(user).await?;
        let others: Vec<UserId> = conversations
            .iter()
            .filter_map(|c| c.other_participant(user))
            .collect();
        let ids: Vec<ConversationId> = conversations.iter().map(|c| c.id).collect();

        let profiles = self.profiles.find_many(&others).await?;
        let unread = self.messages.unread_counts(&ids, user).await?;

        let mut summaries: Vec<ConversationSummary> = conversations
            .into_iter()
            .filter_map(|c| {
                let other = c.other_participant(user)?;
                let profile = profiles.get(&other);
                Some(ConversationSummary {
                    id: c.id,
                    other_user_id: other,
                    other_user_name: Profile::display_name_or(profile, UNKNOWN_USER).to_string(),
                    other_user_avatar: profile.and_then(|p| p.avatar_url.clone()),
                    last_message_at: c.last_message_at,
                    last_message_preview: c.last_message_preview,
                    unread_count: unread.get(&c.id).copied().unwrap_or(0),
                    created_at: c.created_at,
                })
            })
            .collect();
        sort_by_activity(&mut summaries);
        Ok(summaries)
    }

    /// Look up a conversation by id.
    pub async fn conversation(&self, id: ConversationId) -> AppResult<Conversation> {
        self.conversations
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Conversation {id} not found")))
    }

    /// Look up a conversation and check that `user` participates in it.
    pub async fn require_participant(
        &self,
        id: ConversationId,
        user: UserId,
    ) -> AppResult<Conversation> {
        let conversation = self.conversation(id).await?;
        if !conversation.has_participant(user) {
            return Err(AppError::authorization(format!(
                "Not a participant of conversation {id}"
            )));
        }
        Ok(conversation)
    }

    /// Check participation without failing on a missing conversation.
    pub async fn is_participant(&self, id: ConversationId, user: UserId) -> AppResult<bool> {
        Ok(self
            .conversations
            .find_by_id(id)
            .await?
            .is_some_and(|c| c.has_participant(user)))
    }

    /// Resolve a user's display name, using `fallback` when the profile is
    /// missing or blank.
    pub async fn display_name(&self, user: UserId, fallback: &str) -> AppResult<String> {
        let profile = self.profiles.find(user).await?;
        Ok(Profile::display_name_or(profile.as_ref(), fallback).to_string())
    }

    /// Drop the cached conversation list of `user`, including one that a
    /// concurrent [`Self::list`] is about to write. Failures are logged.
    pub async fn invalidate(&self, user: UserId) {
        *self.generations.entry(user).or_insert(0) += 1;
        self.evict(user).await;
    }

    async fn evict(&self, user: UserId) {
        if let Err(e) = self.cache.delete(&keys::conversation_list(user)).await {
            warn!(user_id = %user, error = %e, "Failed to invalidate conversation list");
        }
    }
}

fn sort_by_activity(list: &mut [ConversationSummary]) {
    list.sort_by(|a, b| {
        b.last_message_at
            .is_some()
            .cmp(&a.last_message_at.is_some())
            .then(b.last_message_at.cmp(&a.last_message_at))
            .then(b.created_at.cmp(&a.created_at))
    });
}
