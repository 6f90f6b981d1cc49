//! Wiring of every chat service over one backend.

use std::sync::Arc;
use std::time::Duration;

use tidyhub_cache::CacheManager;
use tidyhub_core::config::AppConfig;
use tidyhub_core::traits::Clock;
use tidyhub_database::{ChangeFeed, Stores};

use crate::conversation::ConversationDirectory;
use crate::message::MessageService;
use crate::notification::{NotificationRules, NotificationService};

/// All chat services, sharing one store bundle, cache, feed, and clock.
#[derive(Debug, Clone)]
pub struct ChatServices {
    /// Conversation lookup and listing.
    pub directory: ConversationDirectory,
    /// Message history, sending, and read state.
    pub messages: MessageService,
    /// Persisted notifications.
    pub notifications: NotificationService,
    /// Notification content rules.
    pub rules: NotificationRules,
    /// Row change feed every write is published to.
    pub feed: ChangeFeed,
    /// Time source.
    pub clock: Arc<dyn Clock>,
}

impl ChatServices {
    /// Build the services from configuration.
    pub fn new(
        stores: &Stores,
        cache: CacheManager,
        feed: ChangeFeed,
        clock: Arc<dyn Clock>,
        config: &AppConfig,
    ) -> Self {
        let directory = ConversationDirectory::new(
            stores,
            cache,
            feed.clone(),
            clock.clone(),
            Duration::from_secs(config.cache.conversation_list_ttl_seconds),
        );
        let notifications = NotificationService::new(
            stores.notifications.clone(),
            feed.clone(),
            clock.clone(),
            config.chat.notification_page_size,
        );
        let rules = NotificationRules::new(&config.realtime.notifications);
        let messages = MessageService::new(
            stores,
            directory.clone(),
            notifications.clone(),
            rules.clone(),
            feed.clone(),
            clock.clone(),
            config.chat.clone(),
        );

        Self {
            directory,
            messages,
            notifications,
            rules,
            feed,
            clock,
        }
    }
}
