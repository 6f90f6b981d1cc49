//! In-memory service harness for unit tests.

use std::ops::Deref;
use std::sync::Arc;

use tidyhub_cache::CacheManager;
use tidyhub_core::config::AppConfig;
use tidyhub_core::traits::SystemClock;
use tidyhub_core::types::UserId;
use tidyhub_database::{ChangeFeed, MemoryStore, Stores};
use tidyhub_entity::profile::Profile;

use crate::services::ChatServices;

pub(crate) struct Harness {
    pub memory: Arc<MemoryStore>,
    services: ChatServices,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_history_window(window: usize) -> Self {
        let mut config = AppConfig::default();
        config.chat.history_window = window;
        Self::with_config(config)
    }

    fn with_config(config: AppConfig) -> Self {
        let memory = Arc::new(MemoryStore::new());
        let stores = Stores::from_memory(memory.clone());
        let services = ChatServices::new(
            &stores,
            CacheManager::new(&config.cache),
            ChangeFeed::new(config.realtime.channel_buffer_size),
            Arc::new(SystemClock),
            &config,
        );
        Self { memory, services }
    }

    pub async fn seed_profile(&self, full_name: Option<&str>, business_name: Option<&str>) -> UserId {
        let user_id = UserId::new();
        self.memory
            .seed_profile(Profile {
                user_id,
                full_name: full_name.map(String::from),
                business_name: business_name.map(String::from),
                avatar_url: None,
            })
            .await;
        user_id
    }
}

impl Deref for Harness {
    type Target = ChatServices;

    fn deref(&self) -> &ChatServices {
        &self.services
    }
}
