//! Backend selection and the bundle of store handles services share.

use std::sync::Arc;

use tracing::info;

use tidyhub_core::config::DatabaseConfig;
use tidyhub_core::result::AppResult;

use crate::connection::DatabasePool;
use crate::memory::MemoryStore;
use crate::repositories::{
    ConversationRepository, MessageRepository, NotificationRepository, ProfileRepository,
};
use crate::store::{ConversationStore, MessageStore, NotificationStore, ProfileStore};

/// Shared handles to every store, backed by one backend.
#[derive(Debug, Clone)]
pub struct Stores {
    /// Conversation persistence.
    pub conversations: Arc<dyn ConversationStore>,
    /// Message persistence.
    pub messages: Arc<dyn MessageStore>,
    /// Notification persistence.
    pub notifications: Arc<dyn NotificationStore>,
    /// Profile lookups.
    pub profiles: Arc<dyn ProfileStore>,
    pool: Option<DatabasePool>,
}

impl Stores {
    /// Open the backend named by `config.url`.
    ///
    /// `memory://` selects the in-memory store; anything else is treated as
    /// a PostgreSQL URL, connected to and migrated.
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        if config.is_memory() {
            info!("Using in-memory store");
            return Ok(Self::from_memory(Arc::new(MemoryStore::new())));
        }
        let pool = DatabasePool::connect(config).await?;
        pool.migrate().await?;
        Ok(Self::postgres(pool))
    }

    /// Stores backed by a single in-memory store.
    pub fn from_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            conversations: store.clone(),
            messages: store.clone(),
            notifications: store.clone(),
            profiles: store,
            pool: None,
        }
    }

    /// Stores backed by PostgreSQL repositories.
    pub fn postgres(pool: DatabasePool) -> Self {
        let pg = pool.pool().clone();
        Self {
            conversations: Arc::new(ConversationRepository::new(pg.clone())),
            messages: Arc::new(MessageRepository::new(pg.clone())),
            notifications: Arc::new(NotificationRepository::new(pg.clone())),
            profiles: Arc::new(ProfileRepository::new(pg)),
            pool: Some(pool),
        }
    }

    /// Check backend connectivity. The in-memory backend is always healthy.
    pub async fn health_check(&self) -> AppResult<bool> {
        match &self.pool {
            Some(pool) => pool.health_check().await,
            None => Ok(true),
        }
    }

    /// Close the backend's connections, if any.
    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
