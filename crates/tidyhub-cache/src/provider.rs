//! Cache manager that wraps the configured provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use tidyhub_core::config::cache::CacheConfig;
use tidyhub_core::result::AppResult;
use tidyhub_core::traits::cache::CacheProvider;

use crate::memory::MemoryCacheProvider;

/// Cache manager shared by the services.
///
/// Cheap to clone; all clones see the same entries.
#[derive(Debug, Clone)]
pub struct CacheManager {
    /// The inner cache provider.
    inner: Arc<dyn CacheProvider>,
}

impl CacheManager {
    /// Create a new cache manager from configuration.
    pub fn new(config: &CacheConfig) -> Self {
        info!(
            max_capacity = config.max_capacity,
            conversation_list_ttl_seconds = config.conversation_list_ttl_seconds,
            "Initializing in-memory cache provider"
        );
        Self {
            inner: Arc::new(MemoryCacheProvider::new(config)),
        }
    }

    /// Get a JSON-deserialized value.
    ///
    /// An entry that no longer deserializes is treated as a miss and dropped.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let Some(raw) = self.inner.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key, error = %e, "Dropping undecodable cache entry");
                self.inner.delete(key).await?;
                Ok(None)
            }
        }
    }

    /// Set a JSON-serialized value with a TTL.
    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> AppResult<()> {
        let raw = serde_json::to_string(value)?;
        self.inner.set(key, &raw, ttl).await
    }
}

#[async_trait]
impl CacheProvider for CacheManager {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.inner.delete(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_json_roundtrip() {
        let cache = CacheManager::new(&CacheConfig::default());
        let data = serde_json::json!({"name": "test", "count": 42});
        cache
            .set_json("json_key", &data, Duration::from_secs(60))
            .await
            .unwrap();
        let result: Option<serde_json::Value> = cache.get_json("json_key").await.unwrap();
        assert_eq!(result, Some(data));
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss() {
        let cache = CacheManager::new(&CacheConfig::default());
        cache
            .set("bad", "not json", Duration::from_secs(60))
            .await
            .unwrap();
        let result: Option<Vec<u32>> = cache.get_json("bad").await.unwrap();
        assert!(result.is_none());
        assert!(cache.get("bad").await.unwrap().is_none());
    }
}
