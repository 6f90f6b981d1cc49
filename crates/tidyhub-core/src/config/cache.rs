//! Cache configuration.

use serde::{Deserialize, Serialize};

/// In-process cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries in the cache.
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
    /// TTL for a user's enriched conversation list.
    #[serde(default = "default_conversation_list_ttl")]
    pub conversation_list_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_max_capacity(),
            conversation_list_ttl_seconds: default_conversation_list_ttl(),
        }
    }
}

fn default_max_capacity() -> u64 {
    10000
}

fn default_conversation_list_ttl() -> u64 {
    60
}
