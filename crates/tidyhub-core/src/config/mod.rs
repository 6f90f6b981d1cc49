//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section, and every field carries a serde default so a missing file still
//! yields a runnable (in-memory) configuration.

pub mod app;
pub mod auth;
pub mod cache;
pub mod chat;
pub mod database;
pub mod logging;
pub mod realtime;

use serde::{Deserialize, Serialize};

pub use self::app::ServerConfig;
pub use self::auth::AuthConfig;
pub use self::cache::CacheConfig;
pub use self::chat::ChatConfig;
pub use self::database::DatabaseConfig;
pub use self::logging::LoggingConfig;
pub use self::realtime::{NotificationRealtimeConfig, RealtimeConfig};

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Bearer token verification settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Realtime (presence, feeds, alerts) settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Conversation and notification behaviour.
    #[serde(default)]
    pub chat: ChatConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges `config/default.toml` with an environment-specific overlay
    /// and environment variables prefixed with `TIDYHUB__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("TIDYHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.chat.history_window, 100);
        assert_eq!(config.chat.notification_page_size, 10);
        assert_eq!(config.realtime.typing_timeout_ms, 3000);
        assert_eq!(config.realtime.notifications.excerpt_chars, 100);
        assert_eq!(config.realtime.notifications.fallback_sender_name, "Someone");
        assert!(config.database.is_memory());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[chat]\nhistory_window = 20\n[logging]\nformat = \"pretty\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .and_then(|c| c.try_deserialize())
            .unwrap();

        assert_eq!(config.chat.history_window, 20);
        assert_eq!(config.chat.notification_page_size, 10);
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.server.port, 8080);
    }
}
