//! Desktop notification surface.

use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use tidyhub_core::result::AppResult;

/// Permission state of the desktop notification surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPermission {
    /// Not asked yet.
    #[default]
    Default,
    Granted,
    Denied,
    /// The client cannot show desktop notifications at all.
    Unsupported,
}

/// A desktop alert for an incoming message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesktopAlert {
    pub title: String,
    pub body: String,
    pub icon: String,
    /// Coalescing key: one pending alert per tag.
    pub tag: String,
}

/// Something that can show desktop alerts.
#[async_trait]
pub trait DesktopNotifier: Send + Sync + Debug + 'static {
    /// Current permission state.
    async fn permission(&self) -> NotificationPermission;

    /// Ask for permission. Returns the state known after asking.
    async fn request_permission(&self) -> NotificationPermission;

    /// Show an alert. Only called with permission granted.
    async fn show(&self, alert: &DesktopAlert) -> AppResult<()>;
}
