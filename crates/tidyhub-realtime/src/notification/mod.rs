//! Live notification center and desktop alerts.

pub mod alert;
pub mod center;
pub mod notifier;
pub mod socket;
pub mod tray;
pub mod view;

pub use alert::DesktopAlertListener;
pub use center::{NotificationCenter, NotificationCenterHandle, NotificationChange};
pub use notifier::{DesktopAlert, DesktopNotifier, NotificationPermission};
pub use socket::SocketNotifier;
pub use tray::AlertTray;
pub use view::{Surface, ViewTracker};
