//! Notification service and the rules that turn events into notifications.

pub mod rules;
pub mod service;

pub use rules::NotificationRules;
pub use service::NotificationService;
