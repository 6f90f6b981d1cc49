//! Notification entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tidyhub_core::types::{NotificationId, UserId};

use super::NotificationKind;

/// A persisted notification for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Notification {
    /// Unique notification identifier.
    pub id: NotificationId,
    /// The recipient user.
    pub user_id: UserId,
    /// What produced the notification.
    pub kind: NotificationKind,
    /// Notification title.
    pub title: String,
    /// Optional body text.
    pub body: Option<String>,
    /// Optional in-app link.
    pub link: Option<String>,
    /// Additional structured data (JSON object).
    pub payload: serde_json::Value,
    /// Whether the user has read this notification.
    pub is_read: bool,
    /// When the notification was read.
    pub read_at: Option<DateTime<Utc>>,
    /// When the notification was created.
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Check if the notification has not been read.
    pub fn is_unread(&self) -> bool {
        !self.is_read
    }

    /// Flip to read. Returns `false` if it was already read.
    pub fn mark_read(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_read {
            return false;
        }
        self.is_read = true;
        self.read_at = Some(at);
        true
    }
}

/// Data for creating a notification.
#[derive(Debug, Clone)]
pub struct NewNotification {
    /// Recipient.
    pub user_id: UserId,
    /// Kind.
    pub kind: NotificationKind,
    /// Title.
    pub title: String,
    /// Optional body.
    pub body: Option<String>,
    /// Optional link.
    pub link: Option<String>,
    /// Structured payload; `None` stores an empty object.
    pub payload: Option<serde_json::Value>,
}

impl NewNotification {
    /// Materialize the row with a fresh id and creation time.
    pub fn into_notification(self, now: DateTime<Utc>) -> Notification {
        Notification {
            id: NotificationId::new(),
            user_id: self.user_id,
            kind: self.kind,
            title: self.title,
            body: self.body,
            link: self.link,
            payload: self
                .payload
                .unwrap_or_else(|| serde_json::Value::Object(Default::default())),
            is_read: false,
            read_at: None,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_read_once() {
        let mut n = NewNotification {
            user_id: UserId::new(),
            kind: NotificationKind::General,
            title: "Welcome".into(),
            body: None,
            link: None,
            payload: None,
        }
        .into_notification(Utc::now());

        assert!(n.is_unread());
        assert_eq!(n.payload, serde_json::json!({}));

        let first = Utc::now();
        assert!(n.mark_read(first));
        assert!(!n.mark_read(Utc::now()));
        assert_eq!(n.read_at, Some(first));
    }
}
