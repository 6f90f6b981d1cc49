//! Desktop notifier backed by the client's WebSocket.
//!
//! Alerts and permission requests go out as frames; the browser reports its
//! permission state back with a `notification_permission` frame.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use tidyhub_core::error::AppError;
use tidyhub_core::result::AppResult;

use super::notifier::{DesktopAlert, DesktopNotifier, NotificationPermission};
use crate::connection::ConnectionHandle;
use crate::message::types::OutboundMessage;

#[derive(Debug)]
pub struct SocketNotifier {
    connection: Arc<ConnectionHandle>,
    permission: Mutex<NotificationPermission>,
    requested: AtomicBool,
}

impl SocketNotifier {
    pub fn new(connection: Arc<ConnectionHandle>) -> Self {
        Self {
            connection,
            permission: Mutex::new(NotificationPermission::Default),
            requested: AtomicBool::new(false),
        }
    }

    fn current(&self) -> NotificationPermission {
        *self.permission.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the permission reported by the browser.
    pub fn set_permission(&self, permission: NotificationPermission) {
        *self.permission.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = permission;
        debug!(conn_id = %self.connection.id, ?permission, "Notification permission reported");
    }
}

#[async_trait]
impl DesktopNotifier for SocketNotifier {
    async fn permission(&self) -> NotificationPermission {
        self.current()
    }

    /// Asks the browser once; the answer arrives later as an inbound frame.
    async fn request_permission(&self) -> NotificationPermission {
        let current = self.current();
        if current == NotificationPermission::Default && !self.requested.swap(true, Ordering::SeqCst) {
            self.connection
                .send(OutboundMessage::RequestNotificationPermission);
        }
        current
    }

    async fn show(&self, alert: &DesktopAlert) -> AppResult<()> {
        if self.connection.send(OutboundMessage::DesktopAlert {
            alert: alert.clone(),
        }) {
            Ok(())
        } else {
            Err(AppError::service_unavailable("Desktop alert could not be delivered"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidyhub_core::types::UserId;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_permission_requested_once() {
        let (tx, mut rx) = mpsc::channel(8);
        let notifier = SocketNotifier::new(Arc::new(ConnectionHandle::new(UserId::new(), tx)));

        assert_eq!(notifier.request_permission().await, NotificationPermission::Default);
        assert_eq!(notifier.request_permission().await, NotificationPermission::Default);
        assert!(matches!(rx.try_recv(), Ok(OutboundMessage::RequestNotificationPermission)));
        assert!(rx.try_recv().is_err());

        notifier.set_permission(NotificationPermission::Granted);
        assert_eq!(notifier.permission().await, NotificationPermission::Granted);
    }

    #[tokio::test]
    async fn test_show_fails_when_socket_gone() {
        let (tx, rx) = mpsc::channel(8);
        let notifier = SocketNotifier::new(Arc::new(ConnectionHandle::new(UserId::new(), tx)));
        drop(rx);
        let alert = DesktopAlert {
            title: "t".into(),
            body: "b".into(),
            icon: "i".into(),
            tag: "conversation-x".into(),
        };
        assert!(notifier.show(&alert).await.is_err());
    }
}
