//! Live notification center of one user.

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use tidyhub_core::result::AppResult;
use tidyhub_core::types::NotificationId;
use tidyhub_core::types::pagination::{PageRequest, PageResponse};
use tidyhub_database::feed::{ChangeKind, FeedSubscription, RowFilter, Table};
use tidyhub_entity::notification::Notification;
use tidyhub_service::{ChatServices, NotificationService, RequestContext};

const CHANGE_BUFFER: usize = 64;

/// A notification of the user was created or changed.
#[derive(Debug, Clone)]
pub struct NotificationChange {
    pub notification: Notification,
    /// Unread count re-read after the change.
    pub unread_count: u64,
}

/// Opens notification centers.
pub struct NotificationCenter;

impl NotificationCenter {
    /// Subscribe to the caller's notifications.
    pub fn open(services: &ChatServices, ctx: RequestContext) -> NotificationCenterHandle {
        let subscription = services
            .feed
            .subscribe(Table::Notifications, RowFilter::Recipient(ctx.user_id));
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        let task = tokio::spawn(run(
            ctx,
            services.notifications.clone(),
            subscription,
            changes.clone(),
        ));
        NotificationCenterHandle {
            ctx,
            notifications: services.notifications.clone(),
            changes,
            task,
        }
    }
}

async fn run(
    ctx: RequestContext,
    notifications: NotificationService,
    mut subscription: FeedSubscription,
    changes: broadcast::Sender<NotificationChange>,
) {
    while let Some(event) = subscription.recv().await {
        if !matches!(event.kind, ChangeKind::Insert | ChangeKind::Update) {
            continue;
        }
        let Some(notification) = event.notification() else {
            continue;
        };
        match notifications.unread_count(&ctx).await {
            Ok(unread_count) => {
                let _ = changes.send(NotificationChange {
                    notification: notification.clone(),
                    unread_count,
                });
            }
            Err(e) => {
                warn!(user_id = %ctx.user_id, error = %e, "Failed to refresh unread notification count");
            }
        }
    }
    debug!(user_id = %ctx.user_id, "Notification center ended");
}

/// A user's live notification center. Dropping it releases the subscription.
#[derive(Debug)]
pub struct NotificationCenterHandle {
    ctx: RequestContext,
    notifications: NotificationService,
    changes: broadcast::Sender<NotificationChange>,
    task: JoinHandle<()>,
}

impl NotificationCenterHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<NotificationChange> {
        self.changes.subscribe()
    }

    pub async fn unread_count(&self) -> AppResult<u64> {
        self.notifications.unread_count(&self.ctx).await
    }

    pub async fn list(&self, page: &PageRequest) -> AppResult<PageResponse<Notification>> {
        self.notifications.list(&self.ctx, page).await
    }

    pub async fn mark_read(&self, id: NotificationId) -> AppResult<bool> {
        self.notifications.mark_read(&self.ctx, id).await
    }

    pub async fn mark_all_read(&self) -> AppResult<u64> {
        self.notifications.mark_all_read(&self.ctx).await
    }
}

impl Drop for NotificationCenterHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
