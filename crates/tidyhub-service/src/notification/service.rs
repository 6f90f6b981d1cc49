//! Notification listing, read state, and creation.

use std::sync::Arc;

use tracing::{debug, info};

use tidyhub_core::result::AppResult;
use tidyhub_core::traits::Clock;
use tidyhub_core::types::pagination::{PageRequest, PageResponse};
use tidyhub_core::types::NotificationId;
use tidyhub_database::feed::{ChangeEvent, ChangeFeed, Row};
use tidyhub_database::store::NotificationStore;
use tidyhub_entity::notification::{NewNotification, Notification};

use crate::context::RequestContext;

/// Manages persisted user notifications.
#[derive(Debug, Clone)]
pub struct NotificationService {
    /// Notification store.
    store: Arc<dyn NotificationStore>,
    feed: ChangeFeed,
    clock: Arc<dyn Clock>,
    /// Page size used when the caller does not ask for one.
    default_page_size: u64,
}

impl NotificationService {
    /// Creates a new notification service.
    pub fn new(
        store: Arc<dyn NotificationStore>,
        feed: ChangeFeed,
        clock: Arc<dyn Clock>,
        default_page_size: u64,
    ) -> Self {
        Self {
            store,
            feed,
            clock,
            default_page_size,
        }
    }

    /// Build a page request, defaulting to the first page and the
    /// configured page size.
    pub fn page_request(&self, page: Option<u64>, per_page: Option<u64>) -> PageRequest {
        PageRequest::new(page.unwrap_or(1), per_page.unwrap_or(self.default_page_size))
    }

    /// Lists notifications for the current user, newest first.
    pub async fn list(
        &self,
        ctx: &RequestContext,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Notification>> {
        self.store.page(ctx.user_id, page).await
    }

    /// Gets the unread notification count.
    pub async fn unread_count(&self, ctx: &RequestContext) -> AppResult<u64> {
        self.store.count_unread(ctx.user_id).await
    }

    /// Marks one of the caller's notifications as read.
    ///
    /// Returns `false` when it was already read or is not the caller's.
    pub async fn mark_read(
        &self,
        ctx: &RequestContext,
        notification_id: NotificationId,
    ) -> AppResult<bool> {
        let changed = self
            .store
            .mark_read(notification_id, ctx.user_id, self.clock.now())
            .await?;
        match changed {
            Some(notification) => {
                self.publish_read(notification);
                Ok(true)
            }
            None => {
                debug!(
                    user_id = %ctx.user_id,
                    notification_id = %notification_id,
                    "Mark read was a no-op"
                );
                Ok(false)
            }
        }
    }

    /// Marks all notifications as read for the current user.
    pub async fn mark_all_read(&self, ctx: &RequestContext) -> AppResult<u64> {
        let changed = self.store.mark_all_read(ctx.user_id, self.clock.now()).await?;
        let count = changed.len() as u64;
        for notification in changed {
            self.publish_read(notification);
        }
        info!(user_id = %ctx.user_id, count, "Marked all notifications read");
        Ok(count)
    }

    /// Creates a new notification for a user.
    pub async fn create(&self, notification: NewNotification) -> AppResult<Notification> {
        let created = self
            .store
            .insert(&notification.into_notification(self.clock.now()))
            .await?;
        debug!(
            notification_id = %created.id,
            user_id = %created.user_id,
            kind = %created.kind,
            "Notification created"
        );
        self.feed
            .publish(ChangeEvent::insert(Row::Notification(created.clone())));
        Ok(created)
    }

    fn publish_read(&self, notification: Notification) {
        let old = Notification {
            is_read: false,
            read_at: None,
            ..notification.clone()
        };
        self.feed.publish(ChangeEvent::update(
            Some(Row::Notification(old)),
            Row::Notification(notification),
        ));
    }
}
