//! Notification repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use tidyhub_core::error::AppError;
use tidyhub_core::result::AppResult;
use tidyhub_core::types::pagination::{PageRequest, PageResponse};
use tidyhub_core::types::{NotificationId, UserId};
use tidyhub_entity::notification::Notification;

use super::db_error;
use crate::store::NotificationStore;

/// Repository for the `notifications` table.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    /// Create a new notification repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for NotificationRepository {
    async fn page(&self, user: UserId, page: &PageRequest) -> AppResult<PageResponse<Notification>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1")
            .bind(user)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to count notifications", e))?;

        let (limit, offset) = sql_window(page)?;
        let items = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
        )
        .bind(user)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list notifications", e))?;

        Ok(PageResponse::new(items, page, total as u64))
    }

    async fn count_unread(&self, user: UserId) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to count unread notifications", e))?;
        Ok(count as u64)
    }

    async fn insert(&self, notification: &Notification) -> AppResult<Notification> {
        sqlx::query_as::<_, Notification>(
            "INSERT INTO notifications (id, user_id, kind, title, body, link, payload, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(notification.id)
        .bind(notification.user_id)
        .bind(notification.kind)
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(&notification.link)
        .bind(&notification.payload)
        .bind(notification.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create notification", e))
    }

    async fn mark_read(
        &self,
        id: NotificationId,
        user: UserId,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Notification>> {
        sqlx::query_as::<_, Notification>(
            "UPDATE notifications SET is_read = TRUE, read_at = $3 \
             WHERE id = $1 AND user_id = $2 AND is_read = FALSE RETURNING *",
        )
        .bind(id)
        .bind(user)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to mark notification read", e))
    }

    async fn mark_all_read(&self, user: UserId, at: DateTime<Utc>) -> AppResult<Vec<Notification>> {
        sqlx::query_as::<_, Notification>(
            "UPDATE notifications SET is_read = TRUE, read_at = $2 \
             WHERE user_id = $1 AND is_read = FALSE RETURNING *",
        )
        .bind(user)
        .bind(at)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to mark all notifications read", e))
    }
}

/// `LIMIT` / `OFFSET` for a page, rejecting values PostgreSQL cannot bind.
fn sql_window(page: &PageRequest) -> AppResult<(i64, i64)> {
    let out_of_range = |_| AppError::validation("Page is out of range");
    Ok((
        i64::try_from(page.limit()).map_err(out_of_range)?,
        i64::try_from(page.offset()).map_err(out_of_range)?,
    ))
}
