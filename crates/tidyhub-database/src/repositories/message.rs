//! Message repository implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use tidyhub_core::result::AppResult;
use tidyhub_core::types::{ConversationId, MessageId, UserId};
use tidyhub_entity::message::Message;

use super::db_error;
use crate::store::MessageStore;

/// Repository for the `messages` table.
#[derive(Debug, Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    /// Create a new message repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for MessageRepository {
    async fn recent(&self, conversation: ConversationId, limit: u64) -> AppResult<Vec<Message>> {
        sqlx::query_as::<_, Message>(
            "SELECT * FROM ( \
                SELECT * FROM messages WHERE conversation_id = $1 \
                ORDER BY created_at DESC, id DESC LIMIT $2 \
             ) recent ORDER BY created_at ASC, id ASC",
        )
        .bind(conversation)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load message history", e))
    }

    async fn insert(&self, message: &Message) -> AppResult<Message> {
        sqlx::query_as::<_, Message>(
            "INSERT INTO messages (id, conversation_id, sender_id, body, attachment_url, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(message.id)
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(&message.body)
        .bind(&message.attachment_url)
        .bind(message.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to insert message", e))
    }

    async fn mark_read(
        &self,
        conversation: ConversationId,
        ids: &[MessageId],
        reader: UserId,
        at: DateTime<Utc>,
    ) -> AppResult<Vec<Message>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = ids.iter().map(|id| id.into_uuid()).collect();

        sqlx::query_as::<_, Message>(
            "UPDATE messages SET read_at = $3 \
             WHERE id = ANY($1) AND sender_id <> $2 AND read_at IS NULL AND conversation_id = $4 \
             RETURNING *",
        )
        .bind(ids)
        .bind(reader)
        .bind(at)
        .bind(conversation)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to mark messages read", e))
    }

    async fn count_unread(&self, conversation: ConversationId, viewer: UserId) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages \
             WHERE conversation_id = $1 AND sender_id <> $2 AND read_at IS NULL",
        )
        .bind(conversation)
        .bind(viewer)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to count unread messages", e))?;
        Ok(count as u64)
    }

    async fn unread_counts(
        &self,
        conversations: &[ConversationId],
        viewer: UserId,
    ) -> AppResult<HashMap<ConversationId, u64>> {
        if conversations.is_empty() {
            return Ok(HashMap::new());
        }
        let ids: Vec<Uuid> = conversations.iter().map(|id| id.into_uuid()).collect();

        let rows: Vec<(Uuid, i64)> = sqlx::query_as(
            "SELECT conversation_id, COUNT(*) FROM messages \
             WHERE conversation_id = ANY($1) AND sender_id <> $2 AND read_at IS NULL \
             GROUP BY conversation_id",
        )
        .bind(ids)
        .bind(viewer)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to count unread messages", e))?;

        Ok(rows
            .into_iter()
            .map(|(id, count)| (ConversationId::from_uuid(id), count as u64))
            .collect())
    }
}
