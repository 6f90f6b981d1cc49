//! Conversation repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use tidyhub_core::error::AppError;
use tidyhub_core::result::AppResult;
use tidyhub_core::types::{ConversationId, UserId};
use tidyhub_entity::conversation::Conversation;

use super::db_error;
use crate::store::ConversationStore;

/// Repository for the `conversations` table.
#[derive(Debug, Clone)]
pub struct ConversationRepository {
    pool: PgPool,
}

impl ConversationRepository {
    /// Create a new conversation repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationStore for ConversationRepository {
    async fn find_by_pair(&self, a: UserId, b: UserId) -> AppResult<Option<Conversation>> {
        sqlx::query_as::<_, Conversation>(
            "SELECT * FROM conversations \
             WHERE LEAST(customer_id, provider_id) = LEAST($1::uuid, $2::uuid) \
               AND GREATEST(customer_id, provider_id) = GREATEST($1::uuid, $2::uuid)",
        )
        .bind(a)
        .bind(b)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find conversation by pair", e))
    }

    async fn find_by_id(&self, id: ConversationId) -> AppResult<Option<Conversation>> {
        sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find conversation", e))
    }

    async fn insert(&self, conversation: &Conversation) -> AppResult<Conversation> {
        let inserted = sqlx::query_as::<_, Conversation>(
            "INSERT INTO conversations (id, customer_id, provider_id, created_at) \
             VALUES ($1, $2, $3, $4) ON CONFLICT DO NOTHING RETURNING *",
        )
        .bind(conversation.id)
        .bind(conversation.customer_id)
        .bind(conversation.provider_id)
        .bind(conversation.created_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create conversation", e))?;

        inserted.ok_or_else(|| {
            AppError::conflict(format!(
                "Conversation between {} and {} already exists",
                conversation.customer_id, conversation.provider_id
            ))
        })
    }

    async fn list_for_user(&self, user: UserId) -> AppResult<Vec<Conversation>> {
        sqlx::query_as::<_, Conversation>(
            "SELECT * FROM conversations WHERE customer_id = $1 OR provider_id = $1 \
             ORDER BY last_message_at DESC NULLS LAST, created_at DESC",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list conversations", e))
    }

    async fn touch_last_message(
        &self,
        id: ConversationId,
        at: DateTime<Utc>,
        preview: &str,
    ) -> AppResult<Option<Conversation>> {
        sqlx::query_as::<_, Conversation>(
            "UPDATE conversations SET last_message_at = $2, last_message_preview = $3 \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(at)
        .bind(preview)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update conversation preview", e))
    }
}
