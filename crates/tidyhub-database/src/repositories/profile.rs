//! Profile repository implementation (read-only).

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use tidyhub_core::result::AppResult;
use tidyhub_core::types::UserId;
use tidyhub_entity::profile::Profile;

use super::db_error;
use crate::store::ProfileStore;

/// Repository for the `profiles` table.
#[derive(Debug, Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    /// Create a new profile repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for ProfileRepository {
    async fn find(&self, user: UserId) -> AppResult<Option<Profile>> {
        sqlx::query_as::<_, Profile>(
            "SELECT user_id, full_name, business_name, avatar_url FROM profiles WHERE user_id = $1",
        )
        .bind(user)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load profile", e))
    }

    async fn find_many(&self, users: &[UserId]) -> AppResult<HashMap<UserId, Profile>> {
        if users.is_empty() {
            return Ok(HashMap::new());
        }
        let ids: Vec<Uuid> = users.iter().map(|id| id.into_uuid()).collect();

        let profiles = sqlx::query_as::<_, Profile>(
            "SELECT user_id, full_name, business_name, avatar_url FROM profiles WHERE user_id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load profiles", e))?;

        Ok(profiles.into_iter().map(|p| (p.user_id, p)).collect())
    }
}
