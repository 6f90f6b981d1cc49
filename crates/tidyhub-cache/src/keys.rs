//! Cache key builders for all TidyHub cache entries.
//!
//! Centralising key construction prevents typos and makes it easy
//! to find every key the application uses.

use tidyhub_core::types::UserId;

/// Prefix applied to all TidyHub cache keys.
const PREFIX: &str = "tidyhub";

// ── Conversation keys ──────────────────────────────────────

/// Cache key for a user's enriched conversation list.
pub fn conversation_list(user_id: UserId) -> String {
    format!("{PREFIX}:conv:list:{user_id}")
}
