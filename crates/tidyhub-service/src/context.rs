//! Request context carrying the authenticated user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tidyhub_core::types::UserId;

/// Context for the current authenticated request or socket frame.
///
/// Built by the API layer after token verification and passed into service
/// methods so that every operation knows *who* is acting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RequestContext {
    /// The authenticated user's ID.
    pub user_id: UserId,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a new request context stamped with the current time.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            request_time: Utc::now(),
        }
    }
}
