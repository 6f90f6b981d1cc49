//! Profile entity model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tidyhub_core::types::UserId;

/// Display identity of a user. This service never writes profiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Profile {
    /// The user this profile belongs to.
    pub user_id: UserId,
    /// Personal name.
    pub full_name: Option<String>,
    /// Business name (providers).
    pub business_name: Option<String>,
    /// Avatar image URL.
    pub avatar_url: Option<String>,
}

impl Profile {
    /// Resolve the name shown to other users.
    ///
    /// Prefers a non-blank business name, then a non-blank full name.
    pub fn display_name(&self) -> Option<&str> {
        non_blank(self.business_name.as_deref()).or_else(|| non_blank(self.full_name.as_deref()))
    }

    /// Resolve the display name, falling back to `fallback`.
    pub fn display_name_or<'a>(profile: Option<&'a Profile>, fallback: &'a str) -> &'a str {
        profile.and_then(Profile::display_name).unwrap_or(fallback)
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}
