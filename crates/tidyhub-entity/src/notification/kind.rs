//! Notification kind enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What produced a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A new chat message.
    Message,
    /// Booking lifecycle events.
    Booking,
    /// Payment events.
    Payment,
    /// Job assignment and completion.
    Job,
    /// Anything else.
    General,
}

impl NotificationKind {
    /// Return the kind as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Booking => "booking",
            Self::Payment => "payment",
            Self::Job => "job",
            Self::General => "general",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = tidyhub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "message" => Ok(Self::Message),
            "booking" => Ok(Self::Booking),
            "payment" => Ok(Self::Payment),
            "job" => Ok(Self::Job),
            "general" => Ok(Self::General),
            _ => Err(tidyhub_core::AppError::validation(format!(
                "Invalid notification kind: '{s}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        assert_eq!("Booking".parse::<NotificationKind>().unwrap(), NotificationKind::Booking);
        assert_eq!(NotificationKind::Message.to_string(), "message");
        assert!("spam".parse::<NotificationKind>().is_err());
    }
}
