//! PostgreSQL repository implementations of the store traits.

pub mod conversation;
pub mod message;
pub mod notification;
pub mod profile;

pub use conversation::ConversationRepository;
pub use message::MessageRepository;
pub use notification::NotificationRepository;
pub use profile::ProfileRepository;

use tidyhub_core::error::{AppError, ErrorKind};

/// Map a sqlx error, surfacing unique violations as conflicts.
pub(crate) fn db_error(context: &str, err: sqlx::Error) -> AppError {
    let unique = err
        .as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false);
    let kind = if unique {
        ErrorKind::Conflict
    } else {
        ErrorKind::Database
    };
    AppError::with_source(kind, format!("{context}: {err}"), err)
}
