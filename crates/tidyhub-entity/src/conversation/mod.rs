//! Conversation domain entities.

pub mod model;
pub mod summary;

pub use model::Conversation;
pub use summary::ConversationSummary;
