//! Conversation directory: one conversation per customer/provider pair.

pub mod directory;

pub use directory::{ConversationDirectory, UNKNOWN_USER};
