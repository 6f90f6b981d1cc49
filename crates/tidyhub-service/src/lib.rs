//! # tidyhub-service
//!
//! Business logic service layer for TidyHub chat. Each service orchestrates
//! the stores, the cache, and the change feed to implement one
//! application-level concern.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time and every service is cheap to clone.

pub mod context;
pub mod conversation;
pub mod message;
pub mod notification;
pub mod services;
pub mod text;

#[cfg(test)]
mod testing;

pub use context::RequestContext;
pub use conversation::ConversationDirectory;
pub use message::MessageService;
pub use notification::{NotificationRules, NotificationService};
pub use services::ChatServices;
