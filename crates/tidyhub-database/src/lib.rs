//! # tidyhub-database
//!
//! Persistence for TidyHub chat: store traits, PostgreSQL repositories,
//! an in-memory store for tests and development, and the row-level
//! change feed that realtime subscribers listen to.

pub mod connection;
pub mod feed;
pub mod memory;
pub mod repositories;
pub mod store;
pub mod stores;

pub use connection::DatabasePool;
pub use feed::{ChangeEvent, ChangeFeed, ChangeKind, FeedSubscription, Row, RowFilter, Table};
pub use memory::MemoryStore;
pub use store::{ConversationStore, MessageStore, NotificationStore, ProfileStore};
pub use stores::Stores;
