//! Presence: per-topic member state, typing indicators, and online status.

pub mod channel;
pub mod controller;
pub mod hub;
pub mod online;
pub mod typing;

pub use channel::{PresenceChannel, PresenceEvent, PresenceEventKind};
pub use controller::{ConversationPresence, PresenceView};
pub use hub::{PresenceHub, PresenceMembership};
pub use online::{OnlineDirectory, OnlineHandle};
pub use typing::{TypingMachine, TypingState};
