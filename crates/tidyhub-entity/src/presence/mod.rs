//! Presence domain value objects.

pub mod model;

pub use model::{PresenceMeta, PresenceSnapshot};
