//! Presence topic naming.

pub mod types;

pub use types::Topic;
