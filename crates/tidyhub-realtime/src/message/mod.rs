//! WebSocket message types and serialization.

pub mod serializer;
pub mod types;

pub use types::{InboundMessage, OutboundMessage};
