//! Live message streams of open conversations.

pub mod controller;
pub mod list;

pub use controller::{MessageStream, MessageStreamHandle, StreamUpdate};
pub use list::MessageList;
