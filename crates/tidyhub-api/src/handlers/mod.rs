//! HTTP and WebSocket handlers, grouped by resource.

pub mod conversation;
pub mod health;
pub mod message;
pub mod notification;
pub mod ws;
