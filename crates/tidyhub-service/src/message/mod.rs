//! Message history, sending, and read state.

pub mod service;

pub use service::MessageService;
