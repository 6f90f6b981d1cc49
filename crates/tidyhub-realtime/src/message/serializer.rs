//! JSON serialization for WebSocket messages.

use tidyhub_core::error::AppError;
use tidyhub_core::result::AppResult;

use super::types::{InboundMessage, OutboundMessage};

/// Serialize an outbound message to a text frame.
pub fn serialize_outbound(msg: &OutboundMessage) -> AppResult<String> {
    Ok(serde_json::to_string(msg)?)
}

/// Deserialize an inbound text frame.
pub fn deserialize_inbound(text: &str) -> AppResult<InboundMessage> {
    serde_json::from_str(text)
        .map_err(|e| AppError::validation(format!("Invalid message frame: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidyhub_core::error::ErrorKind;

    #[test]
    fn test_unknown_frame_is_validation_error() {
        let err = deserialize_inbound(r#"{"type":"subscribe","channel":"x"}"#).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn test_mark_all_roundtrip() {
        let msg = deserialize_inbound(r#"{"type":"mark_all_notifications_read"}"#).unwrap();
        assert!(matches!(msg, InboundMessage::MarkAllNotificationsRead));
        let out = serialize_outbound(&OutboundMessage::OnlineUsers { users: vec![] }).unwrap();
        assert_eq!(out, r#"{"type":"online_users","users":[]}"#);
    }
}
