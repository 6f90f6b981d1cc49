//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use tidyhub_core::types::{MessageId, UserId};

/// Body of `POST /api/conversations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConversationRequest {
    /// The customer side of the pair.
    pub customer_id: UserId,
    /// The provider side of the pair.
    pub provider_id: UserId,
}

/// Body of `POST /api/conversations/{id}/messages`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SendMessageRequest {
    /// Message text. Blank bodies are accepted and ignored; the length limit
    /// is `chat.max_body_chars`, enforced by the message service.
    pub body: String,
    /// Optional attachment reference.
    #[validate(url(message = "Attachment must be a URL"))]
    pub attachment_url: Option<String>,
}

/// Body of `POST /api/conversations/{id}/read`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MarkReadRequest {
    /// Messages to mark read.
    #[validate(length(max = 100, message = "At most 100 messages per request"))]
    pub message_ids: Vec<MessageId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::validate;

    #[test]
    fn test_send_message_rules() {
        let ok = SendMessageRequest {
            body: "hi".into(),
            attachment_url: Some("https://cdn.example.com/a.png".into()),
        };
        assert!(validate(&ok).is_ok());

        let bad_url = SendMessageRequest {
            body: "hi".into(),
            attachment_url: Some("not a url".into()),
        };
        assert!(validate(&bad_url).is_err());

        let long = SendMessageRequest {
            body: "x".repeat(20_000),
            attachment_url: None,
        };
        assert!(validate(&long).is_ok());
    }
}
