//! Message handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use tidyhub_core::types::ConversationId;
use tidyhub_entity::message::Message;

use crate::dto::request::{MarkReadRequest, SendMessageRequest};
use crate::dto::response::ApiResponse;
use crate::dto::validate;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// GET /api/conversations/{id}/messages
pub async fn history(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<ConversationId>,
) -> Result<Json<ApiResponse<Vec<Message>>>, ApiError> {
    let messages = state.services.messages.history(&auth, id).await?;
    Ok(Json(ApiResponse::ok(messages)))
}

/// POST /api/conversations/{id}/messages: `201` with the message, or `204`
/// when the body is blank.
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<ConversationId>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Response, ApiError> {
    validate(&req)?;
    let sent = state
        .services
        .messages
        .send(&auth, id, &req.body, req.attachment_url)
        .await?;

    Ok(match sent {
        Some(message) => (StatusCode::CREATED, Json(ApiResponse::ok(message))).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

/// POST /api/conversations/{id}/read: returns the messages that changed.
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<ConversationId>,
    Json(req): Json<MarkReadRequest>,
) -> Result<Json<ApiResponse<Vec<Message>>>, ApiError> {
    validate(&req)?;
    let changed = state
        .services
        .messages
        .mark_read(&auth, id, &req.message_ids)
        .await?;
    Ok(Json(ApiResponse::ok(changed)))
}
