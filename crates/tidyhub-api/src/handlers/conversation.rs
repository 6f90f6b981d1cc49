//! Conversation directory handlers.

use axum::Json;
use axum::extract::State;

use tidyhub_entity::conversation::{Conversation, ConversationSummary};

use crate::dto::request::CreateConversationRequest;
use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// GET /api/conversations
pub async fn list_conversations(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<ConversationSummary>>>, ApiError> {
    let list = state.services.directory.list(&auth).await?;
    Ok(Json(ApiResponse::ok(list)))
}

/// POST /api/conversations: returns the pair's conversation, creating it
/// on first contact.
pub async fn get_or_create_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateConversationRequest>,
) -> Result<Json<ApiResponse<Conversation>>, ApiError> {
    let conversation = state
        .services
        .directory
        .get_or_create(&auth, req.customer_id, req.provider_id)
        .await?;
    Ok(Json(ApiResponse::ok(conversation)))
}
