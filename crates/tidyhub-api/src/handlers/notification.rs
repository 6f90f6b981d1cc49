//! Notification handlers.

use axum::Json;
use axum::extract::{Path, Query, State};

use tidyhub_core::types::NotificationId;
use tidyhub_core::types::pagination::PageResponse;
use tidyhub_entity::notification::Notification;

use crate::dto::response::{ApiResponse, CountResponse, MarkedAllResponse, MarkedResponse};
use crate::error::ApiError;
use crate::extractors::{AuthUser, PaginationParams};
use crate::state::AppState;

/// GET /api/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PageResponse<Notification>>>, ApiError> {
    let notifications = &state.services.notifications;
    let page = notifications
        .list(&auth, &params.into_page_request(notifications))
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// GET /api/notifications/unread-count
pub async fn unread_count(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<CountResponse>>, ApiError> {
    let count = state.services.notifications.unread_count(&auth).await?;
    Ok(Json(ApiResponse::ok(CountResponse { count })))
}

/// PUT /api/notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<NotificationId>,
) -> Result<Json<ApiResponse<MarkedResponse>>, ApiError> {
    let updated = state.services.notifications.mark_read(&auth, id).await?;
    Ok(Json(ApiResponse::ok(MarkedResponse { updated })))
}

/// PUT /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<MarkedAllResponse>>, ApiError> {
    let marked = state.services.notifications.mark_all_read(&auth).await?;
    Ok(Json(ApiResponse::ok(MarkedAllResponse { marked })))
}
