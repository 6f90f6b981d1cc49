//! WebSocket upgrade handler.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::{info, warn};

use tidyhub_core::types::UserId;
use tidyhub_realtime::message::serializer::serialize_outbound;

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameter for WebSocket authentication.
#[derive(Debug, serde::Deserialize)]
pub struct WsQuery {
    /// JWT access token.
    pub token: String,
}

/// GET /ws?token={jwt}: WebSocket upgrade
pub async fn ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
) -> Result<Response, ApiError> {
    // Authenticate before upgrade
    let claims = state.jwt.verify(&query.token)?;
    let user_id = claims.user_id();

    Ok(ws.on_upgrade(move |socket| handle_ws_connection(state, user_id, socket)))
}

/// Handles an established WebSocket connection.
async fn handle_ws_connection(state: AppState, user_id: UserId, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (mut session, mut outbound_rx) = match state.realtime.connect(user_id).await {
        Ok(started) => started,
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Failed to start client session");
            let _ = ws_tx.send(Message::Close(None)).await;
            return;
        }
    };
    let conn_id = session.connection().id;
    info!(conn_id = %conn_id, user_id = %user_id, "WebSocket connection established");

    // Spawn outbound message forwarder
    let outbound_task = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let text = match serialize_outbound(&msg) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "Failed to serialize outbound frame");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let shutdown = state.realtime.shutdown_token();
    let closed = session.connection().closed();
    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = closed.cancelled() => break,
            next = ws_rx.next() => next,
        };
        match next {
            Some(Ok(Message::Text(text))) => session.handle_text(text.as_str()).await,
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Dropping the session releases every subscription and presence entry.
    drop(session);
    outbound_task.abort();

    info!(conn_id = %conn_id, user_id = %user_id, "WebSocket connection closed");
}
