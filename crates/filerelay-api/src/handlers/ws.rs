//! WebSocket upgrade handler.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::{error, info, warn};

use filerelay_core::types::VerifiedIdentity;
use filerelay_realtime::connection::heartbeat::run_heartbeat;
use filerelay_realtime::message::serializer::serialize_outbound;

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for the WebSocket upgrade.
#[derive(Debug, serde::Deserialize)]
pub struct WsQuery {
    /// Connection token (required in `jwt` auth mode).
    pub token: Option<String>,
}

/// GET /ws?token={jwt}: WebSocket upgrade
pub async fn ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
) -> Result<Response, ApiError> {
    // Authenticate before upgrade
    let identity = state
        .authenticator
        .authenticate(query.token.as_deref())
        .await?;

    let max_message = state.config.realtime.max_message_bytes;
    Ok(ws
        .max_message_size(max_message)
        .on_upgrade(move |socket| handle_ws_connection(state, identity, socket)))
}

/// Handles an established WebSocket connection.
async fn handle_ws_connection(
    state: AppState,
    identity: Option<VerifiedIdentity>,
    socket: WebSocket,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let gateway = state.engine.gateway.clone();

    let (handle, mut outbound_rx) = gateway.register(identity);
    let conn_id = handle.id;

    // Spawn outbound message forwarder
    let outbound_task = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let text = match serialize_outbound(&msg) {
                Ok(text) => text,
                Err(e) => {
                    error!(error = %e, "Failed to serialize outbound message");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    let mut heartbeat = tokio::spawn(run_heartbeat(handle.clone(), gateway.heartbeat_config()));
    let mut shutdown = state.engine.shutdown_receiver();

    // Process inbound messages one at a time so relayed order is kept
    loop {
        tokio::select! {
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    gateway.handle_inbound(&conn_id, text.as_str()).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
            },
            _ = &mut heartbeat => {
                info!(conn_id = %conn_id, "Closing connection after missed pongs");
                break;
            }
            _ = shutdown.recv() => break,
        }
    }

    // Cleanup
    heartbeat.abort();
    gateway.unregister(&conn_id).await;
    drop(handle);
    outbound_task.abort();

    info!(conn_id = %conn_id, "WebSocket connection closed");
}
