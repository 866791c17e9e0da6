use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::notifications::{encode_event, EVENT_STATUS_CHANGED};
use crate::state::AppState;

/// Inbound control frames a client may send.
///
/// ```text
/// {"action": "join",  "group": "alice"}
/// {"action": "leave", "group": "alice"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ClientCommand {
    Join { group: String },
    Leave { group: String },
}

/// HTTP handler that upgrades the connection to WebSocket.
///
/// After the upgrade the connection is registered with `WsManager` and
/// managed by two tasks (sender + receiver).
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Manage a single WebSocket connection after upgrade.
///
/// 1. Registers the connection and pushes the current status to it.
/// 2. Spawns a sender task that forwards messages from the manager channel.
/// 3. Processes join/leave commands on the current task.
/// 4. Cleans up on disconnect.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    let ws_manager = state.ws_manager;
    let mut rx = ws_manager.add(conn_id.clone()).await;

    match serde_json::to_value(state.store.status().await) {
        Ok(status) => {
            ws_manager
                .send_to(&conn_id, encode_event(EVENT_STATUS_CHANGED, status))
                .await;
        }
        Err(e) => tracing::warn!(conn_id = %conn_id, error = %e, "Failed to encode initial status"),
    }

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientCommand>(text.as_str()) {
                Ok(ClientCommand::Join { group }) => {
                    ws_manager.join(&conn_id, &group).await;
                    tracing::info!(conn_id = %conn_id, group = %group, "Connection joined group");
                }
                Ok(ClientCommand::Leave { group }) => {
                    ws_manager.leave(&conn_id, &group).await;
                    tracing::info!(conn_id = %conn_id, group = %group, "Connection left group");
                }
                Err(e) => {
                    tracing::debug!(conn_id = %conn_id, error = %e, "Ignoring malformed client frame");
                }
            },
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    let connected_secs = ws_manager
        .remove(&conn_id)
        .await
        .map(|conn| (Utc::now() - conn.connected_at).num_seconds());
    send_task.abort();
    tracing::info!(conn_id = %conn_id, connected_secs, "WebSocket disconnected");
}
