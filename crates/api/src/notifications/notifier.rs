use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::Message;
use bathroom_core::occupancy::OccupancyStatus;
use serde_json::json;

use super::EVENT_STATUS_CHANGED;
use crate::ws::WsManager;

/// Why a notification could not be handed to the transport.
///
/// Never fatal: callers log it and carry on, the state change that
/// triggered the notification has already been committed.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Failed to encode '{event}' payload: {source}")]
    Serialization {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Notification transport is closed")]
    Closed,
}

/// Fan-out primitives required from the real-time transport.
///
/// Both methods return how many subscriber connections the event reached;
/// zero is not an error (nobody may be listening).
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver the full status to every subscriber as `status-changed`.
    async fn broadcast_status(&self, status: &OccupancyStatus) -> Result<usize, NotifyError>;

    /// Deliver `payload` as `event` to subscribers that joined `group`.
    async fn notify_group(
        &self,
        group: &str,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<usize, NotifyError>;
}

/// Encode an event as the `{"event": ..., "data": ...}` text frame clients expect.
pub fn encode_event(event: &str, data: serde_json::Value) -> Message {
    let envelope = json!({
        "event": event,
        "data": data,
    });
    Message::Text(envelope.to_string().into())
}

/// [`Notifier`] over the WebSocket connection manager.
pub struct WsNotifier {
    ws_manager: Arc<WsManager>,
}

impl WsNotifier {
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }
}

#[async_trait]
impl Notifier for WsNotifier {
    async fn broadcast_status(&self, status: &OccupancyStatus) -> Result<usize, NotifyError> {
        if self.ws_manager.is_closed() {
            return Err(NotifyError::Closed);
        }
        let data = serde_json::to_value(status).map_err(|source| NotifyError::Serialization {
            event: EVENT_STATUS_CHANGED.to_string(),
            source,
        })?;
        let delivered = self
            .ws_manager
            .broadcast(encode_event(EVENT_STATUS_CHANGED, data))
            .await;
        tracing::debug!(delivered, occupied = status.occupied, "Broadcast status");
        Ok(delivered)
    }

    async fn notify_group(
        &self,
        group: &str,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<usize, NotifyError> {
        if self.ws_manager.is_closed() {
            return Err(NotifyError::Closed);
        }
        let delivered = self
            .ws_manager
            .send_to_group(group, encode_event(event, payload))
            .await;
        tracing::debug!(group, event, delivered, "Notified group");
        Ok(delivered)
    }
}
