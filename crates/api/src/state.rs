use std::sync::Arc;

use bathroom_core::occupancy::OccupancyStore;

use crate::config::ServerConfig;
use crate::notifications::Notifier;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// The single occupancy store, shared with the monitor loop.
    pub store: Arc<OccupancyStore>,
    /// WebSocket connection manager (browser clients).
    pub ws_manager: Arc<WsManager>,
    /// Outbound status broadcasts and per-user notifications.
    pub notifier: Arc<dyn Notifier>,
}
