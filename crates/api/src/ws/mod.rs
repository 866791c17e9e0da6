//! WebSocket infrastructure for real-time occupancy updates.
//!
//! Provides connection and group management, heartbeat pings, and the HTTP
//! upgrade handler used by Axum routes.

mod handler;
mod heartbeat;
pub mod manager;

pub use handler::{ws_handler, ClientCommand};
pub use heartbeat::{start_heartbeat, HEARTBEAT_INTERVAL};
pub use manager::WsManager;
