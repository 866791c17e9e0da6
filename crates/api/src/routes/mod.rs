pub mod bathroom;
pub mod health;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                          WebSocket (join/leave groups)
///
/// /bathroom                    current status (GET)
/// /bathroom/occupy             claim (PUT)
/// /bathroom/free               release (PUT)
/// /bathroom/activity           update activity (PUT)
/// /bathroom/force-free         administrative release (PUT)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/bathroom", bathroom::router())
}
