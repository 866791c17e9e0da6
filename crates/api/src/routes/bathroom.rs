//! Route definitions for the occupancy endpoints.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::bathroom;
use crate::state::AppState;

/// Routes mounted at `/bathroom`.
///
/// Mutating routes identify the caller through the `X-User-Id` header,
/// except `force-free`.
///
/// ```text
/// GET  /                -> get_status
/// PUT  /occupy          -> occupy
/// PUT  /free            -> free
/// PUT  /activity        -> update_activity
/// PUT  /force-free      -> force_free
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(bathroom::get_status))
        .route("/occupy", put(bathroom::occupy))
        .route("/free", put(bathroom::free))
        .route("/activity", put(bathroom::update_activity))
        .route("/force-free", put(bathroom::force_free))
}
