//! Handlers for the occupancy endpoints.
//!
//! Every successful mutation broadcasts the new status to all subscribers.
//! Every refusal is pushed as an `error` event to the caller's group (or
//! the `unknown` group) before the HTTP error is returned. Bodies are
//! extracted as `Result` so that a missing identifier is reported before a
//! malformed body, and body rejections take the same path.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use bathroom_core::occupancy::{Activity, OccupancyStatus};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::extract::CallerId;
use crate::notifications::{error_payload, EVENT_ERROR};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `PUT /bathroom/occupy`. The body itself is optional:
/// a request without a JSON content type occupies with [`Activity::None`].
#[derive(Debug, Default, Deserialize)]
pub struct OccupyRequest {
    #[serde(default)]
    pub activity: Activity,
}

/// Request body for `PUT /bathroom/activity`.
#[derive(Debug, Deserialize)]
pub struct ActivityRequest {
    pub activity: Activity,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /bathroom
pub async fn get_status(State(state): State<AppState>) -> Json<DataResponse<OccupancyStatus>> {
    Json(DataResponse {
        data: state.store.status().await,
    })
}

/// PUT /bathroom/occupy
pub async fn occupy(
    State(state): State<AppState>,
    caller: CallerId,
    body: Result<Option<Json<OccupyRequest>>, JsonRejection>,
) -> AppResult<Json<DataResponse<OccupancyStatus>>> {
    let user_id = match caller.require() {
        Ok(user_id) => user_id,
        Err(e) => return Err(refuse(&state, &caller, e.into()).await),
    };
    let request = match body {
        Ok(body) => body.map(|Json(request)| request).unwrap_or_default(),
        Err(rejection) => return Err(refuse(&state, &caller, rejection.into()).await),
    };

    let status = match state.store.claim(user_id, request.activity).await {
        Ok(status) => status,
        Err(e) => return Err(refuse(&state, &caller, e.into()).await),
    };
    tracing::info!(user_id, activity = ?request.activity, "Bathroom occupied");

    broadcast(&state, &status).await;
    Ok(Json(DataResponse { data: status }))
}

/// PUT /bathroom/free
pub async fn free(
    State(state): State<AppState>,
    caller: CallerId,
) -> AppResult<Json<DataResponse<OccupancyStatus>>> {
    let user_id = match caller.require() {
        Ok(user_id) => user_id,
        Err(e) => return Err(refuse(&state, &caller, e.into()).await),
    };

    let status = match state.store.release(user_id).await {
        Ok(status) => status,
        Err(e) => return Err(refuse(&state, &caller, e.into()).await),
    };
    tracing::info!(user_id, "Bathroom freed");

    broadcast(&state, &status).await;
    Ok(Json(DataResponse { data: status }))
}

/// PUT /bathroom/activity
pub async fn update_activity(
    State(state): State<AppState>,
    caller: CallerId,
    body: Result<Json<ActivityRequest>, JsonRejection>,
) -> AppResult<Json<DataResponse<OccupancyStatus>>> {
    let user_id = match caller.require() {
        Ok(user_id) => user_id,
        Err(e) => return Err(refuse(&state, &caller, e.into()).await),
    };
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return Err(refuse(&state, &caller, rejection.into()).await),
    };

    let status = match state.store.update_activity(user_id, request.activity).await {
        Ok(status) => status,
        Err(e) => return Err(refuse(&state, &caller, e.into()).await),
    };
    tracing::info!(user_id, activity = ?request.activity, "Bathroom activity updated");

    broadcast(&state, &status).await;
    Ok(Json(DataResponse { data: status }))
}

/// PUT /bathroom/force-free
///
/// Administrative override; no caller identifier is required.
pub async fn force_free(
    State(state): State<AppState>,
    caller: CallerId,
) -> AppResult<Json<DataResponse<OccupancyStatus>>> {
    let forced = state.store.force_release().await;
    tracing::info!(
        requested_by = caller.group(),
        previous_occupant = forced.previous_occupant.as_deref(),
        "Bathroom force-freed"
    );

    broadcast(&state, &forced.status).await;
    Ok(Json(DataResponse {
        data: forced.status,
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn broadcast(state: &AppState, status: &OccupancyStatus) {
    if let Err(e) = state.notifier.broadcast_status(status).await {
        tracing::warn!(error = %e, "Failed to broadcast status change");
    }
}

/// Push `err` to the caller's group, then hand it back for the HTTP response.
async fn refuse(state: &AppState, caller: &CallerId, err: AppError) -> AppError {
    let (_, code, message) = err.classify();
    tracing::info!(group = caller.group(), code, message = %message, "Request refused");

    if let Err(e) = state
        .notifier
        .notify_group(caller.group(), EVENT_ERROR, error_payload(code, &message))
        .await
    {
        tracing::warn!(error = %e, "Failed to deliver error notification");
    }
    err
}
