#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ws::Message;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method, Request, Response, StatusCode};
use axum::Router;
use bathroom_core::alerts::AlertThresholds;
use bathroom_core::occupancy::{OccupancyStatus, OccupancyStore};
use http_body_util::BodyExt;
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use bathroom_api::config::ServerConfig;
use bathroom_api::extract::USER_ID_HEADER;
use bathroom_api::notifications::{Notifier, NotifyError, WsNotifier};
use bathroom_api::routes;
use bathroom_api::state::AppState;
use bathroom_api::ws::WsManager;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        monitor_interval_secs: 30,
        alerts: AlertThresholds::default(),
    }
}

/// Fresh state with a free store and the real WebSocket notifier.
pub fn test_state() -> AppState {
    let ws_manager = Arc::new(WsManager::new());
    AppState {
        config: Arc::new(test_config()),
        store: Arc::new(OccupancyStore::new()),
        notifier: Arc::new(WsNotifier::new(Arc::clone(&ws_manager))),
        ws_manager,
    }
}

/// Build the full application router with all middleware layers.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack (CORS, request ID, timeout, tracing,
/// panic recovery) that production uses.
pub fn build_test_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([Method::GET, Method::PUT])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(USER_ID_HEADER)])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// PUT `uri`, optionally as `user` and with a JSON `body`.
pub async fn put(
    app: Router,
    uri: &str,
    user: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(Method::PUT).uri(uri);
    if let Some(user) = user {
        builder = builder.header(USER_ID_HEADER, user);
    }
    let request = match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// WebSocket helpers
// ---------------------------------------------------------------------------

/// Register a fake connection that joined `group`.
pub async fn subscribe(ws_manager: &WsManager, conn_id: &str, group: &str) -> UnboundedReceiver<Message> {
    let rx = ws_manager.add(conn_id.to_string()).await;
    assert!(ws_manager.join(conn_id, group).await);
    rx
}

/// Drain every text frame queued on `rx` as parsed JSON envelopes.
pub fn drain_events(rx: &mut UnboundedReceiver<Message>) -> Vec<serde_json::Value> {
    let mut events = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        if let Message::Text(text) = msg {
            events.push(serde_json::from_str(text.as_str()).unwrap());
        }
    }
    events
}

// ---------------------------------------------------------------------------
// Test notifiers
// ---------------------------------------------------------------------------

/// A notification captured by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Status(OccupancyStatus),
    Group {
        group: String,
        event: String,
        payload: serde_json::Value,
    },
}

/// Notifier that records everything it is asked to deliver.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<Recorded>>,
}

impl RecordingNotifier {
    pub fn take(&self) -> Vec<Recorded> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn broadcast_status(&self, status: &OccupancyStatus) -> Result<usize, NotifyError> {
        self.events
            .lock()
            .unwrap()
            .push(Recorded::Status(status.clone()));
        Ok(1)
    }

    async fn notify_group(
        &self,
        group: &str,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<usize, NotifyError> {
        self.events.lock().unwrap().push(Recorded::Group {
            group: group.to_string(),
            event: event.to_string(),
            payload,
        });
        Ok(1)
    }
}

/// Notifier whose transport is always down. Counts attempts.
#[derive(Default)]
pub struct FailingNotifier {
    attempts: Mutex<usize>,
}

impl FailingNotifier {
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl Notifier for FailingNotifier {
    async fn broadcast_status(&self, _status: &OccupancyStatus) -> Result<usize, NotifyError> {
        *self.attempts.lock().unwrap() += 1;
        Err(NotifyError::Closed)
    }

    async fn notify_group(
        &self,
        _group: &str,
        _event: &str,
        _payload: serde_json::Value,
    ) -> Result<usize, NotifyError> {
        *self.attempts.lock().unwrap() += 1;
        Err(NotifyError::Closed)
    }
}
