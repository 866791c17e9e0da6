//! Outbound push notifications.
//!
//! [`Notifier`] is the fan-out boundary used by request handlers and the
//! occupancy monitor: status broadcasts go to every subscriber, reminders
//! and errors go to the group named after a user id. [`WsNotifier`] is the
//! WebSocket implementation backed by [`WsManager`](crate::ws::WsManager).

mod notifier;

use bathroom_core::alerts::Escalation;
use serde_json::json;

pub use notifier::{encode_event, Notifier, NotifyError, WsNotifier};

/// Full status snapshot, sent to everyone after every state change.
pub const EVENT_STATUS_CHANGED: &str = "status-changed";

/// Escalating occupancy reminder, sent to the occupant's group.
pub const EVENT_REMINDER: &str = "reminder";

/// A refused request, sent to the caller's group.
pub const EVENT_ERROR: &str = "error";

/// Group that receives errors for requests without a caller identifier.
pub const UNKNOWN_GROUP: &str = "unknown";

/// Payload of a [`EVENT_REMINDER`] notification.
pub fn reminder_payload(occupant: &str, escalation: &Escalation) -> serde_json::Value {
    json!({
        "message": escalation.message(),
        "thresholdMinutes": escalation.threshold(),
        "urgency": escalation.urgency(),
        "occupant": occupant,
    })
}

/// Payload of a [`EVENT_ERROR`] notification.
pub fn error_payload(code: &str, message: &str) -> serde_json::Value {
    json!({
        "message": message,
        "code": code,
    })
}
