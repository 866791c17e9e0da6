//! Domain logic for the bathroom occupancy tracker.
//!
//! Everything in this crate is transport-agnostic: the occupancy store,
//! the alert thresholds and the escalation rules that the monitor loop in
//! `bathroom-api` drives. Nothing here knows about HTTP or WebSockets.

pub mod alerts;
pub mod error;
pub mod occupancy;
pub mod types;
