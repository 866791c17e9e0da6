//! Periodic occupancy check.
//!
//! Every tick reads the store, works out how long the current occupant has
//! been inside, sends the next due reminder to their group and, once the
//! final mark is reached, frees the bathroom and tells everyone.

use std::sync::Arc;
use std::time::Duration;

use bathroom_core::alerts::{self, AlertThresholds, Escalation, ReminderTracker};
use bathroom_core::occupancy::OccupancyStore;
use bathroom_core::types::{Minutes, Timestamp};
use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::notifications::{reminder_payload, Notifier, NotifyError, EVENT_REMINDER};

/// Drives reminders and automatic release for the occupancy store.
///
/// Owns its [`ReminderTracker`]; nothing else reads or writes it.
pub struct OccupancyMonitor {
    store: Arc<OccupancyStore>,
    notifier: Arc<dyn Notifier>,
    thresholds: AlertThresholds,
    tracker: ReminderTracker,
}

impl OccupancyMonitor {
    pub fn new(
        store: Arc<OccupancyStore>,
        notifier: Arc<dyn Notifier>,
        thresholds: AlertThresholds,
    ) -> Self {
        Self {
            store,
            notifier,
            thresholds,
            tracker: ReminderTracker::new(),
        }
    }

    /// Highest reminder already sent for the current episode.
    pub fn last_notified(&self) -> Option<Minutes> {
        self.tracker.last_notified()
    }

    /// Run the monitor loop until `cancel` is triggered.
    ///
    /// A tick in progress always completes; cancellation is only observed
    /// between ticks.
    pub async fn run(mut self, period: Duration, cancel: CancellationToken) {
        tracing::info!(
            interval_secs = period.as_secs(),
            first = self.thresholds.first(),
            second = self.thresholds.second(),
            third = self.thresholds.third(),
            release = self.thresholds.release(),
            "Occupancy monitor started"
        );

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Occupancy monitor stopping");
                    break;
                }
                _ = interval.tick() => {
                    self.tick_at(Utc::now()).await;
                }
            }
        }
    }

    /// Evaluate the store at `now` and act on the result.
    ///
    /// Returns the escalation that was acted upon, if any.
    pub async fn tick_at(&mut self, now: Timestamp) -> Option<Escalation> {
        let status = self.store.status().await;
        let Some(episode) = status.episode() else {
            self.tracker.reset();
            return None;
        };

        let escalation = alerts::evaluate(&episode, now, &self.thresholds, &mut self.tracker)?;
        let payload = reminder_payload(&episode.occupant, &escalation);

        match escalation {
            Escalation::AutoRelease { after } => {
                let Some(released) = self.store.release_episode(&episode).await else {
                    tracing::debug!(
                        occupant = %episode.occupant,
                        "Episode ended before auto-release, skipping"
                    );
                    return None;
                };
                tracing::info!(occupant = %episode.occupant, after, "Bathroom auto-released");

                log_failure(
                    self.notifier.broadcast_status(&released).await,
                    "status broadcast after auto-release",
                );
                log_failure(
                    self.notifier
                        .notify_group(&episode.occupant, EVENT_REMINDER, payload)
                        .await,
                    "auto-release reminder",
                );
            }
            Escalation::Remind {
                threshold, urgency, ..
            } => {
                tracing::info!(
                    occupant = %episode.occupant,
                    threshold,
                    urgency = ?urgency,
                    "Sending occupancy reminder"
                );
                log_failure(
                    self.notifier
                        .notify_group(&episode.occupant, EVENT_REMINDER, payload)
                        .await,
                    "occupancy reminder",
                );
            }
        }

        Some(escalation)
    }
}

fn log_failure(result: Result<usize, NotifyError>, what: &str) {
    if let Err(e) = result {
        tracing::warn!(error = %e, what, "Notification delivery failed");
    }
}
