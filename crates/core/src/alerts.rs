//! Escalating occupancy reminders.
//!
//! Pure logic, no I/O. The monitor loop reads the store, passes the active
//! [`Episode`] in together with the current time, and acts on the returned
//! [`Escalation`]. The [`ReminderTracker`] is owned by the caller and
//! carried across ticks.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::occupancy::Episode;
use crate::types::{Minutes, Timestamp};

pub const DEFAULT_FIRST_ALERT: Minutes = 10;
pub const DEFAULT_SECOND_ALERT: Minutes = 20;
pub const DEFAULT_THIRD_ALERT: Minutes = 25;
pub const DEFAULT_RELEASE_ALERT: Minutes = 30;

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Minute marks at which the occupant is reminded, and the mark at which the
/// resource is released automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertThresholds {
    first: Minutes,
    second: Minutes,
    third: Minutes,
    release: Minutes,
}

impl AlertThresholds {
    /// Build a threshold set. All marks must be positive and strictly
    /// increasing.
    pub fn new(
        first: Minutes,
        second: Minutes,
        third: Minutes,
        release: Minutes,
    ) -> Result<Self, CoreError> {
        if first == 0 {
            return Err(CoreError::Validation(
                "first alert must be at least 1 minute".to_string(),
            ));
        }
        if !(first < second && second < third && third < release) {
            return Err(CoreError::Validation(format!(
                "alert thresholds must be strictly increasing, got {first}/{second}/{third}/{release}"
            )));
        }
        Ok(Self {
            first,
            second,
            third,
            release,
        })
    }

    /// Build a threshold set from raw configured values, substituting the
    /// default for every value that is absent or not positive.
    pub fn from_configured(
        first: Option<i64>,
        second: Option<i64>,
        third: Option<i64>,
        release: Option<i64>,
    ) -> Result<Self, CoreError> {
        Self::new(
            positive_or(first, DEFAULT_FIRST_ALERT),
            positive_or(second, DEFAULT_SECOND_ALERT),
            positive_or(third, DEFAULT_THIRD_ALERT),
            positive_or(release, DEFAULT_RELEASE_ALERT),
        )
    }

    pub fn first(&self) -> Minutes {
        self.first
    }

    pub fn second(&self) -> Minutes {
        self.second
    }

    pub fn third(&self) -> Minutes {
        self.third
    }

    pub fn release(&self) -> Minutes {
        self.release
    }

    /// Reminder marks from the highest to the lowest, with their urgency.
    fn reminders_descending(&self) -> [(Minutes, Urgency); 3] {
        [
            (self.third, Urgency::VeryStrong),
            (self.second, Urgency::Strong),
            (self.first, Urgency::Normal),
        ]
    }
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            first: DEFAULT_FIRST_ALERT,
            second: DEFAULT_SECOND_ALERT,
            third: DEFAULT_THIRD_ALERT,
            release: DEFAULT_RELEASE_ALERT,
        }
    }
}

fn positive_or(value: Option<i64>, default: Minutes) -> Minutes {
    value
        .filter(|v| *v > 0)
        .and_then(|v| Minutes::try_from(v).ok())
        .unwrap_or(default)
}

// ---------------------------------------------------------------------------
// Escalation
// ---------------------------------------------------------------------------

/// How insistently the client should signal a reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Urgency {
    Normal,
    Strong,
    VeryStrong,
}

/// What the monitor has to do for the current tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Escalation {
    /// Send one reminder for a newly crossed threshold.
    Remind {
        threshold: Minutes,
        urgency: Urgency,
        /// Minutes until automatic release; only set for the last reminder.
        minutes_left: Option<Minutes>,
    },
    /// The final mark was reached: release the resource.
    AutoRelease { after: Minutes },
}

impl Escalation {
    pub fn urgency(&self) -> Urgency {
        match self {
            Escalation::Remind { urgency, .. } => *urgency,
            Escalation::AutoRelease { .. } => Urgency::VeryStrong,
        }
    }

    /// The minute mark this escalation belongs to.
    pub fn threshold(&self) -> Minutes {
        match self {
            Escalation::Remind { threshold, .. } => *threshold,
            Escalation::AutoRelease { after } => *after,
        }
    }

    /// Human readable text for the occupant.
    pub fn message(&self) -> String {
        match self {
            Escalation::Remind {
                threshold,
                minutes_left: Some(left),
                ..
            } => format!(
                "You have been in the bathroom for {threshold} minutes. \
                 It will be released automatically in {left} minutes."
            ),
            Escalation::Remind { threshold, .. } => {
                format!("You have been in the bathroom for {threshold} minutes.")
            }
            Escalation::AutoRelease { after } => {
                format!("The bathroom was released automatically after {after} minutes.")
            }
        }
    }
}

/// Remembers the highest reminder already sent, per occupancy episode.
///
/// Switching to a different episode (or observing the resource free) clears
/// the record, so thresholds are announced again for the next occupant.
#[derive(Debug, Default)]
pub struct ReminderTracker {
    episode: Option<Episode>,
    last_notified: Option<Minutes>,
}

impl ReminderTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest threshold announced for the tracked episode.
    pub fn last_notified(&self) -> Option<Minutes> {
        self.last_notified
    }

    /// Forget the tracked episode.
    pub fn reset(&mut self) {
        self.episode = None;
        self.last_notified = None;
    }

    fn follow(&mut self, episode: &Episode) {
        if self.episode.as_ref() != Some(episode) {
            self.episode = Some(episode.clone());
            self.last_notified = None;
        }
    }
}

/// Decide what to do for `episode` at `now`.
///
/// Reaching the release mark always wins and resets the tracker. Otherwise
/// at most one reminder is returned: the highest crossed threshold that is
/// above everything already announced for this episode.
pub fn evaluate(
    episode: &Episode,
    now: Timestamp,
    thresholds: &AlertThresholds,
    tracker: &mut ReminderTracker,
) -> Option<Escalation> {
    tracker.follow(episode);
    let elapsed = episode.elapsed_minutes(now);

    if elapsed >= thresholds.release {
        tracker.reset();
        return Some(Escalation::AutoRelease {
            after: thresholds.release,
        });
    }

    let (threshold, urgency) = thresholds
        .reminders_descending()
        .into_iter()
        .find(|(threshold, _)| elapsed >= *threshold)?;

    if tracker.last_notified.is_some_and(|last| last >= threshold) {
        return None;
    }
    tracker.last_notified = Some(threshold);

    let minutes_left = (threshold == thresholds.third)
        .then(|| thresholds.release - thresholds.third)
        .filter(|left| *left > 0);

    Some(Escalation::Remind {
        threshold,
        urgency,
        minutes_left,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
