//! The occupancy store: a single shared resource that one caller at a time
//! may hold.
//!
//! The store keeps its state as an [`Occupancy`] enum so that "occupied",
//! "occupant" and "occupied since" can never disagree, and hands out
//! [`OccupancyStatus`] snapshots in the flat shape clients consume. Every
//! operation runs its check and its mutation under the same lock, so two
//! concurrent claims can never both succeed.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::CoreError;
use crate::types::{Minutes, Timestamp, UserId};

// ---------------------------------------------------------------------------
// Status model
// ---------------------------------------------------------------------------

/// What the occupant says they are doing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activity {
    #[default]
    None,
    Peeing,
    Pooping,
}

/// Snapshot of the resource as seen by clients.
///
/// `occupied`, `occupied_by` and `occupied_since` are either all set or all
/// cleared; snapshots are only ever produced by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupancyStatus {
    pub occupied: bool,
    pub occupied_by: Option<UserId>,
    pub activity: Activity,
    pub occupied_since: Option<Timestamp>,
}

impl OccupancyStatus {
    /// The initial, unoccupied representation.
    pub fn free() -> Self {
        Self {
            occupied: false,
            occupied_by: None,
            activity: Activity::None,
            occupied_since: None,
        }
    }

    /// The episode this snapshot belongs to, if the resource is occupied.
    pub fn episode(&self) -> Option<Episode> {
        match (&self.occupied_by, self.occupied_since) {
            (Some(occupant), Some(since)) if self.occupied => Some(Episode {
                occupant: occupant.clone(),
                since,
            }),
            _ => None,
        }
    }
}

impl Default for OccupancyStatus {
    fn default() -> Self {
        Self::free()
    }
}

/// One continuous occupation: who claimed the resource and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    pub occupant: UserId,
    pub since: Timestamp,
}

impl Episode {
    /// Total whole minutes elapsed since the claim. Clock skew that would
    /// produce a negative duration counts as zero.
    pub fn elapsed_minutes(&self, now: Timestamp) -> Minutes {
        let minutes = now.signed_duration_since(self.since).num_minutes();
        Minutes::try_from(minutes.max(0)).unwrap_or(Minutes::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Occupancy {
    Free,
    Occupied { episode: Episode, activity: Activity },
}

impl Occupancy {
    fn snapshot(&self) -> OccupancyStatus {
        match self {
            Occupancy::Free => OccupancyStatus::free(),
            Occupancy::Occupied { episode, activity } => OccupancyStatus {
                occupied: true,
                occupied_by: Some(episode.occupant.clone()),
                activity: *activity,
                occupied_since: Some(episode.since),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a store operation was refused. A refused operation never mutates state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OccupancyError {
    #[error("The bathroom is already occupied")]
    AlreadyOccupied,

    #[error("The bathroom is already free")]
    AlreadyFree,

    #[error("The bathroom is not occupied")]
    NotOccupied,

    #[error("Only the person who occupied the bathroom can {action}")]
    NotOccupant { action: &'static str },
}

impl From<OccupancyError> for CoreError {
    fn from(err: OccupancyError) -> Self {
        match err {
            OccupancyError::NotOccupant { .. } => CoreError::Forbidden(err.to_string()),
            OccupancyError::AlreadyOccupied
            | OccupancyError::AlreadyFree
            | OccupancyError::NotOccupied => CoreError::Conflict(err.to_string()),
        }
    }
}

/// Outcome of [`OccupancyStore::force_release`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForcedRelease {
    /// Who held the resource right before the release, if anyone.
    pub previous_occupant: Option<UserId>,
    /// The status after the release (always free).
    pub status: OccupancyStatus,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Owner of the single occupancy state.
///
/// Designed to be wrapped in `Arc` and shared between request handlers and
/// the monitor loop.
#[derive(Debug)]
pub struct OccupancyStore {
    state: Mutex<Occupancy>,
}

impl OccupancyStore {
    /// Create a store in the free state.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Occupancy::Free),
        }
    }

    /// Current status snapshot.
    pub async fn status(&self) -> OccupancyStatus {
        self.state.lock().await.snapshot()
    }

    /// Claim the resource for `user_id` with the given initial activity.
    pub async fn claim(
        &self,
        user_id: &str,
        activity: Activity,
    ) -> Result<OccupancyStatus, OccupancyError> {
        self.claim_at(user_id, activity, Utc::now()).await
    }

    /// [`claim`](Self::claim) with an explicit claim instant.
    pub async fn claim_at(
        &self,
        user_id: &str,
        activity: Activity,
        now: Timestamp,
    ) -> Result<OccupancyStatus, OccupancyError> {
        let mut state = self.state.lock().await;
        if let Occupancy::Occupied { .. } = *state {
            return Err(OccupancyError::AlreadyOccupied);
        }
        *state = Occupancy::Occupied {
            episode: Episode {
                occupant: user_id.to_string(),
                since: now,
            },
            activity,
        };
        Ok(state.snapshot())
    }

    /// Release the resource. Only the current occupant may do this.
    pub async fn release(&self, user_id: &str) -> Result<OccupancyStatus, OccupancyError> {
        let mut state = self.state.lock().await;
        match &*state {
            Occupancy::Free => Err(OccupancyError::AlreadyFree),
            Occupancy::Occupied { episode, .. } if episode.occupant != user_id => {
                Err(OccupancyError::NotOccupant {
                    action: "release it",
                })
            }
            Occupancy::Occupied { .. } => {
                *state = Occupancy::Free;
                Ok(state.snapshot())
            }
        }
    }

    /// Change what the occupant is doing without touching the occupancy itself.
    pub async fn update_activity(
        &self,
        user_id: &str,
        activity: Activity,
    ) -> Result<OccupancyStatus, OccupancyError> {
        let mut state = self.state.lock().await;
        match &mut *state {
            Occupancy::Free => Err(OccupancyError::NotOccupied),
            Occupancy::Occupied { episode, .. } if episode.occupant != user_id => {
                Err(OccupancyError::NotOccupant {
                    action: "change the activity",
                })
            }
            Occupancy::Occupied {
                activity: current, ..
            } => {
                *current = activity;
                Ok(state.snapshot())
            }
        }
    }

    /// Free the resource regardless of who holds it. Always succeeds; on an
    /// already free resource this is a no-op.
    pub async fn force_release(&self) -> ForcedRelease {
        let mut state = self.state.lock().await;
        let previous = std::mem::replace(&mut *state, Occupancy::Free);
        let previous_occupant = match previous {
            Occupancy::Free => None,
            Occupancy::Occupied { episode, .. } => Some(episode.occupant),
        };
        ForcedRelease {
            previous_occupant,
            status: state.snapshot(),
        }
    }

    /// Free the resource only if `episode` is still the active one.
    ///
    /// Returns the new status when the release happened, `None` when the
    /// resource was already freed or claimed again in the meantime.
    pub async fn release_episode(&self, episode: &Episode) -> Option<OccupancyStatus> {
        let mut state = self.state.lock().await;
        match &*state {
            Occupancy::Occupied { episode: active, .. } if active == episode => {
                *state = Occupancy::Free;
                Some(state.snapshot())
            }
            _ => None,
        }
    }
}

impl Default for OccupancyStore {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone};

    use super::*;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn assert_consistent(status: &OccupancyStatus) {
        assert_eq!(status.occupied, status.occupied_by.is_some());
        assert_eq!(status.occupied, status.occupied_since.is_some());
    }

    #[tokio::test]
    async fn starts_free() {
        let store = OccupancyStore::new();
        assert_eq!(store.status().await, OccupancyStatus::free());
    }

    #[tokio::test]
    async fn claim_sets_occupant_and_since() {
        let store = OccupancyStore::new();
        let status = store.claim_at("alice", Activity::Peeing, t0()).await.unwrap();

        assert!(status.occupied);
        assert_eq!(status.occupied_by.as_deref(), Some("alice"));
        assert_eq!(status.activity, Activity::Peeing);
        assert_eq!(status.occupied_since, Some(t0()));
        assert_eq!(store.status().await, status);
    }

    #[tokio::test]
    async fn claim_fails_when_occupied() {
        let store = OccupancyStore::new();
        store.claim_at("alice", Activity::None, t0()).await.unwrap();

        let err = store.claim("bob", Activity::None).await.unwrap_err();
        assert_eq!(err, OccupancyError::AlreadyOccupied);
        assert_eq!(store.status().await.occupied_by.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn release_by_occupant_round_trips_to_free() {
        let store = OccupancyStore::new();
        store.claim("alice", Activity::Pooping).await.unwrap();

        let status = store.release("alice").await.unwrap();
        assert_eq!(status, OccupancyStatus::free());
        assert_eq!(store.status().await, OccupancyStatus::free());
    }

    #[tokio::test]
    async fn release_by_someone_else_is_forbidden_and_keeps_state() {
        let store = OccupancyStore::new();
        let before = store.claim_at("alice", Activity::None, t0()).await.unwrap();

        let err = store.release("bob").await.unwrap_err();
        assert_matches!(err, OccupancyError::NotOccupant { .. });
        assert_eq!(store.status().await, before);
    }

    #[tokio::test]
    async fn release_when_free_is_a_conflict() {
        let store = OccupancyStore::new();
        assert_eq!(
            store.release("alice").await.unwrap_err(),
            OccupancyError::AlreadyFree
        );
    }

    #[tokio::test]
    async fn update_activity_touches_only_activity() {
        let store = OccupancyStore::new();
        let before = store.claim_at("alice", Activity::None, t0()).await.unwrap();

        let after = store
            .update_activity("alice", Activity::Pooping)
            .await
            .unwrap();
        assert_eq!(after.activity, Activity::Pooping);
        assert_eq!(after.occupied, before.occupied);
        assert_eq!(after.occupied_by, before.occupied_by);
        assert_eq!(after.occupied_since, before.occupied_since);
    }

    #[tokio::test]
    async fn update_activity_rejections() {
        let store = OccupancyStore::new();
        assert_eq!(
            store
                .update_activity("alice", Activity::Peeing)
                .await
                .unwrap_err(),
            OccupancyError::NotOccupied
        );

        store.claim("alice", Activity::None).await.unwrap();
        assert_matches!(
            store.update_activity("bob", Activity::Peeing).await,
            Err(OccupancyError::NotOccupant { .. })
        );
        assert_eq!(store.status().await.activity, Activity::None);
    }

    #[tokio::test]
    async fn force_release_reports_previous_occupant() {
        let store = OccupancyStore::new();
        store.claim("alice", Activity::Peeing).await.unwrap();

        let forced = store.force_release().await;
        assert_eq!(forced.previous_occupant.as_deref(), Some("alice"));
        assert_eq!(forced.status, OccupancyStatus::free());

        let again = store.force_release().await;
        assert_eq!(again.previous_occupant, None);
        assert_eq!(again.status, OccupancyStatus::free());
    }

    #[tokio::test]
    async fn release_episode_ignores_a_newer_episode() {
        let store = OccupancyStore::new();
        let first = store.claim_at("alice", Activity::None, t0()).await.unwrap();
        let stale = first.episode().unwrap();

        store.release("alice").await.unwrap();
        store
            .claim_at("bob", Activity::None, t0() + Duration::minutes(1))
            .await
            .unwrap();

        assert_eq!(store.release_episode(&stale).await, None);
        assert_eq!(store.status().await.occupied_by.as_deref(), Some("bob"));

        let current = store.status().await.episode().unwrap();
        assert_eq!(
            store.release_episode(&current).await,
            Some(OccupancyStatus::free())
        );
    }

    #[tokio::test]
    async fn exactly_one_concurrent_claim_wins() {
        let store = Arc::new(OccupancyStore::new());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.claim(&format!("user-{i}"), Activity::None).await })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_consistent(&store.status().await);
    }

    #[tokio::test]
    async fn invariant_holds_across_mixed_operations() {
        let store = OccupancyStore::new();
        let users = ["alice", "bob"];

        for step in 0..40usize {
            let user = users[step % 2];
            let status = match step % 5 {
                0 => store.claim(user, Activity::None).await.ok(),
                1 => store.update_activity(user, Activity::Peeing).await.ok(),
                2 => store.release(user).await.ok(),
                3 => Some(store.force_release().await.status),
                _ => Some(store.status().await),
            };
            if let Some(status) = status {
                assert_consistent(&status);
            }
            assert_consistent(&store.status().await);
        }
    }

    #[test]
    fn elapsed_minutes_counts_total_minutes() {
        let episode = Episode {
            occupant: "alice".into(),
            since: t0(),
        };
        assert_eq!(episode.elapsed_minutes(t0() + Duration::seconds(59)), 0);
        assert_eq!(episode.elapsed_minutes(t0() + Duration::minutes(10)), 10);
        assert_eq!(episode.elapsed_minutes(t0() + Duration::minutes(75)), 75);
        assert_eq!(episode.elapsed_minutes(t0() - Duration::minutes(3)), 0);
    }

    #[test]
    fn status_serializes_in_camel_case() {
        let json = serde_json::to_value(OccupancyStatus::free()).unwrap();
        assert_eq!(json["occupied"], false);
        assert!(json["occupiedBy"].is_null());
        assert_eq!(json["activity"], "none");
        assert!(json["occupiedSince"].is_null());
    }

    #[test]
    fn occupancy_errors_map_to_core_errors() {
        assert_matches!(
            CoreError::from(OccupancyError::AlreadyOccupied),
            CoreError::Conflict(_)
        );
        assert_matches!(
            CoreError::from(OccupancyError::NotOccupant { action: "release it" }),
            CoreError::Forbidden(msg) if msg.contains("release it")
        );
    }
}
