/// Caller identifier as presented by the client (`X-User-Id`).
pub type UserId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Whole minutes, used for alert thresholds and elapsed occupancy time.
pub type Minutes = u32;
