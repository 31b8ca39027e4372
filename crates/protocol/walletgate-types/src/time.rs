//! Timestamp helpers.

use chrono::{SecondsFormat, Utc};

/// Current time as an RFC 3339 string with millisecond precision
/// (e.g. `2024-05-01T12:00:00.000Z`), the format used on every envelope.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current Unix timestamp in seconds.
pub fn now_unix() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or_default()
}
