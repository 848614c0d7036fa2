//! Timestamp decoding.
//!
//! Accepted shapes:
//! - RFC 3339 strings (`"2025-03-01T10:00:00Z"`)
//! - epoch milliseconds (`1740823200000`)
//! - `{ "seconds": .., "nanoseconds": .. }` maps, also with leading
//!   underscores as produced by JSON-serialized SDK timestamps

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::{Problem, shape_of};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Millis(i64),
    Parts {
        #[serde(alias = "_seconds")]
        seconds: i64,
        #[serde(default, alias = "_nanoseconds", alias = "nanos")]
        nanoseconds: u32,
    },
}

/// Decode a timestamp value.
///
/// # Errors
///
/// Returns a [`Problem`] for unrecognized shapes or out-of-range values.
pub fn decode(value: &Value) -> Result<DateTime<Utc>, Problem> {
    let raw = RawTimestamp::deserialize(value)
        .map_err(|_| Problem::UnexpectedShape(shape_of(value)))?;

    match raw {
        RawTimestamp::Text(text) => DateTime::parse_from_rfc3339(text.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| Problem::InvalidValue(text)),
        RawTimestamp::Millis(millis) => DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| Problem::InvalidValue(millis.to_string())),
        RawTimestamp::Parts {
            seconds,
            nanoseconds,
        } => DateTime::from_timestamp(seconds, nanoseconds)
            .ok_or_else(|| Problem::InvalidValue(format!("{seconds}s {nanoseconds}ns"))),
    }
}

/// Encode a timestamp the way this client writes it.
#[must_use]
pub fn encode(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
}
