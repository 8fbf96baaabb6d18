//! Wire format for timestamps.
//!
//! Timestamps are written as fixed-width UTC ISO-8601 strings with
//! nanosecond precision (`2024-03-01T09:30:00.000000000Z`). Fixed width means
//! lexical order equals chronological order, which range queries on
//! timestamp fields rely on.

use crate::{Error, Result};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Formats a timestamp in the fixed wire format.
#[must_use]
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parses a timestamp written by any RFC 3339 producer.
///
/// Offsets are normalized to UTC. Strings without an offset are read as UTC.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::InvalidTimestamp(format!("{text:?}: {e}")))
}
