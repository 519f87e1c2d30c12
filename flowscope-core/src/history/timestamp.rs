//! Timestamp parsing for engine history payloads.
//!
//! Engines disagree on timestamp encoding. Accepted forms:
//! - RFC 3339 (`2024-03-01T10:00:00.123Z`, `2024-03-01T10:00:00+01:00`)
//! - Offset without colon (`2024-03-01T10:00:00.123+0000`)
//! - Naive ISO date-time, read as UTC (`2024-03-01T10:00:00`)
//! - Integer epoch milliseconds

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a JSON timestamp value. Returns `None` for null or unparseable input.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp_str(s),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

/// Parse a timestamp string in any of the accepted forms.
pub fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(s, format) {
            return Some(ts.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
            return Some(ts.and_utc());
        }
    }

    if let Ok(millis) = s.parse::<i64>() {
        return Utc.timestamp_millis_opt(millis).single();
    }

    None
}
