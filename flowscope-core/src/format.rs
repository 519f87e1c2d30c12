//! Formatting helpers for text listings.

use chrono::{DateTime, Duration, Utc};

/// Format a duration in human-readable form (e.g. "850ms", "3m 05s").
///
/// Negative durations are clamped to zero.
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.num_milliseconds().max(0);
    if millis < 1000 {
        return format!("{}ms", millis);
    }

    let secs = millis / 1000;
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        format!("{}h {}m", hours, mins)
    }
}

/// Format an optional duration, or "-" for a step that is still running.
pub fn format_duration_opt(duration: Option<Duration>) -> String {
    match duration {
        Some(d) => format_duration(d),
        None => "-".to_string(),
    }
}

/// Format a timestamp for listings, in UTC.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::milliseconds(850)), "850ms");
        assert_eq!(format_duration(Duration::seconds(12)), "12s");
        assert_eq!(format_duration(Duration::seconds(185)), "3m 05s");
        assert_eq!(format_duration(Duration::minutes(130)), "2h 10m");
        assert_eq!(format_duration(Duration::seconds(-5)), "0ms");
    }

    #[test]
    fn test_format_duration_opt() {
        assert_eq!(format_duration_opt(None), "-");
        assert_eq!(format_duration_opt(Some(Duration::seconds(1))), "1s");
    }

    #[test]
    fn test_format_timestamp() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 9, 5, 7).unwrap();
        assert_eq!(format_timestamp(ts), "2024-03-01 09:05:07");
    }
}
