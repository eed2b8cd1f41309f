//! ISO-8601 date recognition and parsing
//!
//! Date detection drives both schema inference (a string field whose samples
//! are all dates becomes a `Date` field) and query evaluation (date range
//! operators compare instants, not strings).

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use std::sync::LazyLock;

/// Recognized ISO-8601 family shapes:
/// - `YYYY-MM`, `YYYY-MM-DD`
/// - `YYYY-MM-DDTHH:MM`, with optional seconds, fraction and offset (`Z`, `+02:00`, `+0200`)
/// - the same with a space instead of `T`
static ISO_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\d{4}-\d{2}(-\d{2}([T ]\d{2}:\d{2}(:\d{2}(\.\d+)?)?(Z|[+-]\d{2}:?\d{2})?)?)?$",
    )
    .unwrap()
});

/// Returns true if the string is an ISO-8601 date that chrono can parse.
///
/// Pure numbers ("2024", "20240301") are never dates.
pub fn is_date_string(value: &str) -> bool {
    ISO_DATE_RE.is_match(value.trim()) && parse_date(value).is_some()
}

/// Parse an ISO-8601 family string into a UTC instant.
///
/// Values without an offset are interpreted as UTC; `YYYY-MM` is the first
/// day of that month.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if !ISO_DATE_RE.is_match(value) {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z", "%Y-%m-%dT%H:%M%z", "%Y-%m-%d %H:%M%z"] {
        if let Ok(dt) = DateTime::<FixedOffset>::parse_from_str(value, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|n| Utc.from_utc_datetime(&n));
    }

    NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| Utc.from_utc_datetime(&n))
}
