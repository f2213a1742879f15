//! Date strings to Unix seconds and back.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

/// Parse a date string into Unix seconds.
///
/// Offsets are honoured when present; naive values are read as UTC.
#[must_use]
pub fn parse_timestamp(input: &str) -> Option<i64> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.timestamp());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc().timestamp());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return midnight(d);
        }
    }
    parse_partial(s)
}

/// `YYYY-MM` and `YYYY`.
fn parse_partial(s: &str) -> Option<i64> {
    let mut parts = s.splitn(2, '-');
    let year = parts.next()?;
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    let month = match parts.next() {
        Some(m) if m.len() == 2 => m.parse().ok()?,
        Some(_) => return None,
        None => 1,
    };
    midnight(NaiveDate::from_ymd_opt(year, month, 1)?)
}

fn midnight(date: NaiveDate) -> Option<i64> {
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp())
}

/// Unix seconds for `input`, or the current time if it cannot be parsed.
#[must_use]
pub fn to_unix_timestamp(input: &str) -> i64 {
    parse_timestamp(input).unwrap_or_else(|| {
        let now = Utc::now().timestamp();
        tracing::warn!(input, fallback = now, "invalid date format, using current time");
        now
    })
}

/// Render stored Unix seconds as RFC 3339.
#[must_use]
pub fn format_timestamp(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0).map_or_else(|| secs.to_string(), |dt| dt.to_rfc3339())
}
