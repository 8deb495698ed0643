//! Month and date helpers.
//!
//! Content is bucketed by `YYYY-MM` month strings; student and license
//! expiry are ISO dates compared against the current instant.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Split a `YYYY-MM` string into year and month (1-12).
pub fn parse_month(value: &str) -> Option<(u32, u32)> {
    let (year, month) = value.split_once('-')?;
    if year.len() != 4 || month.len() != 2 {
        return None;
    }
    if !year.bytes().chain(month.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: u32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    (1..=12).contains(&month).then_some((year, month))
}

/// Validate a month string, returning it unchanged.
pub fn validate_month(value: &str) -> Result<&str> {
    parse_month(value)
        .map(|_| value)
        .ok_or_else(|| Error::InvalidMonth {
            value: value.to_string(),
        })
}

/// Human label for a month: `"2024-03"` becomes `"Mar 2024"`.
pub fn format_month(value: &str) -> Option<String> {
    let (year, month) = parse_month(value)?;
    Some(format!("{} {}", MONTH_NAMES[(month - 1) as usize], year))
}

/// Parse an ISO date (`YYYY-MM-DD`, read as UTC midnight) or an RFC 3339 instant.
pub fn parse_date(value: &str) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&midnight));
        }
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| Error::InvalidDate {
            value: value.to_string(),
        })
}

/// True when `value` parses and lies strictly before `now`.
///
/// An unparsable date never counts as past.
pub fn is_past(value: &str, now: DateTime<Utc>) -> bool {
    parse_date(value).map(|at| at < now).unwrap_or(false)
}
