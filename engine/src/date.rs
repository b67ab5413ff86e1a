//! Day-granularity dates and inclusive date ranges.
//!
//! Farm data has no time component, so everything is parsed at the boundary
//! into a [`NaiveDate`] taken in UTC. Timestamps carrying an offset are
//! converted to UTC before the time part is dropped; timestamps without one
//! are read as UTC. Nothing downstream ever sees a local-timezone date.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Parse a date-like string into a UTC calendar day.
///
/// Accepted shapes, tried in order:
/// - `YYYY-MM-DD`
/// - RFC 3339 (`2024-03-01T23:30:00-05:00` is day `2024-03-02`)
/// - `YYYY-MM-DDTHH:MM:SS[.fff]` or with a space separator, read as UTC
///
/// Returns `None` for anything else, including empty strings.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(day);
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc).date_naive());
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|ts| ts.date())
}

/// Parse an optional date-like string; absent and malformed both yield `None`.
pub fn parse_optional_day(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(parse_day)
}

/// An inclusive range of days, `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// First occupied day
    pub start: NaiveDate,
    /// Last occupied day (inclusive)
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range, clamping `end` up to `start` when the input is inverted.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// A zero-width range covering a single day.
    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    /// Whether two ranges share at least one day. Touching endpoints overlap.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// The shared days of two ranges, if any.
    pub fn intersection(&self, other: &DateRange) -> Option<DateRange> {
        if !self.overlaps(other) {
            return None;
        }
        Some(DateRange {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        })
    }

    /// Whether `day` falls inside the range.
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Distance from start to end in days. Zero for a single-day range.
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Number of occupied days, counting both ends.
    pub fn occupied_days(&self) -> i64 {
        self.span_days() + 1
    }
}

/// Inclusive overlap test between two ranges.
pub fn ranges_overlap(a: &DateRange, b: &DateRange) -> bool {
    a.overlaps(b)
}
