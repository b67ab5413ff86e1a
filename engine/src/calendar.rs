//! Season calendar bar geometry.
//!
//! Maps a production's date range onto a horizontal axis spanning one display
//! year, expressed in percentages of the axis width. Rendering (minimum pixel
//! widths, colours, conflict rings) is left to the caller.

use crate::date::DateRange;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Position of a production bar on a year axis.
///
/// `left` and `width` are percentages rounded to two decimals, with
/// `0 <= left` and `left + width <= 100`. When `visible` is false both are 0
/// and should be ignored. A visible bar with `width == 0` is a single-day
/// event; render it as a thin marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarPosition {
    pub visible: bool,
    pub left: f64,
    pub width: f64,
}

impl BarPosition {
    const HIDDEN: BarPosition = BarPosition {
        visible: false,
        left: 0.0,
        width: 0.0,
    };
}

/// Left offset of a month boundary on the year axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthMarker {
    /// 1-based month
    pub month: u32,
    pub left: f64,
}

/// Number of days in a calendar year.
pub fn days_in_year(year: i32) -> u32 {
    match NaiveDate::from_ymd_opt(year, 12, 31) {
        Some(last) => last.ordinal(),
        None => 365,
    }
}

/// The display window `Jan 1 ..= Dec 31` of a year.
pub fn year_window(year: i32) -> Option<DateRange> {
    let first = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let last = NaiveDate::from_ymd_opt(year, 12, 31)?;
    Some(DateRange::new(first, last))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percent_of_year(days: i64, year: i32) -> f64 {
    days as f64 / f64::from(days_in_year(year)) * 100.0
}

/// Compute where a production bar sits within `display_year`.
///
/// The range is clipped to the year window; a range that misses the window
/// entirely is not visible.
pub fn bar_position(range: &DateRange, display_year: i32) -> BarPosition {
    let Some(window) = year_window(display_year) else {
        return BarPosition::HIDDEN;
    };
    let Some(clipped) = range.intersection(&window) else {
        return BarPosition::HIDDEN;
    };

    let left = round2(percent_of_year(
        (clipped.start - window.start).num_days(),
        display_year,
    ))
    .clamp(0.0, 100.0);
    let width =
        round2(percent_of_year(clipped.span_days(), display_year)).clamp(0.0, 100.0 - left);

    BarPosition {
        visible: true,
        left,
        width,
    }
}

/// Left offsets of the twelve month starts, for the calendar header.
pub fn month_markers(year: i32) -> Vec<MonthMarker> {
    let Some(window) = year_window(year) else {
        return Vec::new();
    };
    (1..=12)
        .filter_map(|month| {
            let first = NaiveDate::from_ymd_opt(year, month, 1)?;
            Some(MonthMarker {
                month,
                left: round2(percent_of_year((first - window.start).num_days(), year)),
            })
        })
        .collect()
}

/// Left offset of a single day (e.g. a "today" line), `None` outside the year.
pub fn day_marker(day: NaiveDate, year: i32) -> Option<f64> {
    let window = year_window(year)?;
    if !window.contains(day) {
        return None;
    }
    Some(round2(percent_of_year((day - window.start).num_days(), year)))
}
