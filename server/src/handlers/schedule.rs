//! Calendar and conflict-check responses, computed from plain records.

use chrono::NaiveDate;
use rindang_engine::{
    bar_position, calendar::year_window, check_conflicts, day_marker, days_in_year,
    find_all_conflicts, group_productions_by_land, month_markers, next_free_start, BarPosition,
    ConflictDescriptor, DateRange, Land, MonthMarker, ProductionRecord,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// One production bar on the season calendar.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarBar {
    pub production: ProductionRecord,
    pub range: DateRange,
    pub bar: BarPosition,
    /// Empty when the production has no conflicts
    pub conflicts: Vec<ConflictDescriptor>,
}

/// One land row on the season calendar.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarLand {
    pub land: Land,
    pub has_conflicts: bool,
    pub bars: Vec<CalendarBar>,
}

/// The season calendar for one year.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarResponse {
    pub year: i32,
    pub days_in_year: u32,
    pub months: Vec<MonthMarker>,
    /// Position of the "today" line, absent outside the year
    pub today: Option<f64>,
    pub lands: Vec<CalendarLand>,
}

/// Build the calendar for `year`.
///
/// Conflicts are computed over every production, not only the visible
/// ones, so a land is flagged even when the clash sits in another year.
/// Lands with nothing planted in `year` are left out.
pub fn build_calendar(
    productions: &[ProductionRecord],
    lands: &[Land],
    year: i32,
    today: NaiveDate,
) -> Result<CalendarResponse> {
    if year_window(year).is_none() {
        return Err(AppError::BadRequest(format!("year out of range: {year}")));
    }

    let conflicts = find_all_conflicts(productions);
    let lands = group_productions_by_land(productions, lands, &conflicts)
        .into_iter()
        .filter_map(|group| {
            let bars = group
                .visible_in(year)
                .filter_map(|entry| {
                    let range = entry.range?;
                    Some(CalendarBar {
                        production: entry.production.clone(),
                        range,
                        bar: bar_position(&range, year),
                        conflicts: conflicts
                            .get(&entry.production.id)
                            .cloned()
                            .unwrap_or_default(),
                    })
                })
                .collect::<Vec<_>>();
            if bars.is_empty() {
                return None;
            }
            Some(CalendarLand {
                land: group.land,
                has_conflicts: group.has_conflicts,
                bars,
            })
        })
        .collect();

    Ok(CalendarResponse {
        year,
        days_in_year: days_in_year(year),
        months: month_markers(year),
        today: day_marker(today, year),
        lands,
    })
}

/// Body of `POST /schedule/check`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    pub candidate: ProductionRecord,
    /// Defaults to the cached productions
    #[serde(default)]
    pub existing: Option<Vec<ProductionRecord>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub conflicts: Vec<ConflictDescriptor>,
    /// Earliest conflict-free start for the same duration, when the
    /// candidate conflicts
    pub next_free_start: Option<NaiveDate>,
}

/// Check a candidate production against `existing`.
pub fn check_candidate(candidate: &ProductionRecord, existing: &[ProductionRecord]) -> CheckResponse {
    let conflicts = check_conflicts(candidate, existing);

    let next_free_start = match (&candidate.land_id, candidate.date_range()) {
        (Some(land_id), Some(range)) if !conflicts.is_empty() => {
            let others: Vec<ProductionRecord> = existing
                .iter()
                .filter(|p| p.id != candidate.id)
                .cloned()
                .collect();
            let span = u32::try_from(range.span_days()).unwrap_or(u32::MAX);
            next_free_start(land_id, span, range.start, &others)
        }
        _ => None,
    };

    CheckResponse {
        conflicts,
        next_free_start,
    }
}
