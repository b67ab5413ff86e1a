//! Planting-schedule conflict detection.
//!
//! Two productions conflict when they sit on the same land and their date
//! ranges share at least one day. The conflict index is rebuilt from scratch
//! on every call; nothing here is cached or persisted.

use crate::date::DateRange;
use crate::production::ProductionRecord;
use crate::{LandId, ProductionId};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One side of a conflict, as seen from the other production.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictDescriptor {
    /// The conflicting production
    pub production_id: ProductionId,
    /// Its commodity, for display
    pub commodity: String,
    /// The shared land
    pub land_id: LandId,
    /// Its full date range
    pub range: DateRange,
    /// Days both productions occupy the land
    pub overlap: DateRange,
    /// Length of the overlap, counting both ends
    pub overlap_days: i64,
}

impl ConflictDescriptor {
    fn new(other: &ProductionRecord, range: DateRange, overlap: DateRange, land_id: &str) -> Self {
        Self {
            production_id: other.id.clone(),
            commodity: other.commodity.clone(),
            land_id: land_id.to_string(),
            range,
            overlap,
            overlap_days: overlap.occupied_days(),
        }
    }
}

/// Conflict index: production id to the productions it conflicts with.
///
/// Symmetric. Only productions with at least one conflict have an entry.
/// Descriptor order within an entry carries no meaning.
pub type ConflictMap = BTreeMap<ProductionId, Vec<ConflictDescriptor>>;

fn land_of(record: &ProductionRecord) -> Option<&str> {
    record.land_id.as_deref().filter(|id| !id.is_empty())
}

/// Build the conflict index for a set of productions.
///
/// Productions are partitioned by land first, so the pairwise comparison
/// only runs inside each land. Records without a land or without any
/// parseable date are left out.
pub fn find_all_conflicts(productions: &[ProductionRecord]) -> ConflictMap {
    let mut by_land: HashMap<&str, Vec<(&ProductionRecord, DateRange)>> = HashMap::new();
    for production in productions {
        let (Some(land_id), Some(range)) = (land_of(production), production.date_range()) else {
            continue;
        };
        by_land.entry(land_id).or_default().push((production, range));
    }

    let mut conflicts = ConflictMap::new();
    for (land_id, group) in &by_land {
        for (i, (a, range_a)) in group.iter().enumerate() {
            for (b, range_b) in &group[i + 1..] {
                if a.id == b.id {
                    continue;
                }
                let Some(overlap) = range_a.intersection(range_b) else {
                    continue;
                };
                conflicts
                    .entry(a.id.clone())
                    .or_default()
                    .push(ConflictDescriptor::new(b, *range_b, overlap, land_id));
                conflicts
                    .entry(b.id.clone())
                    .or_default()
                    .push(ConflictDescriptor::new(a, *range_a, overlap, land_id));
            }
        }
    }

    conflicts
}

/// Conflicts a new or edited production would have against `existing`.
///
/// A record in `existing` with the candidate's own id is the version being
/// edited and is ignored.
pub fn check_conflicts(
    candidate: &ProductionRecord,
    existing: &[ProductionRecord],
) -> Vec<ConflictDescriptor> {
    let (Some(land_id), Some(range)) = (land_of(candidate), candidate.date_range()) else {
        return Vec::new();
    };

    existing
        .iter()
        .filter(|other| other.id != candidate.id && land_of(other) == Some(land_id))
        .filter_map(|other| {
            let other_range = other.date_range()?;
            let overlap = range.intersection(&other_range)?;
            Some(ConflictDescriptor::new(other, other_range, overlap, land_id))
        })
        .collect()
}

/// Earliest start on or after `from` where a production spanning
/// `span_days` (0 for a single day) fits on the land without conflict.
///
/// Returns `None` only if the search runs off the end of the calendar.
pub fn next_free_start(
    land_id: &str,
    span_days: u32,
    from: NaiveDate,
    productions: &[ProductionRecord],
) -> Option<NaiveDate> {
    let mut occupied: Vec<DateRange> = productions
        .iter()
        .filter(|p| land_of(p) == Some(land_id))
        .filter_map(ProductionRecord::date_range)
        .collect();
    occupied.sort_by_key(|r| r.start);

    let mut start = from;
    for range in occupied {
        let end = start.checked_add_days(Days::new(u64::from(span_days)))?;
        if DateRange::new(start, end).overlaps(&range) {
            start = range.end.checked_add_days(Days::new(1))?;
        }
    }
    Some(start)
}

/// Whether a production id has at least one conflict in the map.
pub fn has_conflict(conflicts: &ConflictMap, production_id: &str) -> bool {
    conflicts
        .get(production_id)
        .is_some_and(|entries| !entries.is_empty())
}
