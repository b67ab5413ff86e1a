//! Per-land grouping for the season calendar.

use crate::calendar::bar_position;
use crate::conflict::{has_conflict, ConflictMap};
use crate::date::DateRange;
use crate::production::{Land, ProductionRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A production with its date range resolved once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionWithRange {
    pub production: ProductionRecord,
    /// `None` when no date on the record parses
    pub range: Option<DateRange>,
}

impl ProductionWithRange {
    pub fn new(production: ProductionRecord) -> Self {
        let range = production.date_range();
        Self { production, range }
    }

    /// Whether this production's bar shows in `year`.
    pub fn is_visible_in(&self, year: i32) -> bool {
        self.range
            .as_ref()
            .is_some_and(|range| bar_position(range, year).visible)
    }
}

/// All productions on one land.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandProductionGroup {
    pub land: Land,
    pub productions: Vec<ProductionWithRange>,
    /// True if any production here appears in the conflict map
    pub has_conflicts: bool,
}

impl LandProductionGroup {
    /// Productions whose bars are visible in `year`, in input order.
    pub fn visible_in(&self, year: i32) -> impl Iterator<Item = &ProductionWithRange> {
        self.productions
            .iter()
            .filter(move |p| p.is_visible_in(year))
    }
}

/// Group productions under their lands.
///
/// Groups follow the order of `lands`; lands with no productions at all are
/// left out. Productions whose land is not in `lands` are dropped. The
/// conflict map is built by the caller and only read here.
pub fn group_productions_by_land(
    productions: &[ProductionRecord],
    lands: &[Land],
    conflicts: &ConflictMap,
) -> Vec<LandProductionGroup> {
    let mut by_land: HashMap<&str, Vec<ProductionWithRange>> = HashMap::new();
    for production in productions {
        if let Some(land_id) = production.land_id.as_deref() {
            by_land
                .entry(land_id)
                .or_default()
                .push(ProductionWithRange::new(production.clone()));
        }
    }

    lands
        .iter()
        .filter_map(|land| {
            let productions = by_land.remove(land.id.as_str())?;
            let has_conflicts = productions
                .iter()
                .any(|p| has_conflict(conflicts, &p.production.id));
            Some(LandProductionGroup {
                land: land.clone(),
                productions,
                has_conflicts,
            })
        })
        .collect()
}
