//! Production and land records as they come from the remote store.
//!
//! Field names follow the remote table columns (snake_case). Dates stay as
//! raw strings here; [`ProductionRecord::date_range`] is the parsing boundary.

use crate::date::{parse_day, parse_optional_day, DateRange};
use crate::{LandId, ProductionId};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a production. Informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductionStatus {
    #[default]
    Planted,
    Growing,
    Harvested,
}

/// A single planting-to-harvest cycle of one commodity on one land.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionRecord {
    pub id: ProductionId,
    /// Productions without a land never conflict with anything
    #[serde(default)]
    pub land_id: Option<LandId>,
    pub commodity: String,
    pub planting_date: String,
    #[serde(default)]
    pub estimated_harvest_date: Option<String>,
    /// Actual harvest date, preferred over the estimate when present
    #[serde(default)]
    pub harvest_date: Option<String>,
    #[serde(default)]
    pub status: ProductionStatus,
    #[serde(default)]
    pub area_m2: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ProductionRecord {
    /// Create a production with only the fields the schedule engine reads.
    pub fn new(
        id: impl Into<ProductionId>,
        land_id: Option<&str>,
        commodity: impl Into<String>,
        planting_date: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            land_id: land_id.map(str::to_string),
            commodity: commodity.into(),
            planting_date: planting_date.into(),
            estimated_harvest_date: None,
            harvest_date: None,
            status: ProductionStatus::Planted,
            area_m2: None,
            notes: None,
        }
    }

    /// Set the estimated harvest date.
    pub fn with_estimated_harvest(mut self, date: impl Into<String>) -> Self {
        self.estimated_harvest_date = Some(date.into());
        self
    }

    /// Set the actual harvest date and mark the production harvested.
    pub fn with_harvest(mut self, date: impl Into<String>) -> Self {
        self.harvest_date = Some(date.into());
        self.status = ProductionStatus::Harvested;
        self
    }

    /// Set the status.
    pub fn with_status(mut self, status: ProductionStatus) -> Self {
        self.status = status;
        self
    }

    /// The days this production occupies its land.
    ///
    /// End resolution: actual harvest, then estimated harvest, then the
    /// planting day itself. A malformed end candidate is skipped; a
    /// malformed planting date takes the resolved end. `None` only when no
    /// date on the record parses at all.
    pub fn date_range(&self) -> Option<DateRange> {
        let start = parse_day(&self.planting_date);
        let end = parse_optional_day(self.harvest_date.as_deref())
            .or_else(|| parse_optional_day(self.estimated_harvest_date.as_deref()));

        match (start, end) {
            (Some(start), Some(end)) => Some(DateRange::new(start, end)),
            (Some(start), None) => Some(DateRange::single_day(start)),
            (None, Some(end)) => Some(DateRange::single_day(end)),
            (None, None) => None,
        }
    }
}

/// Free-function form of [`ProductionRecord::date_range`].
pub fn to_date_range(record: &ProductionRecord) -> Option<DateRange> {
    record.date_range()
}

/// A plot of land owned by a farmer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Land {
    pub id: LandId,
    pub name: String,
    #[serde(default)]
    pub area_m2: Option<f64>,
    #[serde(default)]
    pub location: Option<String>,
}

impl Land {
    pub fn new(id: impl Into<LandId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            area_m2: None,
            location: None,
        }
    }
}
