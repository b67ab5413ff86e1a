//! Registry of the entity kinds that can be mutated offline.
//!
//! Each kind maps to the remote endpoint it replays against, the local cache
//! table that mirrors it, and the fields a create payload must carry.

use crate::{error::Result, Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Mutable entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Lands,
    Productions,
    Harvests,
    Transactions,
}

/// Where an entity kind lives locally and remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub kind: EntityKind,
    /// Path segment of the remote table endpoint
    pub remote_endpoint: &'static str,
    /// Name of the local cache table
    pub local_table: &'static str,
    /// Fields a create payload must carry (non-null)
    pub required_fields: &'static [&'static str],
}

const REGISTRY: [TableSpec; 4] = [
    TableSpec {
        kind: EntityKind::Lands,
        remote_endpoint: "lands",
        local_table: "lands",
        required_fields: &["name"],
    },
    TableSpec {
        kind: EntityKind::Productions,
        remote_endpoint: "productions",
        local_table: "productions",
        required_fields: &["land_id", "commodity", "planting_date"],
    },
    TableSpec {
        kind: EntityKind::Harvests,
        remote_endpoint: "harvests",
        local_table: "harvests",
        required_fields: &["production_id", "harvest_date"],
    },
    TableSpec {
        kind: EntityKind::Transactions,
        remote_endpoint: "financial_transactions",
        local_table: "transactions",
        required_fields: &["type", "amount", "date"],
    },
];

impl EntityKind {
    /// All kinds, in registry order.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Lands,
        EntityKind::Productions,
        EntityKind::Harvests,
        EntityKind::Transactions,
    ];

    /// Registry entry for this kind.
    pub fn spec(self) -> &'static TableSpec {
        match self {
            EntityKind::Lands => &REGISTRY[0],
            EntityKind::Productions => &REGISTRY[1],
            EntityKind::Harvests => &REGISTRY[2],
            EntityKind::Transactions => &REGISTRY[3],
        }
    }

    /// Local table name, also used as the wire name of the kind.
    pub fn as_str(self) -> &'static str {
        self.spec().local_table
    }

    /// Check a create payload: must be an object with every required field
    /// present and non-null.
    pub fn validate_create(self, payload: &serde_json::Value) -> Result<()> {
        let obj = payload
            .as_object()
            .ok_or_else(|| Error::InvalidPayload("payload must be an object".into()))?;

        for field in self.spec().required_fields {
            match obj.get(*field) {
                None | Some(serde_json::Value::Null) => {
                    return Err(Error::MissingRequiredField {
                        table: self.as_str().to_string(),
                        field: (*field).to_string(),
                    })
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::UnknownTable(s.to_string()))
    }
}
