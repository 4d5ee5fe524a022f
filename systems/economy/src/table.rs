//! Static upgrade ladder mapping each stat to its per-level values.

use std::collections::BTreeMap;

use flux_harvest_core::{StatName, Upgradeable};
use serde::Deserialize;
use thiserror::Error;

/// Read-only table resolving `(building, stat)` pairs to level-indexed values.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "TableFile")]
pub struct UpgradeTable {
    entries: BTreeMap<(Upgradeable, StatName), Vec<f64>>,
}

/// Nested `building -> stat -> values` layout used by configuration files.
type TableFile = BTreeMap<Upgradeable, BTreeMap<StatName, Vec<f64>>>;

/// Errors raised while building an upgrade table from configuration.
#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    /// A stat was declared without any level values.
    #[error("upgrade `{stat}` for `{building}` must define at least one level")]
    EmptyLadder {
        /// Building family owning the ladder.
        building: Upgradeable,
        /// Stat whose ladder was empty.
        stat: StatName,
    },
    /// A ladder contained a negative or non-finite value.
    #[error("upgrade `{stat}` for `{building}` contains invalid value {value}")]
    InvalidValue {
        /// Building family owning the ladder.
        building: Upgradeable,
        /// Stat whose ladder was invalid.
        stat: StatName,
        /// Offending value.
        value: f64,
    },
}

impl UpgradeTable {
    /// Creates a table from explicit entries, validating every ladder.
    pub fn from_entries<I>(entries: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = (Upgradeable, StatName, Vec<f64>)>,
    {
        let mut table = Self {
            entries: BTreeMap::new(),
        };
        for (building, stat, values) in entries {
            table = table.with_ladder(building, stat, values)?;
        }
        Ok(table)
    }

    /// Returns a copy of the table with one ladder replaced or added.
    pub fn with_ladder(
        mut self,
        building: Upgradeable,
        stat: StatName,
        values: Vec<f64>,
    ) -> Result<Self, TableError> {
        if values.is_empty() {
            return Err(TableError::EmptyLadder { building, stat });
        }
        if let Some(value) = values
            .iter()
            .copied()
            .find(|value| !value.is_finite() || *value < 0.0)
        {
            return Err(TableError::InvalidValue {
                building,
                stat,
                value,
            });
        }
        let _ = self.entries.insert((building, stat), values);
        Ok(self)
    }

    /// Level-indexed values for the pair, if the pair is defined.
    #[must_use]
    pub fn ladder(&self, building: Upgradeable, stat: StatName) -> Option<&[f64]> {
        self.entries.get(&(building, stat)).map(Vec::as_slice)
    }

    /// Stats defined for a building family, in table order.
    #[must_use]
    pub fn stats_for(&self, building: Upgradeable) -> Vec<StatName> {
        StatName::ALL
            .into_iter()
            .filter(|stat| self.entries.contains_key(&(building, *stat)))
            .collect()
    }
}

impl Default for UpgradeTable {
    fn default() -> Self {
        let ladders: [(Upgradeable, StatName, &[f64]); 10] = [
            (Upgradeable::Absorber, StatName::NumOwned, &[5.0]),
            (
                Upgradeable::Absorber,
                StatName::HarvestRate,
                &[0.2, 0.4, 0.6, 0.8, 1.0],
            ),
            (
                Upgradeable::Absorber,
                StatName::Efficiency,
                &[0.1, 0.15, 0.2, 0.25, 0.3],
            ),
            (Upgradeable::Collector, StatName::NumOwned, &[5.0]),
            (
                Upgradeable::Collector,
                StatName::HarvestRate,
                &[0.1, 1.0, 10.0],
            ),
            (
                Upgradeable::Collector,
                StatName::Efficiency,
                &[0.1, 0.15, 0.2, 0.25, 0.3],
            ),
            (Upgradeable::Collector, StatName::Capacity, &[10.0]),
            (Upgradeable::Board, StatName::NumOwned, &[1.0]),
            (
                Upgradeable::Board,
                StatName::HarvestRate,
                &[0.0, 0.01, 0.02, 0.04, 0.1],
            ),
            (Upgradeable::Board, StatName::Efficiency, &[0.01]),
        ];

        Self {
            entries: ladders
                .into_iter()
                .map(|(building, stat, values)| ((building, stat), values.to_vec()))
                .collect(),
        }
    }
}

impl TryFrom<TableFile> for UpgradeTable {
    type Error = TableError;

    fn try_from(file: TableFile) -> Result<Self, Self::Error> {
        Self::from_entries(file.into_iter().flat_map(|(building, stats)| {
            stats
                .into_iter()
                .map(move |(stat, values)| (building, stat, values))
        }))
    }
}
