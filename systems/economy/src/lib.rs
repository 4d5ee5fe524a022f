#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Economy ledger tracking currency, upgrade levels, and structure placement caps.
//!
//! Every gameplay number flows through [`Economy::building_stat`], which
//! resolves the current level of a `(building, stat)` pair against the static
//! [`UpgradeTable`]. The ledger has no knowledge of the grid; the world pairs
//! cell mutations with [`Economy::register_placement`] and
//! [`Economy::register_removal`] so the placed counts always mirror occupancy.

mod table;

use std::collections::BTreeMap;

use flux_harvest_core::{StatName, StructureKind, UpgradeRejection, Upgradeable};
use thiserror::Error;

pub use table::{TableError, UpgradeTable};

/// Currency granted to a fresh ledger.
pub const STARTING_CURRENCY: f64 = 10.0;

/// Base of the exponential upgrade cost ladder.
const COST_BASE: f64 = 10.0;

/// Failures raised by the ledger.
///
/// Only [`EconomyError::InsufficientFunds`] is recoverable; the remaining
/// variants indicate a bug in the caller and should abort the simulation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EconomyError {
    /// The `(building, stat)` pair is not defined or its level is out of range.
    #[error("no upgrade `{stat}` at level {level} defined for building `{building}`")]
    InvalidUpgrade {
        /// Building family that was queried.
        building: Upgradeable,
        /// Stat that was queried.
        stat: StatName,
        /// Level that was resolved.
        level: u32,
    },
    /// A spend exceeded the available currency.
    #[error("cannot spend {cost} energy with only {available} available")]
    InsufficientFunds {
        /// Amount requested.
        cost: f64,
        /// Currency available at the time of the request.
        available: f64,
    },
    /// A structure was removed while its placed count was already zero.
    #[error("destroyed a `{building}` structure that was never placed")]
    DestroyedUnplaced {
        /// Building family whose count would underflow.
        building: Upgradeable,
    },
    /// The harvest phase attempted to credit a negative amount.
    #[error("cannot add negative energy {amount} on tick {tick}")]
    NegativeEnergy {
        /// Tick during which the credit was attempted.
        tick: u64,
        /// Offending amount.
        amount: f64,
    },
    /// A spend requested a negative or undefined amount.
    #[error("cannot spend invalid amount {amount}")]
    InvalidSpend {
        /// Offending amount.
        amount: f64,
    },
}

impl EconomyError {
    /// Reports whether the error signals a broken invariant rather than a player mistake.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::InsufficientFunds { .. })
    }
}

/// Result of an upgrade purchase attempt.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UpgradeOutcome {
    /// The upgrade was bought.
    Purchased {
        /// Level reached after the purchase.
        level: u32,
        /// Currency deducted.
        cost: f64,
    },
    /// The purchase was declined and the ledger is unchanged.
    Rejected(UpgradeRejection),
}

/// Player currency, upgrade levels, and placed-structure counts.
#[derive(Clone, Debug)]
pub struct Economy {
    table: UpgradeTable,
    currency: f64,
    levels: BTreeMap<(Upgradeable, StatName), u32>,
    placed: BTreeMap<Upgradeable, u32>,
}

impl Default for Economy {
    fn default() -> Self {
        Self::new(UpgradeTable::default(), STARTING_CURRENCY)
    }
}

impl Economy {
    /// Creates a ledger backed by the provided table and opening balance.
    ///
    /// Negative balances are clamped to zero. The board itself always counts
    /// as one placed `board` building.
    #[must_use]
    pub fn new(table: UpgradeTable, starting_currency: f64) -> Self {
        let mut placed = BTreeMap::new();
        let _ = placed.insert(Upgradeable::Board, 1);
        Self {
            table,
            currency: starting_currency.max(0.0),
            levels: BTreeMap::new(),
            placed,
        }
    }

    /// Currency currently held by the player.
    #[must_use]
    pub fn currency(&self) -> f64 {
        self.currency
    }

    /// Static table backing every stat lookup.
    #[must_use]
    pub fn table(&self) -> &UpgradeTable {
        &self.table
    }

    /// Stats that may be upgraded for a building family.
    #[must_use]
    pub fn stats_for(&self, building: Upgradeable) -> Vec<StatName> {
        self.table.stats_for(building)
    }

    /// Current level of an upgrade; zero until first purchased.
    pub fn upgrade_level(&self, building: Upgradeable, stat: StatName) -> Result<u32, EconomyError> {
        let _ = self.ladder(building, stat, 0)?;
        Ok(self.level_of(building, stat))
    }

    /// Resolves the live value of a stat at its current level.
    pub fn building_stat(&self, building: Upgradeable, stat: StatName) -> Result<f64, EconomyError> {
        let level = self.level_of(building, stat);
        let ladder = self.ladder(building, stat, level)?;
        let index = usize::try_from(level).map_err(|_| EconomyError::InvalidUpgrade {
            building,
            stat,
            level,
        })?;
        ladder
            .get(index)
            .copied()
            .ok_or(EconomyError::InvalidUpgrade {
                building,
                stat,
                level,
            })
    }

    /// Cost of reaching `level`, or of the next level when `level` is `None`.
    pub fn upgrade_cost(
        &self,
        building: Upgradeable,
        stat: StatName,
        level: Option<u32>,
    ) -> Result<f64, EconomyError> {
        let level = match level {
            Some(level) => level,
            None => self.upgrade_level(building, stat)?.saturating_add(1),
        };
        let exponent = i32::try_from(level).unwrap_or(i32::MAX);
        Ok(COST_BASE.powi(exponent))
    }

    /// Reports whether the stat already sits on the last entry of its ladder.
    pub fn is_at_max_level(&self, building: Upgradeable, stat: StatName) -> Result<bool, EconomyError> {
        let level = self.level_of(building, stat);
        let ladder = self.ladder(building, stat, level)?;
        Ok(ladder.len() <= usize::try_from(level).unwrap_or(usize::MAX).saturating_add(1))
    }

    /// Deducts `amount` from the balance.
    pub fn spend(&mut self, amount: f64) -> Result<(), EconomyError> {
        if amount < 0.0 || amount.is_nan() {
            return Err(EconomyError::InvalidSpend { amount });
        }
        if amount > self.currency {
            return Err(EconomyError::InsufficientFunds {
                cost: amount,
                available: self.currency,
            });
        }
        self.currency = (self.currency - amount).max(0.0);
        Ok(())
    }

    /// Attempts to buy the next level of an upgrade.
    ///
    /// Unaffordable purchases and purchases past the end of the ladder are
    /// declined without touching the ledger. Only an undefined pair is an error.
    pub fn buy_upgrade(
        &mut self,
        building: Upgradeable,
        stat: StatName,
    ) -> Result<UpgradeOutcome, EconomyError> {
        if self.is_at_max_level(building, stat)? {
            return Ok(UpgradeOutcome::Rejected(UpgradeRejection::MaxLevel));
        }

        let cost = self.upgrade_cost(building, stat, None)?;
        match self.spend(cost) {
            Ok(()) => {}
            Err(EconomyError::InsufficientFunds { cost, available }) => {
                return Ok(UpgradeOutcome::Rejected(
                    UpgradeRejection::InsufficientFunds { cost, available },
                ));
            }
            Err(error) => return Err(error),
        }

        let level = self.level_of(building, stat).saturating_add(1);
        let _ = self.levels.insert((building, stat), level);
        tracing::info!(
            target: "flux_harvest::economy",
            building = %building,
            stat = %stat,
            level,
            cost,
            currency = self.currency,
            "upgrade.purchased"
        );
        Ok(UpgradeOutcome::Purchased { level, cost })
    }

    /// Number of structures of the family currently on the grid.
    #[must_use]
    pub fn placed_count(&self, building: Upgradeable) -> u32 {
        self.placed.get(&building).copied().unwrap_or(0)
    }

    /// Reports whether another structure of `kind` fits under its `numOwned` cap.
    ///
    /// Fixtures have no upgrade family and are never capped.
    pub fn can_place_structure(&self, kind: StructureKind) -> Result<bool, EconomyError> {
        let Some(building) = kind.upgradeable() else {
            return Ok(true);
        };
        let cap = self.building_stat(building, StatName::NumOwned)?;
        Ok(f64::from(self.placed_count(building)) < cap)
    }

    /// Records that a structure of `kind` was placed on the grid.
    ///
    /// Returns `false` without counting when the cap is already reached.
    pub fn register_placement(&mut self, kind: StructureKind) -> Result<bool, EconomyError> {
        if !self.can_place_structure(kind)? {
            return Ok(false);
        }
        if let Some(building) = kind.upgradeable() {
            let count = self.placed.entry(building).or_insert(0);
            *count = count.saturating_add(1);
        }
        Ok(true)
    }

    /// Records that a structure of `kind` left the grid.
    pub fn register_removal(&mut self, kind: StructureKind) -> Result<(), EconomyError> {
        let Some(building) = kind.upgradeable() else {
            return Ok(());
        };
        match self.placed.get_mut(&building) {
            Some(count) if *count > 0 => {
                *count -= 1;
                Ok(())
            }
            _ => Err(EconomyError::DestroyedUnplaced { building }),
        }
    }

    /// Credits harvested energy to the balance.
    pub fn add_energy(&mut self, tick: u64, amount: f64) -> Result<(), EconomyError> {
        if amount < 0.0 || amount.is_nan() {
            return Err(EconomyError::NegativeEnergy { tick, amount });
        }
        self.currency += amount;
        Ok(())
    }

    fn level_of(&self, building: Upgradeable, stat: StatName) -> u32 {
        self.levels.get(&(building, stat)).copied().unwrap_or(0)
    }

    fn ladder(&self, building: Upgradeable, stat: StatName, level: u32) -> Result<&[f64], EconomyError> {
        self.table
            .ladder(building, stat)
            .ok_or(EconomyError::InvalidUpgrade {
                building,
                stat,
                level,
            })
    }
}
