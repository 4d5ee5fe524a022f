#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for Flux Harvest.
//!
//! The world owns the flux grid and the economy ledger. Adapters and systems
//! never mutate either directly: they submit [`Command`] values through
//! [`apply`] and observe the resulting [`Event`] values, while the [`query`]
//! module exposes read-only snapshots for rendering.

mod cell;
mod grid;
mod ledger;
mod structure;

use flux_harvest_core::{
    CellCoord, Command, DestructionCause, EmissionWindow, Event, PlacementError, ProducerConfig,
    RemovalError, StatName, StructureKind, Upgradeable, WELCOME_BANNER,
};
use flux_harvest_system_economy::{Economy, EconomyError, UpgradeOutcome, UpgradeTable};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use thiserror::Error;

pub use cell::Cell;
pub use grid::{Grid, GridSettings, GridView, TickReport};
pub use ledger::{build_structure, destroy_structure, BuildOutcome};
pub use structure::{
    pull_weight, Collector, Emission, FluxProducer, PullRules, Structure, NEIGHBOURHOOD,
    ORTHOGONAL, SURROUNDING,
};

const DEFAULT_ROWS: u32 = 40;
const DEFAULT_COLUMNS: u32 = 50;
const DEFAULT_SEED: u64 = 0x6a09_e667_f3bc_c908;

/// Failures that abort the simulation.
#[derive(Debug, Error)]
pub enum WorldError {
    /// The economy ledger reported a broken invariant.
    #[error(transparent)]
    Economy(#[from] EconomyError),
    /// A configured fixture lies outside the grid.
    #[error("fixture at {cell} lies outside the grid")]
    FixtureOutOfBounds {
        /// Requested fixture position.
        cell: CellCoord,
    },
    /// Two configured fixtures share a cell.
    #[error("fixture at {cell} overlaps another fixture")]
    FixtureOverlap {
        /// Contested fixture position.
        cell: CellCoord,
    },
    /// A grid tunable lies outside its accepted range.
    #[error("grid setting `{setting}` cannot be {value}")]
    InvalidSetting {
        /// Name of the offending field.
        setting: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// A producer fixture carries an emission value outside its accepted range.
    #[error("producer at {cell} cannot use `{setting}` = {value}")]
    InvalidProducer {
        /// Producer position.
        cell: CellCoord,
        /// Name of the offending field.
        setting: &'static str,
        /// Rejected value.
        value: f64,
    },
}

/// Position and settings of a producer fixture.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct ProducerPlacement {
    /// Cell hosting the producer.
    pub cell: CellCoord,
    /// Emission behaviour.
    #[serde(default)]
    pub config: ProducerConfig,
}

/// Everything needed to build a fresh world.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Number of grid rows.
    pub rows: u32,
    /// Number of grid columns.
    pub columns: u32,
    /// Seed for producer target selection.
    pub seed: u64,
    /// Currency granted before the first tick.
    pub starting_currency: f64,
    /// Diffusion and decay tunables.
    pub grid: GridSettings,
    /// Wall fixtures placed at construction.
    pub walls: Vec<CellCoord>,
    /// Producer fixtures placed at construction.
    pub producers: Vec<ProducerPlacement>,
    /// Whether player collectors are destroyed once they exceed their capacity.
    pub collector_overflow: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            columns: DEFAULT_COLUMNS,
            seed: DEFAULT_SEED,
            starting_currency: flux_harvest_system_economy::STARTING_CURRENCY,
            grid: GridSettings::default(),
            walls: Vec::new(),
            producers: vec![ProducerPlacement {
                cell: CellCoord::new(DEFAULT_ROWS / 2, DEFAULT_COLUMNS / 2),
                config: ProducerConfig {
                    window: EmissionWindow::Global,
                    ..ProducerConfig::default()
                },
            }],
            collector_overflow: false,
        }
    }
}

/// Represents the authoritative Flux Harvest world state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    grid: Grid,
    economy: Economy,
    collector_overflow: bool,
    last_tick: Option<u64>,
}

impl World {
    /// Creates a world with the default upgrade table.
    pub fn new(config: &WorldConfig) -> Result<Self, WorldError> {
        let economy = Economy::new(UpgradeTable::default(), config.starting_currency);
        Self::with_economy(config, economy)
    }

    /// Creates a world around an existing ledger.
    ///
    /// `config.starting_currency` is ignored; the ledger keeps its own balance.
    pub fn with_economy(config: &WorldConfig, economy: Economy) -> Result<Self, WorldError> {
        config.grid.validate()?;
        for producer in &config.producers {
            validate_producer(producer)?;
        }

        let mut world = Self::empty(config, economy);
        for &cell in &config.walls {
            world.place_fixture(cell, Structure::Wall)?;
        }
        for producer in &config.producers {
            world.place_fixture(producer.cell, Structure::producer(producer.config))?;
        }

        tracing::info!(
            target: "flux_harvest::world",
            rows = config.rows,
            columns = config.columns,
            seed = config.seed,
            walls = config.walls.len(),
            producers = config.producers.len(),
            "world.created"
        );
        Ok(world)
    }

    fn empty(config: &WorldConfig, economy: Economy) -> Self {
        Self {
            banner: WELCOME_BANNER,
            grid: Grid::new(
                config.rows,
                config.columns,
                config.grid,
                ChaCha8Rng::seed_from_u64(config.seed),
            ),
            economy,
            collector_overflow: config.collector_overflow,
            last_tick: None,
        }
    }

    fn place_fixture(&mut self, coord: CellCoord, structure: Structure) -> Result<(), WorldError> {
        let cell = self
            .grid
            .cell_mut(coord)
            .ok_or(WorldError::FixtureOutOfBounds { cell: coord })?;
        if cell.occupant().is_some() {
            return Err(WorldError::FixtureOverlap { cell: coord });
        }
        match build_structure(&mut self.economy, cell, structure)? {
            BuildOutcome::Built { .. } => Ok(()),
            BuildOutcome::Rejected(_) => Err(WorldError::FixtureOverlap { cell: coord }),
        }
    }

    fn player_structure(&self, kind: StructureKind) -> Option<Structure> {
        match Structure::for_player(kind)? {
            Structure::Collector(_) if self.collector_overflow => {
                Some(Structure::Collector(Collector::with_overflow()))
            }
            structure => Some(structure),
        }
    }

    fn run_tick(&mut self, tick: u64, out_events: &mut Vec<Event>) -> Result<(), WorldError> {
        if let Some(last) = self.last_tick {
            if tick <= last {
                tracing::warn!(target: "flux_harvest::world", tick, last, "tick.out_of_order");
            }
        }
        self.last_tick = Some(tick);

        let report = self.grid.tick(tick, &mut self.economy)?;
        self.economy.add_energy(tick, report.harvested)?;

        for emission in &report.emissions {
            out_events.push(Event::FluxEmitted {
                producer: emission.producer,
                target: emission.target,
                amount: emission.amount,
            });
        }
        for &(cell, kind) in &report.destroyed {
            out_events.push(Event::StructureDestroyed {
                cell,
                kind,
                cause: DestructionCause::Overflow,
            });
        }
        out_events.push(Event::TickCompleted {
            tick,
            harvested: report.harvested,
            currency: self.economy.currency(),
        });
        Ok(())
    }

    fn build(
        &mut self,
        coord: CellCoord,
        kind: StructureKind,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        let outcome = match (self.player_structure(kind), self.grid.cell_mut(coord)) {
            (None, _) => BuildOutcome::Rejected(PlacementError::NotBuildable),
            (Some(_), None) => BuildOutcome::Rejected(PlacementError::OutOfBounds),
            (Some(structure), Some(cell)) => build_structure(&mut self.economy, cell, structure)?,
        };

        match outcome {
            BuildOutcome::Built { replaced } => {
                tracing::info!(
                    target: "flux_harvest::world",
                    cell = %coord,
                    kind = %kind,
                    replaced = ?replaced,
                    "structure.built"
                );
                out_events.push(Event::StructureBuilt {
                    cell: coord,
                    kind,
                    replaced,
                });
            }
            BuildOutcome::Rejected(reason) => {
                tracing::warn!(
                    target: "flux_harvest::world",
                    cell = %coord,
                    kind = %kind,
                    reason = ?reason,
                    "structure.placement_rejected"
                );
                out_events.push(Event::PlacementRejected {
                    cell: coord,
                    kind,
                    reason,
                });
            }
        }
        Ok(())
    }

    fn destroy(&mut self, coord: CellCoord, out_events: &mut Vec<Event>) -> Result<(), WorldError> {
        let rejection = match self.grid.cell_mut(coord) {
            None => Some(RemovalError::OutOfBounds),
            Some(cell) if cell.occupant().is_none() => Some(RemovalError::Empty),
            Some(cell) if !cell.can_be_built_on() => Some(RemovalError::Protected),
            Some(cell) => {
                if let Some(removed) = destroy_structure(&mut self.economy, cell)? {
                    tracing::info!(
                        target: "flux_harvest::world",
                        cell = %coord,
                        kind = %removed.kind(),
                        "structure.removed"
                    );
                    out_events.push(Event::StructureDestroyed {
                        cell: coord,
                        kind: removed.kind(),
                        cause: DestructionCause::Player,
                    });
                }
                None
            }
        };

        if let Some(reason) = rejection {
            tracing::warn!(
                target: "flux_harvest::world",
                cell = %coord,
                reason = ?reason,
                "structure.removal_rejected"
            );
            out_events.push(Event::RemovalRejected {
                cell: coord,
                reason,
            });
        }
        Ok(())
    }

    fn buy_upgrade(
        &mut self,
        building: Upgradeable,
        stat: StatName,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        match self.economy.buy_upgrade(building, stat)? {
            UpgradeOutcome::Purchased { level, cost } => {
                out_events.push(Event::UpgradePurchased {
                    building,
                    stat,
                    level,
                    cost,
                });
            }
            UpgradeOutcome::Rejected(reason) => {
                tracing::warn!(
                    target: "flux_harvest::world",
                    building = %building,
                    stat = %stat,
                    reason = ?reason,
                    "upgrade.rejected"
                );
                out_events.push(Event::UpgradeRejected {
                    building,
                    stat,
                    reason,
                });
            }
        }
        Ok(())
    }
}

fn validate_producer(placement: &ProducerPlacement) -> Result<(), WorldError> {
    let ProducerConfig {
        flux_per_tick,
        surge_chance,
        ..
    } = placement.config;
    let invalid = |setting, value| WorldError::InvalidProducer {
        cell: placement.cell,
        setting,
        value,
    };
    if !flux_per_tick.is_finite() || flux_per_tick < 0.0 {
        return Err(invalid("flux_per_tick", flux_per_tick));
    }
    if !(0.0..=1.0).contains(&surge_chance) {
        return Err(invalid("surge_chance", surge_chance));
    }
    Ok(())
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Player mistakes are reported as rejection events. An `Err` means an
/// internal invariant broke and the simulation should stop.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) -> Result<(), WorldError> {
    match command {
        Command::Tick { tick } => world.run_tick(tick, out_events),
        Command::BuildStructure { cell, kind } => world.build(cell, kind, out_events),
        Command::DestroyStructure { cell } => world.destroy(cell, out_events),
        Command::BuyUpgrade { building, stat } => world.buy_upgrade(building, stat, out_events),
        Command::InjectFlux { cell, amount } => {
            if !world.grid.inject_flux(cell, amount) {
                tracing::warn!(
                    target: "flux_harvest::world",
                    cell = %cell,
                    amount,
                    "flux.injection_ignored"
                );
            }
            Ok(())
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use flux_harvest_core::{CellCoord, StatName, StructureKind, Upgradeable};
    use flux_harvest_system_economy::Economy;

    use super::{Grid, World, WorldError};

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Provides read-only access to the flux grid.
    #[must_use]
    pub fn grid(world: &World) -> &Grid {
        &world.grid
    }

    /// Provides read-only access to the economy ledger.
    #[must_use]
    pub fn economy(world: &World) -> &Economy {
        &world.economy
    }

    /// Grid dimensions as `(rows, columns)`.
    #[must_use]
    pub fn dimensions(world: &World) -> (u32, u32) {
        (world.grid.rows(), world.grid.columns())
    }

    /// Currency currently held by the player.
    #[must_use]
    pub fn currency(world: &World) -> f64 {
        world.economy.currency()
    }

    /// Energy harvested since the world was created.
    #[must_use]
    pub fn total_harvested(world: &World) -> f64 {
        world.grid.total_harvested()
    }

    /// Sum of flux held across the grid.
    #[must_use]
    pub fn total_flux(world: &World) -> f64 {
        world.grid.total_flux()
    }

    /// Most recent tick executed, if any.
    #[must_use]
    pub fn last_tick(world: &World) -> Option<u64> {
        world.last_tick
    }

    /// Kind of the structure occupying the cell, if any.
    #[must_use]
    pub fn occupant_at(world: &World, cell: CellCoord) -> Option<StructureKind> {
        world.grid.cell(cell).and_then(super::Cell::kind)
    }

    /// Flux held by the cell, if in bounds.
    #[must_use]
    pub fn flux_at(world: &World, cell: CellCoord) -> Option<f64> {
        world.grid.cell(cell).map(super::Cell::flux)
    }

    /// Captures every cell in row-major order.
    pub fn cell_snapshots(world: &World) -> Result<Vec<CellSnapshot>, WorldError> {
        world
            .grid
            .cells()
            .map(|cell| -> Result<CellSnapshot, WorldError> {
                Ok(CellSnapshot {
                    coord: cell.coord(),
                    flux: cell.flux(),
                    kind: cell.kind(),
                    integrity: cell.building_integrity(&world.economy)?,
                })
            })
            .collect()
    }

    /// Describes every upgrade offered for the building family.
    pub fn upgrades(world: &World, building: Upgradeable) -> Result<Vec<UpgradeSnapshot>, WorldError> {
        let economy = &world.economy;
        economy
            .stats_for(building)
            .into_iter()
            .map(|stat| -> Result<UpgradeSnapshot, WorldError> {
                Ok(UpgradeSnapshot {
                    building,
                    stat,
                    level: economy.upgrade_level(building, stat)?,
                    value: economy.building_stat(building, stat)?,
                    next_cost: economy.upgrade_cost(building, stat, None)?,
                    at_max_level: economy.is_at_max_level(building, stat)?,
                })
            })
            .collect()
    }

    /// Immutable representation of a single cell used for rendering.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct CellSnapshot {
        /// Position of the cell.
        pub coord: CellCoord,
        /// Settled flux held by the cell.
        pub flux: f64,
        /// Kind of the occupant, if any.
        pub kind: Option<StructureKind>,
        /// Occupant integrity in `[0, 1]`; 1 for bare ground.
        pub integrity: f64,
    }

    /// Immutable representation of one upgrade ladder entry.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct UpgradeSnapshot {
        /// Building family that owns the upgrade.
        pub building: Upgradeable,
        /// Stat raised by the upgrade.
        pub stat: StatName,
        /// Current level.
        pub level: u32,
        /// Live value at the current level.
        pub value: f64,
        /// Cost of the next level.
        pub next_cost: f64,
        /// Whether the ladder is exhausted.
        pub at_max_level: bool,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> WorldConfig {
        WorldConfig {
            rows: 5,
            columns: 5,
            producers: Vec::new(),
            ..WorldConfig::default()
        }
    }

    #[test]
    fn default_config_places_a_global_bombard_at_the_centre() {
        let world = World::new(&WorldConfig::default()).expect("default board is valid");

        assert_eq!(query::dimensions(&world), (40, 50));
        assert_eq!(
            query::occupant_at(&world, CellCoord::new(20, 25)),
            Some(StructureKind::FluxProducer)
        );
        assert_eq!(query::welcome_banner(&world), WELCOME_BANNER);
        assert!((query::currency(&world) - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn fixture_outside_the_grid_is_rejected() {
        let config = WorldConfig {
            walls: vec![CellCoord::new(9, 0)],
            ..small_config()
        };

        let error = World::new(&config).expect_err("wall lies outside");
        assert!(matches!(error, WorldError::FixtureOutOfBounds { .. }));
    }

    #[test]
    fn overlapping_fixtures_are_rejected() {
        let config = WorldConfig {
            walls: vec![CellCoord::new(1, 1)],
            producers: vec![ProducerPlacement {
                cell: CellCoord::new(1, 1),
                config: ProducerConfig::default(),
            }],
            ..small_config()
        };

        let error = World::new(&config).expect_err("cells overlap");
        assert!(matches!(error, WorldError::FixtureOverlap { .. }));
    }

    #[test]
    fn non_positive_or_undefined_pull_weight_is_rejected() {
        for weight in [0.0, -10.0, f64::NAN, f64::INFINITY] {
            let config = WorldConfig {
                grid: GridSettings {
                    base_pull_weight: weight,
                    ..GridSettings::default()
                },
                ..small_config()
            };

            let error = World::new(&config).expect_err("pull weight must be positive");
            assert!(matches!(
                error,
                WorldError::InvalidSetting {
                    setting: "base_pull_weight",
                    ..
                }
            ));
        }
    }

    #[test]
    fn negative_decay_is_rejected() {
        let config = WorldConfig {
            grid: GridSettings {
                passive_decay: -0.5,
                ..GridSettings::default()
            },
            ..small_config()
        };

        let error = World::new(&config).expect_err("decay cannot add flux");
        assert!(matches!(
            error,
            WorldError::InvalidSetting {
                setting: "passive_decay",
                ..
            }
        ));
    }

    #[test]
    fn producer_emission_values_are_range_checked() {
        let cases = [
            (
                ProducerConfig {
                    flux_per_tick: -1.0,
                    ..ProducerConfig::default()
                },
                "flux_per_tick",
            ),
            (
                ProducerConfig {
                    flux_per_tick: f64::NAN,
                    ..ProducerConfig::default()
                },
                "flux_per_tick",
            ),
            (
                ProducerConfig {
                    surge_chance: 1.5,
                    ..ProducerConfig::default()
                },
                "surge_chance",
            ),
            (
                ProducerConfig {
                    surge_chance: f64::NAN,
                    ..ProducerConfig::default()
                },
                "surge_chance",
            ),
        ];

        for (config, expected) in cases {
            let world_config = WorldConfig {
                producers: vec![ProducerPlacement {
                    cell: CellCoord::new(2, 2),
                    config,
                }],
                ..small_config()
            };

            let error = World::new(&world_config).expect_err("emission values are out of range");
            match error {
                WorldError::InvalidProducer { cell, setting, .. } => {
                    assert_eq!(cell, CellCoord::new(2, 2));
                    assert_eq!(setting, expected);
                }
                other => panic!("unexpected error {other:?}"),
            }
        }
    }

    #[test]
    fn overflow_switch_reaches_player_collectors() {
        let config = WorldConfig {
            collector_overflow: true,
            ..small_config()
        };
        let mut world = World::new(&config).expect("config is valid");
        let mut events = Vec::new();
        let cell = CellCoord::new(2, 2);

        apply(
            &mut world,
            Command::BuildStructure {
                cell,
                kind: StructureKind::Collector,
            },
            &mut events,
        )
        .expect("build succeeds");
        apply(&mut world, Command::InjectFlux { cell, amount: 500.0 }, &mut events)
            .expect("injection succeeds");
        events.clear();
        apply(&mut world, Command::Tick { tick: 1 }, &mut events).expect("tick succeeds");

        assert!(events.contains(&Event::StructureDestroyed {
            cell,
            kind: StructureKind::Collector,
            cause: DestructionCause::Overflow,
        }));
        assert_eq!(query::occupant_at(&world, cell), None);
    }

    #[test]
    fn upgrade_snapshots_follow_the_table() {
        let world = World::new(&small_config()).expect("config is valid");

        let upgrades = query::upgrades(&world, Upgradeable::Collector).expect("table resolves");

        assert_eq!(upgrades.len(), 4);
        assert!(upgrades
            .iter()
            .all(|upgrade| upgrade.level == 0 && (upgrade.next_cost - 10.0).abs() < 1e-9));
        let capacity = upgrades
            .iter()
            .find(|upgrade| upgrade.stat == StatName::Capacity)
            .expect("collectors have a capacity");
        assert!(capacity.at_max_level);
    }
}
