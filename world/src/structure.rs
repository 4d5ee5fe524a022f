//! Occupant behaviour for every structure kind.
//!
//! The variant set is closed, so every operation dispatches with an exhaustive
//! `match`. Structures never hold flux themselves; they read and write the
//! flux of the cell that owns them and, for absorbers and producers, of
//! nearby cells.

use flux_harvest_core::{
    CellCoord, EmissionShape, EmissionWindow, ProducerConfig, StatName, StructureKind, Upgradeable,
};
use flux_harvest_system_economy::{Economy, EconomyError};
use rand::Rng;

use crate::{cell::Cell, grid::Grid, grid::GridView};

/// Offsets covering a cell and its eight compass neighbours.
pub const NEIGHBOURHOOD: [(i32, i32); 9] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 0),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Offsets covering the eight compass neighbours without the cell itself.
pub const SURROUNDING: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Offsets covering the four orthogonal neighbours.
pub const ORTHOGONAL: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Ticks between bombard bursts.
const BOMBARD_PERIOD: u64 = 5;
/// Ticks between surge opportunities.
const SURGE_PERIOD: u64 = 10;

/// Structure occupying a single cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Structure {
    /// Player-built harvester.
    Collector(Collector),
    /// Player-built harvester that also drains adjacent collectors.
    Absorber,
    /// Fixture that blocks diffusion.
    Wall,
    /// Fixture that injects flux.
    FluxProducer(FluxProducer),
}

/// Collector settings.
///
/// Overflow destruction is off by default. Enabling it also switches
/// integrity to the capacity-based gauge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Collector {
    overflow: bool,
}

impl Collector {
    /// Collector that never overflows.
    #[must_use]
    pub const fn new() -> Self {
        Self { overflow: false }
    }

    /// Collector destroyed once its cell holds more flux than its capacity.
    #[must_use]
    pub const fn with_overflow() -> Self {
        Self { overflow: true }
    }

    /// Reports whether capacity-based destruction is active.
    #[must_use]
    pub const fn overflow_enabled(self) -> bool {
        self.overflow
    }
}

/// Flux producer fixture.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FluxProducer {
    config: ProducerConfig,
}

/// Flux injected by a producer during the generate phase.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Emission {
    /// Cell hosting the producer.
    pub producer: CellCoord,
    /// Cell receiving the flux.
    pub target: CellCoord,
    /// Amount of flux added to the target.
    pub amount: f64,
}

/// Parameters shared by every pull computation within one diffuse phase.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PullRules {
    /// Weight granted to every unrestricted target, the source included.
    pub base_weight: f64,
    /// Staged flux at which a collector stops pulling from its neighbours.
    pub collector_capacity: f64,
}

impl Structure {
    /// Default player structure for a kind; `None` for fixtures.
    #[must_use]
    pub const fn for_player(kind: StructureKind) -> Option<Self> {
        match kind {
            StructureKind::Collector => Some(Self::Collector(Collector::new())),
            StructureKind::Absorber => Some(Self::Absorber),
            StructureKind::Wall | StructureKind::FluxProducer => None,
        }
    }

    /// Producer fixture with the provided configuration.
    #[must_use]
    pub const fn producer(config: ProducerConfig) -> Self {
        Self::FluxProducer(FluxProducer::new(config))
    }

    /// Kind tag of the structure.
    #[must_use]
    pub const fn kind(&self) -> StructureKind {
        match self {
            Self::Collector(_) => StructureKind::Collector,
            Self::Absorber => StructureKind::Absorber,
            Self::Wall => StructureKind::Wall,
            Self::FluxProducer(_) => StructureKind::FluxProducer,
        }
    }

    /// Reports whether the structure may be replaced or removed by the player.
    #[must_use]
    pub const fn can_be_built_over(&self) -> bool {
        self.kind().can_be_built_over()
    }

    /// Evaluates the destruction condition checked during the settle phase.
    pub fn ready_to_destroy(&self, flux: f64, economy: &Economy) -> Result<bool, EconomyError> {
        match self {
            Self::Collector(collector) if collector.overflow_enabled() => {
                let capacity = economy.building_stat(Upgradeable::Collector, StatName::Capacity)?;
                Ok(flux > capacity)
            }
            Self::Collector(_) | Self::Absorber | Self::Wall | Self::FluxProducer(_) => Ok(false),
        }
    }

    /// Cosmetic health gauge in `[0, 1]`.
    pub fn integrity(&self, flux: f64, economy: &Economy) -> Result<f64, EconomyError> {
        match self {
            Self::Collector(collector) if collector.overflow_enabled() => {
                let capacity = economy.building_stat(Upgradeable::Collector, StatName::Capacity)?;
                if capacity <= 0.0 {
                    return Ok(1.0);
                }
                Ok((1.0 - flux / capacity).clamp(0.0, 1.0))
            }
            Self::Collector(_) | Self::Absorber | Self::Wall | Self::FluxProducer(_) => Ok(1.0),
        }
    }

    /// Collects the emissions this structure performs on `tick`.
    pub fn generate_flux<R>(
        &self,
        tick: u64,
        cell: &Cell,
        grid: &GridView<'_>,
        rng: &mut R,
        out: &mut Vec<Emission>,
    ) where
        R: Rng + ?Sized,
    {
        match self {
            Self::FluxProducer(producer) => producer.generate_flux(tick, cell, grid, rng, out),
            Self::Collector(_) | Self::Absorber | Self::Wall => {}
        }
    }

    /// Removes flux from the owning cell (and neighbours, for absorbers) and
    /// returns the energy it converts into currency.
    pub fn harvest_energy(
        &self,
        coord: CellCoord,
        grid: &mut Grid,
        economy: &Economy,
    ) -> Result<f64, EconomyError> {
        match self {
            Self::Collector(_) => {
                let rate = economy.building_stat(Upgradeable::Collector, StatName::HarvestRate)?;
                let efficiency =
                    economy.building_stat(Upgradeable::Collector, StatName::Efficiency)?;
                Ok(grid.absorb_at(coord, rate) * efficiency)
            }
            Self::Absorber => {
                let rate = economy.building_stat(Upgradeable::Absorber, StatName::HarvestRate)?;
                let efficiency =
                    economy.building_stat(Upgradeable::Absorber, StatName::Efficiency)?;
                let mut harvested = grid.absorb_at(coord, rate) * efficiency;

                let neighbours = match grid.cell(coord) {
                    Some(cell) => cell.valid_connections(&ORTHOGONAL, &grid.view()),
                    None => Vec::new(),
                };
                for neighbour in neighbours {
                    let is_collector = grid
                        .cell(neighbour)
                        .and_then(Cell::kind)
                        .is_some_and(|kind| kind == StructureKind::Collector);
                    if is_collector {
                        harvested += grid.absorb_at(neighbour, rate) * efficiency;
                    }
                }
                Ok(harvested)
            }
            Self::Wall | Self::FluxProducer(_) => Ok(0.0),
        }
    }
}

impl FluxProducer {
    /// Creates a producer with the provided configuration.
    #[must_use]
    pub const fn new(config: ProducerConfig) -> Self {
        Self { config }
    }

    /// Configuration driving the producer.
    #[must_use]
    pub const fn config(&self) -> &ProducerConfig {
        &self.config
    }

    fn generate_flux<R>(
        &self,
        tick: u64,
        cell: &Cell,
        grid: &GridView<'_>,
        rng: &mut R,
        out: &mut Vec<Emission>,
    ) where
        R: Rng + ?Sized,
    {
        let flux_per_tick = self.config.flux_per_tick.max(0.0);
        let origin = cell.coord();

        match self.config.shape {
            EmissionShape::Bombard => {
                if tick % BOMBARD_PERIOD == 1 {
                    if let Some(target) = self.pick_target(origin, grid, rng) {
                        out.push(Emission {
                            producer: origin,
                            target,
                            amount: flux_per_tick * BOMBARD_PERIOD as f64,
                        });
                    }
                }

                if tick % SURGE_PERIOD == 1
                    && self.config.surge_chance > 0.0
                    && rng.gen::<f64>() < self.config.surge_chance
                {
                    if let Some(target) = self.pick_target(origin, grid, rng) {
                        out.push(Emission {
                            producer: origin,
                            target,
                            amount: flux_per_tick * SURGE_PERIOD as f64,
                        });
                    }
                }
            }
            EmissionShape::Fountain => {
                let targets = cell.valid_connections(&SURROUNDING, grid);
                if targets.is_empty() || flux_per_tick == 0.0 {
                    return;
                }
                let share = flux_per_tick / targets.len() as f64;
                out.extend(targets.into_iter().map(|target| Emission {
                    producer: origin,
                    target,
                    amount: share,
                }));
            }
        }
    }

    fn pick_target<R>(&self, origin: CellCoord, grid: &GridView<'_>, rng: &mut R) -> Option<CellCoord>
    where
        R: Rng + ?Sized,
    {
        let (rows, columns) = grid.dimensions();
        if rows == 0 || columns == 0 {
            return None;
        }

        let (row_range, column_range) = match self.config.window {
            EmissionWindow::Global => ((0, rows - 1), (0, columns - 1)),
            EmissionWindow::Around { radius } => (
                clipped_span(origin.row(), radius, rows),
                clipped_span(origin.column(), radius, columns),
            ),
        };

        let row = rng.gen_range(row_range.0..=row_range.1);
        let column = rng.gen_range(column_range.0..=column_range.1);
        Some(CellCoord::new(row, column))
    }
}

fn clipped_span(centre: u32, radius: u32, length: u32) -> (u32, u32) {
    let last = length - 1;
    let centre = centre.min(last);
    (
        centre.saturating_sub(radius),
        centre.saturating_add(radius).min(last),
    )
}

/// Weight with which `receiver` pulls flux out of `source` during diffusion.
///
/// Self-retention is handled by the caller; this resolves the rules between
/// two distinct cells from their occupants alone.
#[must_use]
pub fn pull_weight(
    receiver: Option<StructureKind>,
    receiver_staged: f64,
    source: Option<StructureKind>,
    rules: PullRules,
) -> f64 {
    match (receiver, source) {
        (Some(StructureKind::Wall), _) | (_, Some(StructureKind::Wall)) => 0.0,
        (Some(StructureKind::Collector), _) if receiver_staged >= rules.collector_capacity => 0.0,
        (Some(StructureKind::Collector), Some(StructureKind::Collector)) => rules.base_weight,
        (_, Some(StructureKind::Collector)) => 0.0,
        _ => rules.base_weight,
    }
}
