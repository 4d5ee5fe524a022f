#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Flux Harvest engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values describing what
//! actually happened. Rejected player actions are reported as events rather
//! than errors so the tick loop is never interrupted by user mistakes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Flux Harvest.";

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Advances the simulation by exactly one tick.
    Tick {
        /// Monotonically increasing tick counter supplied by the driver.
        tick: u64,
    },
    /// Requests construction of a player structure on the provided cell.
    BuildStructure {
        /// Cell that should receive the structure.
        cell: CellCoord,
        /// Kind of structure requested by the player.
        kind: StructureKind,
    },
    /// Requests removal of the structure occupying the provided cell.
    DestroyStructure {
        /// Cell whose occupant should be removed.
        cell: CellCoord,
    },
    /// Requests purchase of the next level of an upgrade.
    BuyUpgrade {
        /// Building family that owns the upgrade.
        building: Upgradeable,
        /// Stat raised by the upgrade.
        stat: StatName,
    },
    /// Adds flux directly into a cell, bypassing producers.
    InjectFlux {
        /// Cell receiving the flux.
        cell: CellCoord,
        /// Non-negative amount of flux to add.
        amount: f64,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Reports that a producer injected flux into a cell during the generate phase.
    FluxEmitted {
        /// Cell hosting the emitting producer.
        producer: CellCoord,
        /// Cell that received the flux.
        target: CellCoord,
        /// Amount of flux added to the target.
        amount: f64,
    },
    /// Confirms that a tick ran to completion.
    TickCompleted {
        /// Tick counter supplied by the driver.
        tick: u64,
        /// Energy harvested across the grid during the tick.
        harvested: f64,
        /// Player currency after the harvest was credited.
        currency: f64,
    },
    /// Confirms that a structure was placed into the world.
    StructureBuilt {
        /// Cell now occupied by the structure.
        cell: CellCoord,
        /// Kind of structure that was placed.
        kind: StructureKind,
        /// Kind of structure that was replaced, if any.
        replaced: Option<StructureKind>,
    },
    /// Confirms that a structure was removed from the world.
    StructureDestroyed {
        /// Cell previously occupied by the structure.
        cell: CellCoord,
        /// Kind of structure that was removed.
        kind: StructureKind,
        /// Reason the structure was removed.
        cause: DestructionCause,
    },
    /// Reports that a placement request was rejected.
    PlacementRejected {
        /// Cell provided in the placement request.
        cell: CellCoord,
        /// Kind of structure requested for placement.
        kind: StructureKind,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Reports that a removal request was rejected.
    RemovalRejected {
        /// Cell provided in the removal request.
        cell: CellCoord,
        /// Specific reason the removal failed.
        reason: RemovalError,
    },
    /// Confirms that an upgrade was purchased.
    UpgradePurchased {
        /// Building family that owns the upgrade.
        building: Upgradeable,
        /// Stat raised by the upgrade.
        stat: StatName,
        /// Level reached after the purchase.
        level: u32,
        /// Currency deducted for the purchase.
        cost: f64,
    },
    /// Reports that an upgrade purchase was rejected without side effects.
    UpgradeRejected {
        /// Building family that owns the upgrade.
        building: Upgradeable,
        /// Stat targeted by the purchase.
        stat: StatName,
        /// Specific reason the purchase failed.
        reason: UpgradeRejection,
    },
}

/// Location of a single grid cell expressed as row and column indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    row: u32,
    column: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Applies a signed offset, returning `None` when either axis would become negative.
    ///
    /// Upper bounds are not checked here; the grid owns its dimensions.
    #[must_use]
    pub fn offset(self, row_delta: i32, column_delta: i32) -> Option<Self> {
        let row = self.row.checked_add_signed(row_delta)?;
        let column = self.column.checked_add_signed(column_delta)?;
        Some(Self::new(row, column))
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// Kinds of structure that may occupy a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureKind {
    /// Harvests flux and pulls surplus toward other collectors.
    Collector,
    /// Harvests from itself and from orthogonally adjacent collectors.
    Absorber,
    /// Blocks diffusion and harvest entirely.
    Wall,
    /// Periodically injects flux into the grid.
    FluxProducer,
}

impl StructureKind {
    /// Reports whether a player may replace or remove this kind of structure.
    #[must_use]
    pub const fn can_be_built_over(self) -> bool {
        match self {
            Self::Collector | Self::Absorber => true,
            Self::Wall | Self::FluxProducer => false,
        }
    }

    /// Reports whether players may construct this kind of structure.
    ///
    /// Walls and producers are world fixtures placed during setup only.
    #[must_use]
    pub const fn is_player_buildable(self) -> bool {
        self.can_be_built_over()
    }

    /// Upgrade family whose stats govern this kind, if any.
    #[must_use]
    pub const fn upgradeable(self) -> Option<Upgradeable> {
        match self {
            Self::Collector => Some(Upgradeable::Collector),
            Self::Absorber => Some(Upgradeable::Absorber),
            Self::Wall | Self::FluxProducer => None,
        }
    }

    /// Stable lowercase name used in logs and configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Collector => "collector",
            Self::Absorber => "absorber",
            Self::Wall => "wall",
            Self::FluxProducer => "flux_producer",
        }
    }
}

impl fmt::Display for StructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Building families that own entries in the upgrade table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Upgradeable {
    /// The bare board itself; governs passive harvest from unoccupied cells.
    Board,
    /// Collector structures.
    Collector,
    /// Absorber structures.
    Absorber,
}

impl Upgradeable {
    /// Every building family in display order.
    pub const ALL: [Self; 3] = [Self::Board, Self::Collector, Self::Absorber];

    /// Stable lowercase name used in logs and configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Board => "board",
            Self::Collector => "collector",
            Self::Absorber => "absorber",
        }
    }
}

impl fmt::Display for Upgradeable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stats that can be raised through upgrades.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatName {
    /// Amount of flux absorbed per harvest.
    HarvestRate,
    /// Fraction of absorbed flux converted into currency.
    Efficiency,
    /// Flux ceiling above which a collector stops pulling from neighbours.
    Capacity,
    /// Maximum number of simultaneously placed structures.
    NumOwned,
}

impl StatName {
    /// Every stat in table order.
    pub const ALL: [Self; 4] = [
        Self::NumOwned,
        Self::HarvestRate,
        Self::Efficiency,
        Self::Capacity,
    ];

    /// Stable camel-case name used in logs and configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HarvestRate => "harvestRate",
            Self::Efficiency => "efficiency",
            Self::Capacity => "capacity",
            Self::NumOwned => "numOwned",
        }
    }
}

impl fmt::Display for StatName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pattern used by a producer to distribute its emission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmissionShape {
    /// Periodic bursts dropped on a random cell of the emission window.
    Bombard,
    /// Continuous trickle spread evenly over the producer's neighbours.
    Fountain,
}

/// Region from which a bombarding producer selects its targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmissionWindow {
    /// Any cell of the grid.
    Global,
    /// Cells within `radius` rows and columns of the producer, clipped to the grid.
    Around {
        /// Half-width of the square window measured in cells.
        radius: u32,
    },
}

/// Configuration carried by a flux producer fixture.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    /// Emission pattern.
    pub shape: EmissionShape,
    /// Average flux emitted per tick.
    pub flux_per_tick: f64,
    /// Target window for bombard emissions.
    pub window: EmissionWindow,
    /// Probability in `[0, 1]` of an additional surge every tenth tick.
    pub surge_chance: f64,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            shape: EmissionShape::Bombard,
            flux_per_tick: 20.0,
            window: EmissionWindow::Around { radius: 2 },
            surge_chance: 0.0,
        }
    }
}

/// Reason a structure left the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DestructionCause {
    /// The player removed or replaced the structure.
    Player,
    /// The structure exceeded its flux capacity during the settle phase.
    Overflow,
}

/// Reasons a placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementError {
    /// The requested cell lies outside the grid.
    OutOfBounds,
    /// The requested kind is a world fixture that players cannot construct.
    NotBuildable,
    /// The cell hosts a fixture that cannot be built over.
    Protected,
    /// Every slot allowed by the current `numOwned` level is in use.
    CapReached,
}

/// Reasons a removal request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemovalError {
    /// The requested cell lies outside the grid.
    OutOfBounds,
    /// The cell has no occupant.
    Empty,
    /// The occupant is a fixture that cannot be removed.
    Protected,
}

/// Reasons an upgrade purchase may be declined.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum UpgradeRejection {
    /// The player cannot afford the next level.
    InsufficientFunds {
        /// Cost of the next level.
        cost: f64,
        /// Currency available at the time of the request.
        available: f64,
    },
    /// The stat already sits at the last level of the table.
    MaxLevel,
}

#[cfg(test)]
mod tests {
    use super::{CellCoord, Command, StatName, StructureKind, Upgradeable};

    #[test]
    fn offset_rejects_negative_coordinates() {
        let origin = CellCoord::new(0, 3);
        assert_eq!(origin.offset(-1, 0), None);
        assert_eq!(origin.offset(1, -1), Some(CellCoord::new(1, 2)));
        assert_eq!(origin.offset(0, -4), None);
    }

    #[test]
    fn fixtures_cannot_be_built_over() {
        assert!(StructureKind::Collector.can_be_built_over());
        assert!(StructureKind::Absorber.can_be_built_over());
        assert!(!StructureKind::Wall.can_be_built_over());
        assert!(!StructureKind::FluxProducer.can_be_built_over());
        assert!(!StructureKind::FluxProducer.is_player_buildable());
    }

    #[test]
    fn only_player_structures_map_to_upgrade_families() {
        assert_eq!(
            StructureKind::Collector.upgradeable(),
            Some(Upgradeable::Collector)
        );
        assert_eq!(
            StructureKind::Absorber.upgradeable(),
            Some(Upgradeable::Absorber)
        );
        assert_eq!(StructureKind::Wall.upgradeable(), None);
        assert_eq!(StructureKind::FluxProducer.upgradeable(), None);
    }

    #[test]
    fn stat_names_use_table_spelling() {
        assert_eq!(StatName::HarvestRate.to_string(), "harvestRate");
        assert_eq!(StatName::NumOwned.to_string(), "numOwned");
        assert_eq!(Upgradeable::Board.to_string(), "board");
    }

    #[test]
    fn build_command_round_trips_through_bincode() {
        let command = Command::BuildStructure {
            cell: CellCoord::new(4, 7),
            kind: StructureKind::Absorber,
        };
        let bytes = bincode::serialize(&command).expect("serialize");
        let restored: Command = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, command);
    }
}
