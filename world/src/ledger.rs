//! Paired cell and economy mutations for building and destroying structures.
//!
//! Every change to a cell's occupant goes through these helpers so the
//! economy's placed counts always match what sits on the grid.

use flux_harvest_core::{PlacementError, StructureKind};
use flux_harvest_system_economy::{Economy, EconomyError};

use crate::{cell::Cell, structure::Structure};

/// Result of a placement attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The structure now occupies the cell.
    Built {
        /// Player structure that was replaced, if any.
        replaced: Option<StructureKind>,
    },
    /// The cell and ledger are unchanged.
    Rejected(PlacementError),
}

/// Places `structure` on `cell`, replacing any player structure already there.
///
/// Fixtures on the cell reject the placement. Replacing a structure of the
/// same family never fails on the cap since its slot is released first.
pub fn build_structure(
    economy: &mut Economy,
    cell: &mut Cell,
    structure: Structure,
) -> Result<BuildOutcome, EconomyError> {
    if !cell.can_be_built_on() {
        return Ok(BuildOutcome::Rejected(PlacementError::Protected));
    }

    let kind = structure.kind();
    let replaced = cell.kind();
    let frees_slot = replaced.is_some_and(|existing| existing.upgradeable() == kind.upgradeable());
    if !frees_slot && !economy.can_place_structure(kind)? {
        return Ok(BuildOutcome::Rejected(PlacementError::CapReached));
    }

    if let Some(existing) = replaced {
        economy.register_removal(existing)?;
    }
    if !cell.build_structure(structure) {
        return Ok(BuildOutcome::Rejected(PlacementError::Protected));
    }
    let registered = economy.register_placement(kind)?;
    debug_assert!(registered, "cap was checked before placement");

    tracing::debug!(
        target: "flux_harvest::ledger",
        cell = %cell.coord(),
        kind = %kind,
        replaced = ?replaced,
        "structure.built"
    );
    Ok(BuildOutcome::Built { replaced })
}

/// Clears `cell`, returning the structure that occupied it.
///
/// Fixtures are cleared too; callers decide whether the player may do so.
pub fn destroy_structure(
    economy: &mut Economy,
    cell: &mut Cell,
) -> Result<Option<Structure>, EconomyError> {
    let Some(kind) = cell.kind() else {
        return Ok(None);
    };
    economy.register_removal(kind)?;
    let removed = cell.destroy_structure();
    tracing::debug!(
        target: "flux_harvest::ledger",
        cell = %cell.coord(),
        kind = %kind,
        "structure.destroyed"
    );
    Ok(removed)
}
