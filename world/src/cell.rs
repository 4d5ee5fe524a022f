//! Single grid position and its optional occupant.

use flux_harvest_core::{CellCoord, StructureKind};
use flux_harvest_system_economy::{Economy, EconomyError};

use crate::{
    grid::GridView,
    structure::{pull_weight, PullRules, Structure},
};

/// One grid position holding flux and at most one structure.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    coord: CellCoord,
    flux: f64,
    staged: f64,
    occupant: Option<Structure>,
}

impl Cell {
    pub(crate) const fn new(coord: CellCoord) -> Self {
        Self {
            coord,
            flux: 0.0,
            staged: 0.0,
            occupant: None,
        }
    }

    /// Position of the cell within its grid.
    #[must_use]
    pub const fn coord(&self) -> CellCoord {
        self.coord
    }

    /// Settled flux held by the cell.
    #[must_use]
    pub const fn flux(&self) -> f64 {
        self.flux
    }

    /// Flux snapshotted at the start phase; meaningful only while diffusing.
    #[must_use]
    pub const fn staged(&self) -> f64 {
        self.staged
    }

    /// Structure occupying the cell, if any.
    #[must_use]
    pub const fn occupant(&self) -> Option<&Structure> {
        self.occupant.as_ref()
    }

    /// Kind of the occupying structure, if any.
    #[must_use]
    pub fn kind(&self) -> Option<StructureKind> {
        self.occupant.as_ref().map(Structure::kind)
    }

    /// Reports whether a structure may be placed here.
    #[must_use]
    pub fn can_be_built_on(&self) -> bool {
        self.occupant
            .as_ref()
            .map_or(true, Structure::can_be_built_over)
    }

    /// Replaces the occupant. Returns `false` and leaves the cell untouched
    /// when the current occupant cannot be built over.
    pub fn build_structure(&mut self, structure: Structure) -> bool {
        if !self.can_be_built_on() {
            return false;
        }
        self.occupant = Some(structure);
        true
    }

    /// Clears the occupant, returning it.
    pub fn destroy_structure(&mut self) -> Option<Structure> {
        self.occupant.take()
    }

    /// Removes up to `amount` flux and returns what was actually removed.
    pub fn absorb_energy(&mut self, amount: f64) -> f64 {
        let absorbed = if amount > 0.0 {
            amount.min(self.flux)
        } else {
            0.0
        };
        self.flux = (self.flux - absorbed).max(0.0);
        absorbed
    }

    /// Cosmetic integrity gauge of the occupant; bare ground reports 1.
    pub fn building_integrity(&self, economy: &Economy) -> Result<f64, EconomyError> {
        match &self.occupant {
            Some(structure) => structure.integrity(self.flux, economy),
            None => Ok(1.0),
        }
    }

    /// In-bounds cells at the given offsets that are not walls.
    #[must_use]
    pub fn valid_connections(&self, offsets: &[(i32, i32)], grid: &GridView<'_>) -> Vec<CellCoord> {
        offsets
            .iter()
            .filter_map(|&(row_delta, column_delta)| self.coord.offset(row_delta, column_delta))
            .filter_map(|coord| grid.cell(coord))
            .filter(|cell| cell.kind() != Some(StructureKind::Wall))
            .map(Cell::coord)
            .collect()
    }

    /// Weight with which this cell pulls flux out of `source`.
    #[must_use]
    pub fn pull_amount(&self, source: &Cell, rules: PullRules) -> f64 {
        if self.coord == source.coord {
            return rules.base_weight;
        }
        pull_weight(self.kind(), self.staged, source.kind(), rules)
    }

    pub(crate) fn add_flux(&mut self, amount: f64) {
        if amount > 0.0 {
            self.flux += amount;
        }
    }

    pub(crate) fn stage(&mut self) {
        self.staged = self.flux;
        self.flux = 0.0;
    }

    pub(crate) fn clear_staged(&mut self) {
        self.staged = 0.0;
    }

    pub(crate) fn decay(&mut self, amount: f64) {
        self.flux = (self.flux - amount).max(0.0);
    }
}
