//! Cell arena and the five-phase tick orchestrator.
//!
//! A tick runs `generate → start → diffuse → harvest → settle`, each phase a
//! full pass over the arena. Diffusion reads only the staged snapshot taken
//! during `start` and writes only settled flux, so the order in which sources
//! are visited never changes the outcome.

use flux_harvest_core::{CellCoord, StatName, StructureKind, Upgradeable};
use flux_harvest_system_economy::{Economy, EconomyError};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;

use crate::{
    cell::Cell,
    ledger,
    structure::{Emission, PullRules, NEIGHBOURHOOD},
    WorldError,
};

/// Tunables shared by every cell of a grid.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    /// Pull weight of every unrestricted diffusion target, the source included.
    pub base_pull_weight: f64,
    /// Flux removed from every bare-ground cell during the settle phase.
    pub passive_decay: f64,
}

impl GridSettings {
    /// Checks that diffusion always has a positive weight and decay never adds flux.
    pub fn validate(&self) -> Result<(), WorldError> {
        if !self.base_pull_weight.is_finite() || self.base_pull_weight <= 0.0 {
            return Err(WorldError::InvalidSetting {
                setting: "base_pull_weight",
                value: self.base_pull_weight,
            });
        }
        if !self.passive_decay.is_finite() || self.passive_decay < 0.0 {
            return Err(WorldError::InvalidSetting {
                setting: "passive_decay",
                value: self.passive_decay,
            });
        }
        Ok(())
    }
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            base_pull_weight: 10.0,
            passive_decay: 0.01,
        }
    }
}

/// Summary of a completed tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    /// Tick counter supplied by the driver.
    pub tick: u64,
    /// Energy harvested across the grid; always non-negative.
    pub harvested: f64,
    /// Flux injected by producers during the generate phase.
    pub emissions: Vec<Emission>,
    /// Structures removed during the settle phase.
    pub destroyed: Vec<(CellCoord, StructureKind)>,
}

/// Read-only view over the cell arena.
#[derive(Clone, Copy, Debug)]
pub struct GridView<'a> {
    rows: u32,
    columns: u32,
    cells: &'a [Cell],
}

impl<'a> GridView<'a> {
    /// Grid dimensions as `(rows, columns)`.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.rows, self.columns)
    }

    /// Cell at the coordinate, if in bounds.
    #[must_use]
    pub fn cell(&self, coord: CellCoord) -> Option<&'a Cell> {
        arena_index(self.rows, self.columns, coord).and_then(|index| self.cells.get(index))
    }

    fn collect_shares(&self, source_index: usize, rules: PullRules, out: &mut Vec<(usize, f64)>) {
        let Some(source) = self.cells.get(source_index) else {
            return;
        };
        if source.kind() == Some(StructureKind::Wall) {
            return;
        }
        let value = source.staged();
        if value <= 0.0 {
            return;
        }

        let mut total_pull = 0.0;
        for coord in source.valid_connections(&NEIGHBOURHOOD, self) {
            let Some(index) = arena_index(self.rows, self.columns, coord) else {
                continue;
            };
            let pull = self.cells[index].pull_amount(source, rules);
            if pull > 0.0 {
                total_pull += pull;
                out.push((index, pull));
            }
        }

        if total_pull <= 0.0 {
            out.clear();
            return;
        }
        for entry in out.iter_mut() {
            entry.1 = value * entry.1 / total_pull;
        }
    }
}

/// Fixed-size rectangular arena of cells.
#[derive(Clone, Debug)]
pub struct Grid {
    rows: u32,
    columns: u32,
    cells: Vec<Cell>,
    settings: GridSettings,
    total_harvested: f64,
    rng: ChaCha8Rng,
}

impl Grid {
    /// Creates an empty grid. `rng` drives producer target selection.
    #[must_use]
    pub fn new(rows: u32, columns: u32, settings: GridSettings, rng: ChaCha8Rng) -> Self {
        let capacity = usize::try_from(u64::from(rows) * u64::from(columns)).unwrap_or(0);
        let mut cells = Vec::with_capacity(capacity);
        for row in 0..rows {
            for column in 0..columns {
                cells.push(Cell::new(CellCoord::new(row, column)));
            }
        }

        Self {
            rows,
            columns,
            cells,
            settings,
            total_harvested: 0.0,
            rng,
        }
    }

    /// Creates an empty grid with default settings and a seeded generator.
    #[must_use]
    pub fn seeded(rows: u32, columns: u32, seed: u64) -> Self {
        Self::new(
            rows,
            columns,
            GridSettings::default(),
            ChaCha8Rng::seed_from_u64(seed),
        )
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Settings the grid was built with.
    #[must_use]
    pub const fn settings(&self) -> &GridSettings {
        &self.settings
    }

    /// Energy harvested since construction.
    #[must_use]
    pub const fn total_harvested(&self) -> f64 {
        self.total_harvested
    }

    /// Sum of settled flux across every cell.
    #[must_use]
    pub fn total_flux(&self) -> f64 {
        self.cells.iter().map(Cell::flux).sum()
    }

    /// Read-only view used for neighbour queries.
    #[must_use]
    pub fn view(&self) -> GridView<'_> {
        GridView {
            rows: self.rows,
            columns: self.columns,
            cells: &self.cells,
        }
    }

    /// Iterator over every cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// Cell at the coordinate, if in bounds.
    #[must_use]
    pub fn cell(&self, coord: CellCoord) -> Option<&Cell> {
        self.index(coord).and_then(|index| self.cells.get(index))
    }

    /// Mutable cell at the coordinate, if in bounds.
    pub fn cell_mut(&mut self, coord: CellCoord) -> Option<&mut Cell> {
        self.index(coord).and_then(|index| self.cells.get_mut(index))
    }

    /// Adds flux to a cell. Returns `false` when the cell is out of bounds
    /// or the amount is not positive.
    pub fn inject_flux(&mut self, coord: CellCoord, amount: f64) -> bool {
        if amount <= 0.0 || !amount.is_finite() {
            return false;
        }
        match self.cell_mut(coord) {
            Some(cell) => {
                cell.add_flux(amount);
                true
            }
            None => false,
        }
    }

    /// Runs every phase of one tick.
    pub fn tick(&mut self, tick: u64, economy: &mut Economy) -> Result<TickReport, EconomyError> {
        let emissions = self.generate(tick);
        self.start();
        self.diffuse(economy)?;
        let harvested = self.harvest(economy)?;
        let destroyed = self.settle(economy)?;

        tracing::debug!(
            target: "flux_harvest::grid",
            tick,
            harvested,
            emissions = emissions.len(),
            destroyed = destroyed.len(),
            total_flux = self.total_flux(),
            "tick.completed"
        );

        Ok(TickReport {
            tick,
            harvested,
            emissions,
            destroyed,
        })
    }

    /// Generate phase: producers inject flux directly into settled values.
    ///
    /// Every producer draws its targets before any flux is applied.
    pub fn generate(&mut self, tick: u64) -> Vec<Emission> {
        let mut emissions = Vec::new();
        let view = GridView {
            rows: self.rows,
            columns: self.columns,
            cells: &self.cells,
        };
        for cell in view.cells {
            if let Some(structure) = cell.occupant() {
                structure.generate_flux(tick, cell, &view, &mut self.rng, &mut emissions);
            }
        }

        for emission in &emissions {
            if let Some(index) = self.index(emission.target) {
                self.cells[index].add_flux(emission.amount);
            }
        }
        emissions
    }

    /// Start phase: snapshot flux into the staged value and zero the flux.
    pub fn start(&mut self) {
        for cell in &mut self.cells {
            cell.stage();
        }
    }

    /// Diffuse phase: redistribute every staged value over its neighbourhood.
    pub fn diffuse(&mut self, economy: &Economy) -> Result<(), EconomyError> {
        let rules = self.pull_rules(economy)?;
        let mut shares = Vec::with_capacity(NEIGHBOURHOOD.len());
        for source in 0..self.cells.len() {
            shares.clear();
            self.view().collect_shares(source, rules, &mut shares);
            for &(target, share) in &shares {
                self.cells[target].add_flux(share);
            }
        }
        Ok(())
    }

    /// Shares the diffuse phase would hand out from `source`'s staged value.
    pub fn diffusion_shares(
        &self,
        source: CellCoord,
        economy: &Economy,
    ) -> Result<Vec<(CellCoord, f64)>, EconomyError> {
        let rules = self.pull_rules(economy)?;
        let Some(index) = self.index(source) else {
            return Ok(Vec::new());
        };
        let mut shares = Vec::new();
        self.view().collect_shares(index, rules, &mut shares);
        Ok(shares
            .into_iter()
            .map(|(target, share)| (self.cells[target].coord(), share))
            .collect())
    }

    /// Harvest phase: every occupant, or bare ground, converts flux into energy.
    pub fn harvest(&mut self, economy: &Economy) -> Result<f64, EconomyError> {
        let board_rate = economy.building_stat(Upgradeable::Board, StatName::HarvestRate)?;
        let board_efficiency = economy.building_stat(Upgradeable::Board, StatName::Efficiency)?;

        let mut harvested = 0.0;
        for index in 0..self.cells.len() {
            let (coord, occupant) = {
                let cell = &self.cells[index];
                (cell.coord(), cell.occupant().copied())
            };
            harvested += match occupant {
                Some(structure) => structure.harvest_energy(coord, self, economy)?,
                None => self.cells[index].absorb_energy(board_rate) * board_efficiency,
            };
        }

        self.total_harvested += harvested;
        Ok(harvested)
    }

    /// Settle phase: clear staged values, destroy failing structures, and
    /// decay bare ground.
    pub fn settle(
        &mut self,
        economy: &mut Economy,
    ) -> Result<Vec<(CellCoord, StructureKind)>, EconomyError> {
        let decay = self.settings.passive_decay.max(0.0);
        let mut destroyed = Vec::new();

        for cell in &mut self.cells {
            cell.clear_staged();
            match cell.occupant().copied() {
                Some(structure) => {
                    if structure.ready_to_destroy(cell.flux(), economy)? {
                        if let Some(removed) = ledger::destroy_structure(economy, cell)? {
                            tracing::info!(
                                target: "flux_harvest::grid",
                                cell = %cell.coord(),
                                kind = %removed.kind(),
                                flux = cell.flux(),
                                "structure.overflowed"
                            );
                            destroyed.push((cell.coord(), removed.kind()));
                        }
                    }
                }
                None => cell.decay(decay),
            }
        }
        Ok(destroyed)
    }

    pub(crate) fn absorb_at(&mut self, coord: CellCoord, amount: f64) -> f64 {
        self.cell_mut(coord)
            .map_or(0.0, |cell| cell.absorb_energy(amount))
    }

    fn pull_rules(&self, economy: &Economy) -> Result<PullRules, EconomyError> {
        Ok(PullRules {
            base_weight: self.settings.base_pull_weight,
            collector_capacity: economy.building_stat(Upgradeable::Collector, StatName::Capacity)?,
        })
    }

    fn index(&self, coord: CellCoord) -> Option<usize> {
        arena_index(self.rows, self.columns, coord)
    }
}

fn arena_index(rows: u32, columns: u32, coord: CellCoord) -> Option<usize> {
    if coord.row() < rows && coord.column() < columns {
        let row = usize::try_from(coord.row()).ok()?;
        let column = usize::try_from(coord.column()).ok()?;
        let width = usize::try_from(columns).ok()?;
        Some(row * width + column)
    } else {
        None
    }
}
