#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure builder system translating player clicks into structure and upgrade commands.

use flux_harvest_core::{CellCoord, Command, StatName, StructureKind, Upgradeable};

/// Input snapshot distilled from adapter-provided frame input data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuilderInput {
    /// Cell clicked by the player on this frame.
    pub click: Option<CellCoord>,
    /// Structure kind chosen in the building selector on this frame.
    pub select: Option<StructureKind>,
    /// Upgrade button pressed on this frame.
    pub upgrade: Option<(Upgradeable, StatName)>,
}

impl BuilderInput {
    /// Input describing a single click on a cell.
    #[must_use]
    pub const fn click(cell: CellCoord) -> Self {
        Self {
            click: Some(cell),
            select: None,
            upgrade: None,
        }
    }
}

/// Builder system tracking the structure kind currently selected by the player.
#[derive(Debug, Clone)]
pub struct Builder {
    selected: StructureKind,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// Creates a builder with collectors selected.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            selected: StructureKind::Collector,
        }
    }

    /// Structure kind placed by the next click.
    #[must_use]
    pub const fn selected(&self) -> StructureKind {
        self.selected
    }

    /// Changes the selection. Fixtures cannot be selected; returns whether
    /// the selection changed.
    pub fn select(&mut self, kind: StructureKind) -> bool {
        if !kind.is_player_buildable() || kind == self.selected {
            return false;
        }
        self.selected = kind;
        true
    }

    /// Consumes adapter input to emit builder commands.
    ///
    /// The `occupant_at` closure should mirror the world's `query::occupant_at`
    /// helper. Clicking a cell that already holds the selected kind removes
    /// it; clicking a fixture does nothing; anything else requests placement
    /// and leaves cap checks to the world.
    pub fn handle<F>(&mut self, input: BuilderInput, mut occupant_at: F, out: &mut Vec<Command>)
    where
        F: FnMut(CellCoord) -> Option<StructureKind>,
    {
        if let Some(kind) = input.select {
            let _ = self.select(kind);
        }

        if let Some(cell) = input.click {
            match occupant_at(cell) {
                Some(kind) if kind == self.selected => {
                    out.push(Command::DestroyStructure { cell });
                }
                Some(kind) if !kind.can_be_built_over() => {}
                _ => out.push(Command::BuildStructure {
                    cell,
                    kind: self.selected,
                }),
            }
        }

        if let Some((building, stat)) = input.upgrade {
            out.push(Command::BuyUpgrade { building, stat });
        }
    }
}
