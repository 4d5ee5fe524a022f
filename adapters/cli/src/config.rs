//! Scenario files describing the world, its upgrade table and scripted player input.

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, Result};
use flux_harvest_core::{CellCoord, StatName, StructureKind, Upgradeable};
use flux_harvest_system_builder::BuilderInput;
use flux_harvest_system_economy::UpgradeTable;
use flux_harvest_world::WorldConfig;
use serde::Deserialize;

const DEFAULT_TICKS: u64 = 100;
const DEFAULT_FRAME_EVERY: u64 = 25;

/// Contents of a scenario TOML file. Every section is optional.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ScenarioFile {
    pub(crate) ticks: Option<u64>,
    pub(crate) frame_every: Option<u64>,
    pub(crate) world: WorldConfig,
    pub(crate) upgrades: BTreeMap<Upgradeable, BTreeMap<StatName, Vec<f64>>>,
    pub(crate) plan: Vec<PlannedInput>,
}

/// Player input injected right before the given tick runs.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PlannedInput {
    pub(crate) tick: u64,
    #[serde(default)]
    pub(crate) select: Option<StructureKind>,
    #[serde(default)]
    pub(crate) click: Option<CellCoord>,
    #[serde(default)]
    pub(crate) upgrade: Option<PlannedUpgrade>,
}

/// Upgrade button press.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PlannedUpgrade {
    pub(crate) building: Upgradeable,
    pub(crate) stat: StatName,
}

impl PlannedInput {
    pub(crate) fn to_builder_input(self) -> BuilderInput {
        BuilderInput {
            click: self.click,
            select: self.select,
            upgrade: self.upgrade.map(|upgrade| (upgrade.building, upgrade.stat)),
        }
    }
}

/// Command-line values that take precedence over the scenario file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Overrides {
    pub(crate) ticks: Option<u64>,
    pub(crate) frame_every: Option<u64>,
    pub(crate) seed: Option<u64>,
    pub(crate) rows: Option<u32>,
    pub(crate) columns: Option<u32>,
}

/// Fully resolved run settings.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Scenario {
    pub(crate) ticks: u64,
    pub(crate) frame_every: u64,
    pub(crate) world: WorldConfig,
    pub(crate) table: UpgradeTable,
    pub(crate) plan: Vec<PlannedInput>,
}

impl ScenarioFile {
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario file at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("invalid scenario file at {}", path.display()))
    }

    pub(crate) fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse scenario toml contents")
    }

    /// Applies command-line overrides and layers custom ladders over the default table.
    pub(crate) fn resolve(self, overrides: Overrides) -> Result<Scenario> {
        let mut world = self.world;
        if let Some(seed) = overrides.seed {
            world.seed = seed;
        }
        if let Some(rows) = overrides.rows {
            world.rows = rows;
        }
        if let Some(columns) = overrides.columns {
            world.columns = columns;
        }

        let mut table = UpgradeTable::default();
        for (building, stats) in self.upgrades {
            for (stat, ladder) in stats {
                table = table
                    .with_ladder(building, stat, ladder)
                    .with_context(|| format!("invalid `{stat}` ladder for `{building}`"))?;
            }
        }

        let mut plan = self.plan;
        plan.sort_by_key(|input| input.tick);

        Ok(Scenario {
            ticks: overrides.ticks.or(self.ticks).unwrap_or(DEFAULT_TICKS),
            frame_every: overrides
                .frame_every
                .or(self.frame_every)
                .unwrap_or(DEFAULT_FRAME_EVERY)
                .max(1),
            world,
            table,
            plan,
        })
    }
}

#[cfg(test)]
mod tests {
    use flux_harvest_core::{EmissionShape, EmissionWindow};

    use super::*;

    const SAMPLE: &str = r#"
ticks = 40
frame_every = 10

[world]
rows = 12
columns = 16
seed = 99
walls = [{ row = 2, column = 3 }]

[[world.producers]]
cell = { row = 6, column = 8 }
config = { shape = "fountain", flux_per_tick = 4.0, window = { around = { radius = 3 } } }

[upgrades.collector]
capacity = [10.0, 20.0, 40.0]

[[plan]]
tick = 5
click = { row = 6, column = 9 }

[[plan]]
tick = 2
select = "absorber"
upgrade = { building = "board", stat = "harvestRate" }
"#;

    #[test]
    fn sample_scenario_parses_every_section() {
        let file = ScenarioFile::parse(SAMPLE).expect("sample parses");

        assert_eq!(file.ticks, Some(40));
        assert_eq!(file.world.rows, 12);
        assert_eq!(file.world.walls, vec![CellCoord::new(2, 3)]);
        let producer = file.world.producers[0];
        assert_eq!(producer.config.shape, EmissionShape::Fountain);
        assert_eq!(producer.config.window, EmissionWindow::Around { radius: 3 });
        assert_eq!(producer.config.surge_chance, 0.0);
        assert_eq!(file.plan.len(), 2);
    }

    #[test]
    fn resolve_layers_overrides_and_sorts_plan() {
        let file = ScenarioFile::parse(SAMPLE).expect("sample parses");

        let scenario = file
            .resolve(Overrides {
                ticks: Some(8),
                seed: Some(1),
                ..Overrides::default()
            })
            .expect("scenario resolves");

        assert_eq!(scenario.ticks, 8);
        assert_eq!(scenario.frame_every, 10);
        assert_eq!(scenario.world.seed, 1);
        assert_eq!(scenario.world.columns, 16);
        assert_eq!(
            scenario.table.ladder(Upgradeable::Collector, StatName::Capacity),
            Some(&[10.0, 20.0, 40.0][..])
        );
        assert_eq!(
            scenario.table.ladder(Upgradeable::Absorber, StatName::NumOwned),
            Some(&[5.0][..])
        );
        let ticks: Vec<u64> = scenario.plan.iter().map(|input| input.tick).collect();
        assert_eq!(ticks, vec![2, 5]);
        assert_eq!(
            scenario.plan[0].to_builder_input().upgrade,
            Some((Upgradeable::Board, StatName::HarvestRate))
        );
    }

    #[test]
    fn empty_file_falls_back_to_defaults() {
        let scenario = ScenarioFile::parse("")
            .expect("empty file parses")
            .resolve(Overrides::default())
            .expect("defaults resolve");

        assert_eq!(scenario.ticks, DEFAULT_TICKS);
        assert_eq!(scenario.frame_every, DEFAULT_FRAME_EVERY);
        assert_eq!(scenario.world, WorldConfig::default());
        assert_eq!(scenario.table, UpgradeTable::default());
    }

    #[test]
    fn empty_ladder_is_reported() {
        let file = ScenarioFile::parse("[upgrades.absorber]\nefficiency = []\n")
            .expect("syntax is valid");

        let error = file
            .resolve(Overrides::default())
            .expect_err("empty ladders are rejected");

        assert!(format!("{error:#}").contains("efficiency"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(ScenarioFile::parse("tiks = 3\n").is_err());
    }
}
