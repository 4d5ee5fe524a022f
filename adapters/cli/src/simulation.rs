//! Driver loop feeding scripted input and ticks into the world.

use std::collections::VecDeque;

use anyhow::{Context, Result};
use flux_harvest_core::{Command, Event};
use flux_harvest_rendering::{CellVisual, FrameControl, Scene};
use flux_harvest_system_builder::Builder;
use flux_harvest_system_economy::Economy;
use flux_harvest_world::{self as world, query, World};

use crate::config::{PlannedInput, Scenario};

/// Owns the world and replays a scenario one tick per frame.
#[derive(Debug)]
pub(crate) struct Simulation {
    world: World,
    builder: Builder,
    plan: VecDeque<PlannedInput>,
    next_tick: u64,
    last_tick: u64,
    frame_every: u64,
}

impl Simulation {
    pub(crate) fn new(scenario: Scenario) -> Result<Self> {
        let economy = Economy::new(scenario.table, scenario.world.starting_currency);
        let world = World::with_economy(&scenario.world, economy)
            .context("failed to build world from scenario")?;
        Ok(Self {
            world,
            builder: Builder::default(),
            plan: scenario.plan.into(),
            next_tick: 1,
            last_tick: scenario.ticks,
            frame_every: scenario.frame_every.max(1),
        })
    }

    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    /// Runs the next tick and refreshes `scene` when a frame is due.
    pub(crate) fn advance(&mut self, scene: &mut Scene) -> Result<FrameControl> {
        if self.next_tick > self.last_tick {
            return Ok(FrameControl::Exit);
        }
        let tick = self.next_tick;
        self.next_tick += 1;

        let mut commands = Vec::new();
        while let Some(input) = self.plan.front().copied() {
            if input.tick > tick {
                break;
            }
            let _ = self.plan.pop_front();
            let world = &self.world;
            self.builder.handle(
                input.to_builder_input(),
                |cell| query::occupant_at(world, cell),
                &mut commands,
            );
        }
        commands.push(Command::Tick { tick });

        let mut events = Vec::new();
        for command in commands {
            world::apply(&mut self.world, command, &mut events)
                .with_context(|| format!("simulation aborted on tick {tick}"))?;
        }
        log_events(&events);

        if tick % self.frame_every == 0 || tick == self.last_tick {
            *scene = self.capture()?;
            Ok(FrameControl::Present)
        } else {
            Ok(FrameControl::Skip)
        }
    }

    /// Projects the current world state into a renderable scene.
    pub(crate) fn capture(&self) -> Result<Scene> {
        let (rows, columns) = query::dimensions(&self.world);
        let cells = query::cell_snapshots(&self.world)?
            .into_iter()
            .map(|snapshot| {
                CellVisual::new(snapshot.coord, snapshot.flux, snapshot.kind, snapshot.integrity)
            })
            .collect();
        let mut scene = Scene::new(rows, columns, cells)?;
        scene.tick = query::last_tick(&self.world);
        scene.currency = query::currency(&self.world);
        scene.total_harvested = query::total_harvested(&self.world);
        scene.total_flux = query::total_flux(&self.world);
        Ok(scene)
    }
}

fn log_events(events: &[Event]) {
    for event in events {
        match event {
            Event::FluxEmitted {
                producer,
                target,
                amount,
            } => tracing::debug!(
                target: "flux_harvest::cli",
                producer = %producer,
                target_cell = %target,
                amount,
                "flux.emitted"
            ),
            Event::TickCompleted {
                tick,
                harvested,
                currency,
            } => tracing::debug!(
                target: "flux_harvest::cli",
                tick,
                harvested,
                currency,
                "tick.completed"
            ),
            Event::UpgradePurchased {
                building,
                stat,
                level,
                ..
            } => tracing::info!(
                target: "flux_harvest::cli",
                building = %building,
                stat = %stat,
                level,
                "plan.upgrade_applied"
            ),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use flux_harvest_core::{CellCoord, StatName, StructureKind, Upgradeable};

    use super::*;
    use crate::config::{Overrides, ScenarioFile};

    const SCENARIO: &str = r#"
ticks = 12
frame_every = 5

[world]
rows = 6
columns = 6
producers = []

[[plan]]
tick = 1
click = { row = 2, column = 2 }

[[plan]]
tick = 3
select = "absorber"
click = { row = 2, column = 3 }

[[plan]]
tick = 4
upgrade = { building = "board", stat = "harvestRate" }
"#;

    fn simulation() -> Simulation {
        let scenario = ScenarioFile::parse(SCENARIO)
            .expect("scenario parses")
            .resolve(Overrides::default())
            .expect("scenario resolves");
        Simulation::new(scenario).expect("world builds")
    }

    #[test]
    fn scripted_input_reaches_the_world() {
        let mut simulation = simulation();
        let mut scene = simulation.capture().expect("initial scene");

        let mut controls = Vec::new();
        loop {
            let control = simulation.advance(&mut scene).expect("tick runs");
            controls.push(control);
            if control == FrameControl::Exit {
                break;
            }
        }

        let world = simulation.world();
        assert_eq!(
            query::occupant_at(world, CellCoord::new(2, 2)),
            Some(StructureKind::Collector)
        );
        assert_eq!(
            query::occupant_at(world, CellCoord::new(2, 3)),
            Some(StructureKind::Absorber)
        );
        assert_eq!(
            query::economy(world)
                .upgrade_level(Upgradeable::Board, StatName::HarvestRate)
                .expect("board ladder exists"),
            1
        );
        assert_eq!(controls.len(), 13);
        let presented = controls
            .iter()
            .filter(|control| **control == FrameControl::Present)
            .count();
        assert_eq!(presented, 3);
        assert_eq!(scene.tick, Some(12));
    }

    #[test]
    fn scenario_with_negative_pull_weight_is_refused() {
        let scenario = ScenarioFile::parse("[world.grid]\nbase_pull_weight = -10.0\n")
            .expect("syntax is valid")
            .resolve(Overrides::default())
            .expect("scenario resolves");

        let error = Simulation::new(scenario).expect_err("world rejects the setting");

        assert!(format!("{error:#}").contains("base_pull_weight"));
    }

    #[test]
    fn capture_matches_world_dimensions() {
        let simulation = simulation();

        let scene = simulation.capture().expect("scene builds");

        assert_eq!(scene.dimensions(), (6, 6));
        assert_eq!(scene.tick, None);
        assert!((scene.currency - 10.0).abs() < 1e-9);
    }
}
