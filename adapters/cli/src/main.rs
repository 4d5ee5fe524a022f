#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a Flux Harvest scenario and prints text frames.

mod config;
mod simulation;
mod terminal;

use std::{io, path::PathBuf};

use anyhow::Result;
use clap::Parser;
use flux_harvest_rendering::{Presentation, RenderingBackend};
use flux_harvest_world::query;
use tracing_subscriber::EnvFilter;

use crate::{
    config::{Overrides, ScenarioFile},
    simulation::Simulation,
    terminal::TextBackend,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless Flux Harvest simulation", long_about = None)]
struct Args {
    /// Scenario TOML file describing the world and scripted input
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of ticks to run
    #[arg(long)]
    ticks: Option<u64>,

    /// Seed for producer targeting
    #[arg(long)]
    seed: Option<u64>,

    /// Grid rows
    #[arg(long)]
    rows: Option<u32>,

    /// Grid columns
    #[arg(long)]
    columns: Option<u32>,

    /// Print a frame every N ticks
    #[arg(long)]
    frame_every: Option<u64>,

    /// Colour frames with ANSI escapes
    #[arg(long)]
    color: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            ticks: self.ticks,
            frame_every: self.frame_every,
            seed: self.seed,
            rows: self.rows,
            columns: self.columns,
        }
    }
}

/// Entry point for the Flux Harvest command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let file = match &args.config {
        Some(path) => ScenarioFile::load(path)?,
        None => ScenarioFile::default(),
    };
    let scenario = file.resolve(args.overrides())?;
    tracing::info!(
        target: "flux_harvest::cli",
        ticks = scenario.ticks,
        frame_every = scenario.frame_every,
        planned_inputs = scenario.plan.len(),
        "scenario.loaded"
    );

    let mut simulation = Simulation::new(scenario)?;
    let banner = query::welcome_banner(simulation.world());
    let presentation = Presentation::new(banner, simulation.capture()?);

    let stdout = io::stdout();
    TextBackend::new(stdout.lock(), args.color)
        .run(presentation, |scene| simulation.advance(scene))?;

    let world = simulation.world();
    println!(
        "final currency {:.2}, harvested {:.2}, flux on grid {:.1}",
        query::currency(world),
        query::total_harvested(world),
        query::total_flux(world)
    );
    Ok(())
}
