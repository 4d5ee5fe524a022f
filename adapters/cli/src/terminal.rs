//! Plain-text rendering backend writing frames to any `io::Write` sink.

use std::io::Write;

use anyhow::{Context, Result};
use flux_harvest_rendering::{CellVisual, FrameControl, Presentation, RenderingBackend, Scene};

/// Backend that prints one digit or structure marker per cell.
#[derive(Debug)]
pub(crate) struct TextBackend<W> {
    out: W,
    color: bool,
}

impl<W: Write> TextBackend<W> {
    pub(crate) fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    fn write_frame(&mut self, scene: &Scene) -> Result<()> {
        let tick = scene
            .tick
            .map_or_else(|| "-".to_owned(), |tick| tick.to_string());
        writeln!(
            self.out,
            "tick {tick}  currency {:.2}  harvested {:.2}  flux {:.1}",
            scene.currency, scene.total_harvested, scene.total_flux
        )?;

        for row in scene.rows() {
            let mut line = String::with_capacity(row.len() * 2);
            for cell in row {
                self.push_cell(&mut line, cell);
            }
            writeln!(self.out, "{line}")?;
        }
        writeln!(self.out)?;
        Ok(())
    }

    fn push_cell(&self, line: &mut String, cell: &CellVisual) {
        let (symbol, color) = match cell.structure {
            Some(structure) => (structure.marker(), structure.tint),
            None => (cell.glyph, cell.color()),
        };
        if self.color {
            let (red, green, blue) = color.to_rgb_u8();
            line.push_str(&format!("\x1b[38;2;{red};{green};{blue}m{symbol}\x1b[0m"));
        } else {
            line.push(symbol);
        }
    }
}

impl<W: Write> RenderingBackend for TextBackend<W> {
    fn run<F>(mut self, presentation: Presentation, mut update_scene: F) -> Result<()>
    where
        F: FnMut(&mut Scene) -> Result<FrameControl>,
    {
        let Presentation { title, mut scene } = presentation;
        writeln!(self.out, "{title}")?;
        self.write_frame(&scene)?;

        loop {
            match update_scene(&mut scene)? {
                FrameControl::Present => self.write_frame(&scene)?,
                FrameControl::Skip => {}
                FrameControl::Exit => break,
            }
        }

        self.out.flush().context("failed to flush frame output")
    }
}
