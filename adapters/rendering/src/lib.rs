#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Flux Harvest adapters.
//!
//! Everything here is a read-only projection of world snapshots: a digit
//! glyph per cell, a colour band keyed on the flux magnitude, and a tint for
//! the occupying structure scaled by its integrity.

use anyhow::Result as AnyResult;
use flux_harvest_core::{CellCoord, StructureKind};
use thiserror::Error;

/// Largest digit displayed for a cell.
pub const MAX_GLYPH: u32 = 9;

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Returns a new color lightened towards white by the provided amount.
    #[must_use]
    pub fn lighten(self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);

        Self {
            red: lighten_channel(self.red, amount),
            green: lighten_channel(self.green, amount),
            blue: lighten_channel(self.blue, amount),
            alpha: self.alpha,
        }
    }

    /// Channels as bytes, ignoring alpha.
    #[must_use]
    pub fn to_rgb_u8(self) -> (u8, u8, u8) {
        (
            channel_to_u8(self.red),
            channel_to_u8(self.green),
            channel_to_u8(self.blue),
        )
    }

    /// `#RRGGBB` notation of the color.
    #[must_use]
    pub fn to_hex(self) -> String {
        let (red, green, blue) = self.to_rgb_u8();
        format!("#{red:02X}{green:02X}{blue:02X}")
    }
}

fn lighten_channel(channel: f32, amount: f32) -> f32 {
    channel + (1.0 - channel) * amount
}

fn channel_to_u8(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Colour band selected by flux magnitude.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FluxBand {
    /// Below 1.
    Empty,
    /// From 1 up to 2.
    Trace,
    /// From 2 up to 4.
    Low,
    /// From 4 up to 6.
    Medium,
    /// From 6 up to 20.
    High,
    /// From 20 up to 100.
    Intense,
    /// 100 and above.
    Overload,
}

impl FluxBand {
    /// Band containing `flux`. Non-finite or negative input falls in [`FluxBand::Empty`].
    #[must_use]
    pub fn for_flux(flux: f64) -> Self {
        match flux {
            f if f >= 100.0 => Self::Overload,
            f if f >= 20.0 => Self::Intense,
            f if f >= 6.0 => Self::High,
            f if f >= 4.0 => Self::Medium,
            f if f >= 2.0 => Self::Low,
            f if f >= 1.0 => Self::Trace,
            _ => Self::Empty,
        }
    }

    /// Display colour of the band.
    #[must_use]
    pub const fn color(self) -> Color {
        match self {
            Self::Empty => Color::from_rgb_u8(0x00, 0x00, 0x00),
            Self::Trace => Color::from_rgb_u8(0x00, 0x66, 0x00),
            Self::Low => Color::from_rgb_u8(0x00, 0x99, 0x00),
            Self::Medium => Color::from_rgb_u8(0x00, 0xBB, 0x00),
            Self::High => Color::from_rgb_u8(0x00, 0xFF, 0x00),
            Self::Intense => Color::from_rgb_u8(0xAA, 0xFF, 0x00),
            Self::Overload => Color::from_rgb_u8(0xFF, 0xFF, 0xFF),
        }
    }
}

/// Digit shown for a cell holding `flux`: its floor, capped at [`MAX_GLYPH`].
#[must_use]
pub fn glyph_for(flux: f64) -> char {
    let digit = if flux >= f64::from(MAX_GLYPH) {
        MAX_GLYPH
    } else if flux >= 1.0 {
        flux.floor() as u32
    } else {
        0
    };
    char::from_digit(digit, 10).unwrap_or('0')
}

/// Occupant overlay drawn on top of a cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StructureVisual {
    /// Kind of the occupant.
    pub kind: StructureKind,
    /// Integrity gauge in `[0, 1]`.
    pub integrity: f64,
    /// Fill colour derived from the kind and integrity.
    pub tint: Color,
}

impl StructureVisual {
    /// Creates the overlay for an occupant.
    ///
    /// Collectors fade from red towards white as their integrity rises.
    #[must_use]
    pub fn new(kind: StructureKind, integrity: f64) -> Self {
        let integrity = if integrity.is_finite() {
            integrity.clamp(0.0, 1.0)
        } else {
            1.0
        };
        let tint = match kind {
            StructureKind::Collector => {
                Color::from_rgb_u8(0xFF, 0x00, 0x00).lighten(integrity as f32)
            }
            StructureKind::Absorber => Color::from_rgb_u8(0xFF, 0xFF, 0xFF),
            StructureKind::Wall => Color::from_rgb_u8(0x80, 0x80, 0x80),
            StructureKind::FluxProducer => Color::from_rgb_u8(0x00, 0xCC, 0xFF),
        };
        Self {
            kind,
            integrity,
            tint,
        }
    }

    /// Single character marker used by text backends.
    #[must_use]
    pub const fn marker(&self) -> char {
        match self.kind {
            StructureKind::Collector => 'C',
            StructureKind::Absorber => 'A',
            StructureKind::Wall => '#',
            StructureKind::FluxProducer => '*',
        }
    }
}

/// Presentation of a single grid cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellVisual {
    /// Position of the cell.
    pub coord: CellCoord,
    /// Digit glyph derived from the flux.
    pub glyph: char,
    /// Colour band derived from the flux.
    pub band: FluxBand,
    /// Occupant overlay, if any.
    pub structure: Option<StructureVisual>,
}

impl CellVisual {
    /// Projects a cell snapshot into its presentation.
    #[must_use]
    pub fn new(coord: CellCoord, flux: f64, kind: Option<StructureKind>, integrity: f64) -> Self {
        Self {
            coord,
            glyph: glyph_for(flux),
            band: FluxBand::for_flux(flux),
            structure: kind.map(|kind| StructureVisual::new(kind, integrity)),
        }
    }

    /// Colour used for the glyph.
    #[must_use]
    pub const fn color(&self) -> Color {
        self.band.color()
    }
}

/// Errors raised while assembling a scene.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderingError {
    /// The number of cells does not match the grid dimensions.
    #[error("scene of {rows}x{columns} needs {expected} cells but received {actual}")]
    CellCountMismatch {
        /// Grid rows.
        rows: u32,
        /// Grid columns.
        columns: u32,
        /// Cells required by the dimensions.
        expected: usize,
        /// Cells supplied.
        actual: usize,
    },
}

/// Scene description combining the grid and the economy readouts.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    rows: u32,
    columns: u32,
    cells: Vec<CellVisual>,
    /// Tick the scene was captured after, if any.
    pub tick: Option<u64>,
    /// Player currency.
    pub currency: f64,
    /// Energy harvested since the start.
    pub total_harvested: f64,
    /// Flux held across the grid.
    pub total_flux: f64,
}

impl Scene {
    /// Creates a scene from cells in row-major order.
    pub fn new(rows: u32, columns: u32, cells: Vec<CellVisual>) -> Result<Self, RenderingError> {
        let expected = usize::try_from(u64::from(rows) * u64::from(columns)).unwrap_or(usize::MAX);
        if cells.len() != expected {
            return Err(RenderingError::CellCountMismatch {
                rows,
                columns,
                expected,
                actual: cells.len(),
            });
        }
        Ok(Self {
            rows,
            columns,
            cells,
            tick: None,
            currency: 0.0,
            total_harvested: 0.0,
            total_flux: 0.0,
        })
    }

    /// Grid dimensions as `(rows, columns)`.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.rows, self.columns)
    }

    /// Every cell in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[CellVisual] {
        &self.cells
    }

    /// Iterator over the rows of the scene.
    pub fn rows(&self) -> impl Iterator<Item = &[CellVisual]> {
        let width = usize::try_from(self.columns).unwrap_or(usize::MAX).max(1);
        self.cells.chunks(width)
    }
}

/// Presentation descriptor consumed by rendering backends.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Title shown by the backend.
    pub title: String,
    /// Scene content that should be displayed.
    pub scene: Scene,
}

impl Presentation {
    /// Constructs a new presentation descriptor.
    #[must_use]
    pub fn new<T>(title: T, scene: Scene) -> Self
    where
        T: Into<String>,
    {
        Self {
            title: title.into(),
            scene,
        }
    }
}

/// Decision returned by the scene update closure for each frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameControl {
    /// Present the updated scene.
    Present,
    /// Keep running without presenting this frame.
    Skip,
    /// Stop the backend.
    Exit,
}

/// Rendering backend capable of presenting Flux Harvest scenes.
pub trait RenderingBackend {
    /// Runs the rendering backend until `update_scene` returns [`FrameControl::Exit`].
    ///
    /// The closure advances the simulation and refreshes the scene in place
    /// before the backend decides whether to draw it.
    fn run<F>(self, presentation: Presentation, update_scene: F) -> AnyResult<()>
    where
        F: FnMut(&mut Scene) -> AnyResult<FrameControl>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glyph_floors_and_caps_flux() {
        assert_eq!(glyph_for(0.0), '0');
        assert_eq!(glyph_for(0.99), '0');
        assert_eq!(glyph_for(3.7), '3');
        assert_eq!(glyph_for(9.0), '9');
        assert_eq!(glyph_for(250.0), '9');
        assert_eq!(glyph_for(f64::NAN), '0');
    }

    #[test]
    fn bands_switch_at_thresholds() {
        let cases = [
            (0.5, FluxBand::Empty),
            (1.0, FluxBand::Trace),
            (1.99, FluxBand::Trace),
            (2.0, FluxBand::Low),
            (4.0, FluxBand::Medium),
            (6.0, FluxBand::High),
            (19.99, FluxBand::High),
            (20.0, FluxBand::Intense),
            (100.0, FluxBand::Overload),
        ];
        for (flux, band) in cases {
            assert_eq!(FluxBand::for_flux(flux), band, "flux {flux}");
        }
        assert_eq!(FluxBand::for_flux(f64::NAN), FluxBand::Empty);
    }

    #[test]
    fn band_colors_match_palette() {
        assert_eq!(FluxBand::Empty.color().to_hex(), "#000000");
        assert_eq!(FluxBand::Medium.color().to_hex(), "#00BB00");
        assert_eq!(FluxBand::Intense.color().to_hex(), "#AAFF00");
    }

    #[test]
    fn collector_tint_tracks_integrity() {
        let healthy = StructureVisual::new(StructureKind::Collector, 1.0);
        let failing = StructureVisual::new(StructureKind::Collector, 0.0);

        assert_eq!(healthy.tint.to_hex(), "#FFFFFF");
        assert_eq!(failing.tint.to_hex(), "#FF0000");
        assert_eq!(StructureVisual::new(StructureKind::Wall, 2.0).integrity, 1.0);
    }

    #[test]
    fn scene_rejects_mismatched_cell_count() {
        let cells = vec![CellVisual::new(CellCoord::new(0, 0), 1.0, None, 1.0)];

        let error = Scene::new(2, 2, cells).expect_err("four cells are required");

        assert_eq!(
            error,
            RenderingError::CellCountMismatch {
                rows: 2,
                columns: 2,
                expected: 4,
                actual: 1,
            }
        );
    }

    #[test]
    fn scene_rows_follow_columns() {
        let cells = (0..6)
            .map(|index| CellVisual::new(CellCoord::new(index / 3, index % 3), 0.0, None, 1.0))
            .collect();

        let scene = Scene::new(2, 3, cells).expect("dimensions match");

        let rows: Vec<&[CellVisual]> = scene.rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0].coord, CellCoord::new(1, 0));
        assert_eq!(scene.dimensions(), (2, 3));
    }
}
