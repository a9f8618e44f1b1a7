//! Mosaic Conversion Pipeline
//!
//! One run is four concurrent stages inside a thread scope:
//!
//! 1. **Rescale**: the source is resized to the output canvas
//!    (`grid_width * tile_size` by `grid_height * tile_size`)
//! 2. **Setup + partition**: the palette is built, then the source bounds are
//!    split into sample rectangles fed into a bounded queue
//! 3. **Workers**: a fixed pool samples each rectangle's dominant color,
//!    picks a tile from the shared palette and emits a placement
//! 4. **Compose**: this thread waits for the canvas, then draws placements as
//!    they arrive
//!
//! A palette failure is pushed onto the error queue and the placement queue
//! closes with nothing in it; the run then fails as a whole. Placements never
//! overlap, so draw order does not matter.

use image::RgbaImage;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::thread;

use crate::codec::{encode_png, load_image, save_image};
use crate::color::ColorKey;
use crate::compositor;
use crate::error::{MosaicError, Result};
use crate::grid::{Grid, Rectangle, Scale};
use crate::palette::{PaletteSource, TilePalette};
use crate::resample;
use crate::sampler::Sampler;
use crate::tile::Tile;

/// Default number of sampling workers
pub const DEFAULT_WORKERS: usize = 10;

/// Default capacity of the sample-rectangle queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

// ============================================================================
// SETTINGS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MosaicSettings {
    /// Tiles across (default: 50)
    pub grid_width: u32,
    /// Tiles down (default: 50)
    pub grid_height: u32,
    /// Output pixels per tile edge (default: 10)
    pub tile_size: u32,
    /// Uniform opacity applied to every tile, 255 = fully opaque (default: 255)
    pub alpha: u8,
    /// Sampling worker count (default: 10)
    pub workers: usize,
    /// Bound of the sample-rectangle queue (default: 10)
    pub queue_capacity: usize,
    /// Where tiles come from (default: web-safe solid colors)
    pub palette: PaletteSource,
    /// Center-crop and resize library images to `tile_size` squares (default: true)
    pub normalize_tiles: bool,
}

impl Default for MosaicSettings {
    fn default() -> Self {
        Self {
            grid_width: 50,
            grid_height: 50,
            tile_size: 10,
            alpha: 255,
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            palette: PaletteSource::Uniform,
            normalize_tiles: true,
        }
    }
}

impl MosaicSettings {
    /// Load settings from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Reject anything that would stop the pipeline from starting
    pub fn validate(&self) -> Result<()> {
        Grid::new(self.grid_width, self.grid_height)?;

        if self.tile_size == 0 {
            return Err(MosaicError::InvalidParameter("tile size must be positive".to_string()));
        }
        if self.workers == 0 {
            return Err(MosaicError::InvalidParameter("at least one worker is required".to_string()));
        }
        if self.queue_capacity == 0 {
            return Err(MosaicError::InvalidParameter("queue capacity must be positive".to_string()));
        }
        if let PaletteSource::Directory { path } = &self.palette {
            if path.as_os_str().is_empty() {
                return Err(MosaicError::InvalidParameter("tile directory path is empty".to_string()));
            }
        }

        self.canvas_dimensions().map(|_| ())
    }

    /// Output canvas size in pixels
    pub fn canvas_dimensions(&self) -> Result<(u32, u32)> {
        let width = self.grid_width.checked_mul(self.tile_size);
        let height = self.grid_height.checked_mul(self.tile_size);
        match (width, height) {
            (Some(w), Some(h)) => Ok((w, h)),
            _ => Err(MosaicError::InvalidParameter(format!(
                "canvas of {}x{} tiles at {}px overflows",
                self.grid_width, self.grid_height, self.tile_size
            ))),
        }
    }
}

// ============================================================================
// RESULTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConvertReport {
    pub source_size: (u32, u32),
    pub canvas_size: (u32, u32),
    pub palette_tiles: usize,
    /// Placements drawn onto the canvas
    pub cells: usize,
}

#[derive(Debug, Clone)]
pub struct Mosaic {
    pub canvas: RgbaImage,
    pub report: ConvertReport,
}

impl Mosaic {
    /// The canvas as PNG bytes, for callers that stream rather than save
    pub fn to_png(&self) -> Result<Vec<u8>> {
        encode_png(&self.canvas)
    }
}

/// A chosen tile and where it goes on the canvas
struct Placement {
    dest: Rectangle,
    tile: Arc<Tile>,
}

// ============================================================================
// CONVERTER
// ============================================================================

#[derive(Debug, Clone)]
pub struct Converter {
    settings: MosaicSettings,
}

impl Converter {
    /// Validates up front so a bad configuration never spawns a thread
    pub fn new(settings: MosaicSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &MosaicSettings {
        &self.settings
    }

    /// Convert `source`, building the palette from the configured source
    pub fn convert(&self, source: &RgbaImage) -> Result<Mosaic> {
        let palette_source = self.settings.palette.clone();
        let size = self.settings.tile_size;
        let normalize = self.settings.normalize_tiles;

        self.run(source, move || {
            TilePalette::from_source(&palette_source, size, normalize).map(Arc::new)
        })
    }

    /// Convert `source` with an already built palette
    pub fn convert_with(&self, source: &RgbaImage, palette: Arc<TilePalette>) -> Result<Mosaic> {
        if palette.size() != self.settings.tile_size {
            return Err(MosaicError::InvalidParameter(format!(
                "palette tile size {} does not match configured tile size {}",
                palette.size(),
                self.settings.tile_size
            )));
        }
        self.run(source, move || Ok(palette))
    }

    fn run<F>(&self, source: &RgbaImage, load_palette: F) -> Result<Mosaic>
    where
        F: FnOnce() -> Result<Arc<TilePalette>> + Send,
    {
        let source_size = source.dimensions();
        if source_size.0 == 0 || source_size.1 == 0 {
            return Err(MosaicError::InvalidParameter("source image is empty".to_string()));
        }

        let settings = &self.settings;
        let grid = Grid::new(settings.grid_width, settings.grid_height)?;
        let canvas_size = settings.canvas_dimensions()?;
        let scale = Scale::new(source_size, canvas_size);
        let (sx, sy) = scale.factors();
        let alpha = settings.alpha;
        let workers = settings.workers;

        info!(
            "[mosaic] Original [{}, {}] New [{}, {}] Scale [{:.3}, {:.3}]",
            source_size.0, source_size.1, canvas_size.0, canvas_size.1, sx, sy
        );

        let (rect_tx, rect_rx) = flume::bounded::<Rectangle>(settings.queue_capacity);
        let (placement_tx, placement_rx) = flume::bounded::<Placement>(workers);
        let (error_tx, error_rx) = flume::unbounded::<MosaicError>();
        let sampler = Sampler::new(source);

        thread::scope(|s| -> Result<Mosaic> {
            info!("[mosaic] Begin resizing");
            let rescale = s.spawn(move || resample::resize(source, canvas_size.0, canvas_size.1));

            let sampler = &sampler;
            let setup = s.spawn(move || -> Option<usize> {
                let palette = match load_palette() {
                    Ok(palette) => palette,
                    Err(e) => {
                        // dropping placement_tx here closes the placement queue empty
                        let _ = error_tx.send(e);
                        return None;
                    }
                };
                let tiles = palette.len();

                info!("[mosaic] Calculating tiles");
                let bounds = sampler.bounds();
                s.spawn(move || {
                    for rect in grid.partition(bounds) {
                        if rect_tx.send(rect).is_err() {
                            break;
                        }
                    }
                });

                info!("[mosaic] Fetching color information");
                for id in 0..workers {
                    let rects = rect_rx.clone();
                    let placements = placement_tx.clone();
                    let errors = error_tx.clone();
                    let palette = Arc::clone(&palette);
                    s.spawn(move || sample_cells(id, sampler, &palette, scale, rects, placements, errors));
                }

                Some(tiles)
            });

            let canvas = match rescale.join() {
                Ok(Ok(canvas)) => Ok(canvas),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(MosaicError::Processing("canvas rescale panicked".to_string())),
            };
            let mut canvas = match canvas {
                Ok(canvas) => canvas,
                Err(e) => {
                    // release the workers blocked on a full placement queue
                    drop(placement_rx);
                    return Err(e);
                }
            };

            info!("[mosaic] Composing image");
            let mut cells = 0;
            for placement in placement_rx.iter() {
                compositor::draw(&mut canvas, placement.dest, &placement.tile, alpha);
                cells += 1;
            }

            let palette_tiles = setup
                .join()
                .map_err(|_| MosaicError::Processing("palette setup panicked".to_string()))?;

            if let Ok(e) = error_rx.try_recv() {
                return Err(e);
            }
            let palette_tiles = palette_tiles.ok_or_else(|| {
                MosaicError::Processing("palette setup ended without a palette".to_string())
            })?;

            Ok(Mosaic {
                canvas,
                report: ConvertReport {
                    source_size,
                    canvas_size,
                    palette_tiles,
                    cells,
                },
            })
        })
    }
}

/// Worker loop: sample, pick a tile, emit a placement until the queue drains
fn sample_cells(
    id: usize,
    sampler: &Sampler<'_>,
    palette: &TilePalette,
    scale: Scale,
    rects: flume::Receiver<Rectangle>,
    placements: flume::Sender<Placement>,
    errors: flume::Sender<MosaicError>,
) {
    let mut sampled = 0usize;

    for rect in rects.iter() {
        if rect.is_empty() {
            continue;
        }
        let Some(color) = sampler.color_at(rect) else {
            continue;
        };
        let Some(tile) = palette.convert(color) else {
            let key = ColorKey::new(color);
            warn!("[mosaic] worker {} found no tile for {:?}", id, key);
            let _ = errors.send(MosaicError::NoMatchingTile { key });
            return;
        };

        let dest = scale.map(rect);
        if dest.is_empty() {
            continue;
        }
        if placements.send(Placement { dest, tile }).is_err() {
            // composer is gone
            return;
        }
        sampled += 1;
    }

    debug!("[mosaic] worker {} done after {} cells", id, sampled);
}

// ============================================================================
// FILE ENTRY POINT
// ============================================================================

/// Load `input`, convert it and save the mosaic to `output`
pub fn convert_image(input: &Path, output: &Path, settings: MosaicSettings) -> Result<ConvertReport> {
    let converter = Converter::new(settings)?;
    let source = load_image(input)?;
    let mosaic = converter.convert(&source)?;
    save_image(&mosaic.canvas, output)?;
    Ok(mosaic.report)
}

/// Load `input` and convert it, returning the mosaic encoded as PNG
pub fn render_png(input: &Path, settings: MosaicSettings) -> Result<(Vec<u8>, ConvertReport)> {
    let converter = Converter::new(settings)?;
    let source = load_image(input)?;
    let mosaic = converter.convert(&source)?;
    Ok((mosaic.to_png()?, mosaic.report))
}
