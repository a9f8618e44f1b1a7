pub mod codec;
pub mod color;
pub mod compositor;
pub mod error;
pub mod grid;
pub mod palette;
pub mod pipeline;
pub mod resample;
pub mod sampler;
pub mod tile;

use std::path::PathBuf;

pub use error::{MosaicError, Result};
pub use palette::{PaletteSource, TilePalette};
pub use pipeline::{ConvertReport, Converter, Mosaic, MosaicSettings};

/// Build a mosaic of `input_path` and write it to `output_path` without
/// blocking the async runtime
pub async fn convert_file(
    input_path: PathBuf,
    output_path: PathBuf,
    settings: MosaicSettings,
) -> Result<ConvertReport> {
    tokio::task::spawn_blocking(move || {
        pipeline::convert_image(&input_path, &output_path, settings)
    })
    .await
    .map_err(|e| MosaicError::Processing(format!("Task join error: {}", e)))?
}

/// Build a mosaic of `input_path` and return it as PNG bytes
pub async fn render_file(input_path: PathBuf, settings: MosaicSettings) -> Result<(Vec<u8>, ConvertReport)> {
    tokio::task::spawn_blocking(move || pipeline::render_png(&input_path, settings))
        .await
        .map_err(|e| MosaicError::Processing(format!("Task join error: {}", e)))?
}

/// Turn `input_path` into a `size x size` tile and write it to `output_path`.
///
/// Images smaller than the tile are rejected rather than upscaled.
pub async fn make_tile_file(input_path: PathBuf, output_path: PathBuf, size: u32) -> Result<(u32, u32)> {
    tokio::task::spawn_blocking(move || -> Result<(u32, u32)> {
        let img = codec::load_image(&input_path)?;
        resample::check_tileable(img.dimensions(), size)?;
        let tile = resample::square_tile(&img, size)?;
        codec::save_image(&tile, &output_path)?;
        Ok(tile.dimensions())
    })
    .await
    .map_err(|e| MosaicError::Processing(format!("Task join error: {}", e)))?
}
