//! Bilinear resampling
//!
//! Used to scale the source up (or down) to the output canvas, and to turn
//! arbitrary library images into square tiles.

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::error::{MosaicError, Result};

/// Resize `src` to exactly `width x height`
pub fn resize(src: &RgbaImage, width: u32, height: u32) -> Result<RgbaImage> {
    if width == 0 || height == 0 {
        return Err(MosaicError::Resample(format!(
            "cannot resample to {}x{}",
            width, height
        )));
    }
    if src.width() == 0 || src.height() == 0 {
        return Err(MosaicError::Resample("cannot resample an empty image".to_string()));
    }
    if src.dimensions() == (width, height) {
        return Ok(src.clone());
    }

    Ok(imageops::resize(src, width, height, FilterType::Triangle))
}

/// Crop the centered square of `src`, then resize it to `size x size`
pub fn square_tile(src: &RgbaImage, size: u32) -> Result<RgbaImage> {
    let (width, height) = src.dimensions();
    let side = width.min(height);
    if side == 0 {
        return Err(MosaicError::Resample("cannot resample an empty image".to_string()));
    }

    let (x, y) = if width < height {
        (0, (height - width) / 2)
    } else {
        ((width - height) / 2, 0)
    };

    let square = imageops::crop_imm(src, x, y, side, side).to_image();
    resize(&square, size, size)
}

/// Library images smaller than the tile size would have to be upscaled
pub fn check_tileable(dimensions: (u32, u32), size: u32) -> Result<()> {
    if dimensions.0 < size || dimensions.1 < size {
        return Err(MosaicError::InvalidParameter(format!(
            "image not suitable for tiling: {}x{} is smaller than {}x{}",
            dimensions.0, dimensions.1, size, size
        )));
    }
    Ok(())
}
