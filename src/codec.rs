use image::RgbaImage;
use std::io::Cursor;
use std::path::Path;

use crate::error::{MosaicError, Result};

/// Extensions the tile library loader will try to decode
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["gif", "jpg", "jpeg", "png"];

/// Whether `path` has one of [`SUPPORTED_EXTENSIONS`] (case-insensitive)
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.iter().any(|s| s.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Load an image from disk into memory
pub fn load_image(path: &Path) -> Result<RgbaImage> {
    let img = image::open(path)
        .map_err(|e| MosaicError::Processing(format!("Failed to load {}: {}", path.display(), e)))?;
    Ok(img.to_rgba8())
}

/// Load a tile library image; decode failures are resource errors
pub fn load_tile_image(path: &Path) -> Result<RgbaImage> {
    let img = image::open(path).map_err(|source| MosaicError::Resource {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_rgba8())
}

/// Save an in-memory image to disk
pub fn save_image(img: &RgbaImage, path: &Path) -> Result<()> {
    // Ensure output directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    img.save(path)?;
    Ok(())
}

/// Encode image as PNG bytes
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageFormat::Png)?;
    Ok(buffer.into_inner())
}
