//! Tile Palette
//!
//! Holds every tile available to a conversion run, bucketed by the quantized
//! key of its representative color. Lookups quantize the sampled color
//! against the tiles' own representative colors, so the palette only ever
//! resolves to colors it actually has a tile for.
//!
//! Buckets with more than one tile hand them out round-robin. The rotation
//! order is the only state mutated during a run and sits behind one mutex.

use image::Rgba;
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use walkdir::WalkDir;

use crate::codec::{is_supported, load_tile_image};
use crate::color::{quantize, ColorKey, WEB_SAFE};
use crate::error::{MosaicError, Result};
use crate::resample::square_tile;
use crate::tile::{Swatch, Tile};

// ============================================================================
// SOURCE SELECTION
// ============================================================================

/// Where the palette's tiles come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum PaletteSource {
    /// One solid tile per web-safe color
    #[default]
    Uniform,
    /// Every decodable image found under `path`
    Directory { path: PathBuf },
}

// ============================================================================
// PALETTE
// ============================================================================

pub struct TilePalette {
    /// Representative colors in insertion order, the quantization reference
    reference: Vec<Rgba<u8>>,
    buckets: Mutex<HashMap<ColorKey, VecDeque<Arc<Tile>>>>,
    size: u32,
}

impl TilePalette {
    /// Build a palette whose image tiles are drawn at `size x size` pixels
    pub fn new(tiles: Vec<Tile>, size: u32) -> Self {
        let mut reference = Vec::with_capacity(tiles.len());
        let mut buckets: HashMap<ColorKey, VecDeque<Arc<Tile>>> = HashMap::new();

        for tile in tiles {
            let color = tile.representative_color();
            reference.push(color);
            buckets
                .entry(ColorKey::new(color))
                .or_default()
                .push_back(Arc::new(tile));
        }

        Self {
            reference,
            buckets: Mutex::new(buckets),
            size,
        }
    }

    /// Solid-color fallback: every lookup is guaranteed to resolve
    pub fn uniform(size: u32) -> Self {
        let tiles = WEB_SAFE.iter().map(|&c| Tile::uniform(c)).collect();
        Self::new(tiles, size)
    }

    /// Load every supported image under `dir` as a tile.
    ///
    /// All-or-nothing: the first file that fails to decode aborts the whole
    /// palette. With `normalize`, each image is center-cropped to a square and
    /// resized to `size` before its color is computed.
    pub fn from_directory(dir: &Path, size: u32, normalize: bool) -> Result<Self> {
        let paths = collect_tile_paths(dir)?;
        if paths.is_empty() {
            return Err(MosaicError::EmptyLibrary(dir.to_path_buf()));
        }

        let tiles = paths
            .par_iter()
            .map(|path| load_tile(path, size, normalize))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(tiles, size))
    }

    pub fn from_source(source: &PaletteSource, size: u32, normalize: bool) -> Result<Self> {
        match source {
            PaletteSource::Uniform => Ok(Self::uniform(size)),
            PaletteSource::Directory { path } => Self::from_directory(path, size, normalize),
        }
    }

    /// Pick a tile for `color`, rotating the chosen bucket.
    ///
    /// `None` means the quantized key has no bucket, which cannot happen for a
    /// non-empty palette and is reported by callers as an internal error.
    pub fn convert(&self, color: Rgba<u8>) -> Option<Arc<Tile>> {
        let nearest = quantize(&self.reference, color)?;
        let key = ColorKey::new(nearest);

        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        let bucket = buckets.get_mut(&key)?;
        if bucket.len() > 1 {
            bucket.rotate_left(1);
            bucket.back().cloned()
        } else {
            bucket.front().cloned()
        }
    }

    /// Pixel size image tiles are drawn at
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Number of tiles
    pub fn len(&self) -> usize {
        self.reference.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reference.is_empty()
    }

    pub fn reference_colors(&self) -> &[Rgba<u8>] {
        &self.reference
    }
}

impl std::fmt::Debug for TilePalette {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TilePalette")
            .field("tiles", &self.reference.len())
            .field("size", &self.size)
            .finish()
    }
}

// ============================================================================
// TILE LIBRARY LOADING
// ============================================================================

/// Supported image files under `dir`, in a stable (sorted) order
pub fn collect_tile_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }
        if is_supported(entry.path()) {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}

fn load_tile(path: &Path, size: u32, normalize: bool) -> Result<Tile> {
    let mut image = load_tile_image(path)?;
    if normalize {
        image = square_tile(&image, size)?;
    }
    debug!("loaded tile {} ({}x{})", path.display(), image.width(), image.height());

    Tile::from_image(image).map_err(|e| match e {
        MosaicError::InvalidParameter(msg) => {
            MosaicError::InvalidParameter(format!("{}: {}", path.display(), msg))
        }
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use std::sync::Arc;

    fn solid(color: [u8; 4]) -> Tile {
        Tile::from_image(RgbaImage::from_pixel(2, 2, Rgba(color))).unwrap()
    }

    #[test]
    fn test_uniform_palette_always_converts() {
        let palette = TilePalette::uniform(10);
        assert_eq!(palette.len(), 216);

        for r in (0..=255u16).step_by(17) {
            for g in (0..=255u16).step_by(51) {
                for a in [0u8, 128, 255] {
                    let color = Rgba([r as u8, g as u8, (r / 3) as u8, a]);
                    assert!(palette.convert(color).is_some(), "no tile for {:?}", color);
                }
            }
        }
    }

    #[test]
    fn test_uniform_palette_nearest_red() {
        let palette = TilePalette::uniform(10);
        let tile = palette.convert(Rgba([250, 5, 5, 255])).unwrap();
        assert_eq!(tile.representative_color(), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_bucket_round_robin() {
        let tiles = vec![
            solid([255, 0, 0, 255]),
            solid([255, 0, 0, 255]),
            solid([255, 0, 0, 255]),
            solid([0, 0, 255, 255]),
        ];
        let palette = TilePalette::new(tiles, 2);

        let picks: Vec<Arc<Tile>> = (0..6).map(|_| palette.convert(Rgba([240, 0, 0, 255])).unwrap()).collect();

        // every tile once per cycle, then the same order again
        for i in 0..3 {
            for j in (i + 1)..3 {
                assert!(!Arc::ptr_eq(&picks[i], &picks[j]));
            }
            assert!(Arc::ptr_eq(&picks[i], &picks[i + 3]));
        }

        // other buckets are untouched by the rotation
        let blue = palette.convert(Rgba([0, 0, 200, 255])).unwrap();
        assert_eq!(blue.representative_color(), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_single_tile_bucket_is_stable() {
        let palette = TilePalette::new(vec![solid([0, 0, 0, 255])], 2);
        let a = palette.convert(Rgba([10, 10, 10, 255])).unwrap();
        let b = palette.convert(Rgba([200, 200, 200, 255])).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_empty_palette_has_no_match() {
        let palette = TilePalette::new(Vec::new(), 2);
        assert!(palette.is_empty());
        assert!(palette.convert(Rgba([1, 2, 3, 255])).is_none());
    }

    #[test]
    fn test_concurrent_convert_is_fair() {
        let tiles = (0..4).map(|_| solid([0, 255, 0, 255])).collect();
        let palette = TilePalette::new(tiles, 2);
        let picks = Mutex::new(Vec::new());

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..25 {
                        let tile = palette.convert(Rgba([0, 250, 0, 255])).unwrap();
                        picks.lock().unwrap().push(Arc::as_ptr(&tile) as usize);
                    }
                });
            }
        });

        let mut counts: HashMap<usize, usize> = HashMap::new();
        for p in picks.into_inner().unwrap() {
            *counts.entry(p).or_insert(0) += 1;
        }
        assert_eq!(counts.len(), 4);
        assert!(counts.values().all(|&n| n == 25));
    }

    #[test]
    fn test_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        RgbaImage::from_pixel(8, 4, Rgba([0, 0, 0, 255])).save(dir.path().join("a.png")).unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]))
            .save(dir.path().join("nested").join("b.png"))
            .unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"ignored").unwrap();

        let palette = TilePalette::from_directory(dir.path(), 3, true).unwrap();
        assert_eq!(palette.len(), 2);
        assert_eq!(palette.size(), 3);
        assert_eq!(
            palette.reference_colors(),
            &[Rgba([0, 0, 0, 255]), Rgba([255, 255, 255, 255])]
        );

        let tile = palette.convert(Rgba([240, 240, 240, 255])).unwrap();
        assert_eq!(tile.dimensions(), Some((3, 3)));
    }

    #[test]
    fn test_from_directory_undecodable_aborts() {
        let dir = tempfile::tempdir().unwrap();
        RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255])).save(dir.path().join("good.png")).unwrap();
        std::fs::write(dir.path().join("bad.jpg"), b"definitely not a jpeg").unwrap();

        let err = TilePalette::from_directory(dir.path(), 4, true).unwrap_err();
        assert!(matches!(err, MosaicError::Resource { .. }), "got {:?}", err);
    }

    #[test]
    fn test_from_directory_empty() {
        let dir = tempfile::tempdir().unwrap();
        let err = TilePalette::from_directory(dir.path(), 4, true).unwrap_err();
        assert!(matches!(err, MosaicError::EmptyLibrary(_)));
    }

    #[test]
    fn test_palette_source_json() {
        let source: PaletteSource = serde_json::from_str(r#"{"kind":"directory","path":"tiles"}"#).unwrap();
        assert_eq!(source, PaletteSource::Directory { path: PathBuf::from("tiles") });

        let source: PaletteSource = serde_json::from_str(r#"{"kind":"uniform"}"#).unwrap();
        assert_eq!(source, PaletteSource::Uniform);
    }
}
