use std::path::PathBuf;
use thiserror::Error;

use crate::color::ColorKey;

#[derive(Error, Debug)]
pub enum MosaicError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Tile library walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Failed to load tile {}: {source}", .path.display())]
    Resource {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("No tile images found in {}", .0.display())]
    EmptyLibrary(PathBuf),

    #[error("Resample error: {0}")]
    Resample(String),

    #[error("No tile matches quantized color {key:?}")]
    NoMatchingTile { key: ColorKey },

    #[error("Processing error: {0}")]
    Processing(String),
}

impl MosaicError {
    /// True when the error points at a bug in the pipeline rather than at the
    /// caller's input or environment.
    pub fn is_internal(&self) -> bool {
        matches!(self, MosaicError::NoMatchingTile { .. } | MosaicError::Processing(_))
    }
}

pub type Result<T> = std::result::Result<T, MosaicError>;
