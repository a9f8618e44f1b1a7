use image::{Rgba, RgbaImage};

use crate::error::{MosaicError, Result};
use crate::grid::Rectangle;
use crate::sampler::dominant_color;

/// Anything that can stand in for a grid cell: it has one representative
/// color and can report the dominant color of any region of itself.
pub trait Swatch {
    fn representative_color(&self) -> Rgba<u8>;

    /// `None` only when `rect` covers none of the swatch
    fn color_at(&self, rect: Rectangle) -> Option<Rgba<u8>>;
}

/// An unbounded field of a single color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformTile {
    color: Rgba<u8>,
}

impl UniformTile {
    pub fn new(color: Rgba<u8>) -> Self {
        Self { color }
    }
}

impl Swatch for UniformTile {
    fn representative_color(&self) -> Rgba<u8> {
        self.color
    }

    fn color_at(&self, _rect: Rectangle) -> Option<Rgba<u8>> {
        Some(self.color)
    }
}

/// A decoded image with its dominant color computed once up front
#[derive(Debug, Clone)]
pub struct ImageTile {
    image: RgbaImage,
    color: Rgba<u8>,
}

impl ImageTile {
    pub fn new(image: RgbaImage) -> Result<Self> {
        let bounds = Rectangle::from_dimensions(image.dimensions());
        let color = dominant_color(&image, bounds).ok_or_else(|| {
            MosaicError::InvalidParameter("cannot build an image tile from an empty image".to_string())
        })?;
        Ok(Self { image, color })
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

impl Swatch for ImageTile {
    fn representative_color(&self) -> Rgba<u8> {
        self.color
    }

    fn color_at(&self, rect: Rectangle) -> Option<Rgba<u8>> {
        dominant_color(&self.image, rect)
    }
}

/// Palette entry
#[derive(Debug, Clone)]
pub enum Tile {
    Uniform(UniformTile),
    Image(ImageTile),
}

impl Tile {
    pub fn uniform(color: Rgba<u8>) -> Self {
        Tile::Uniform(UniformTile::new(color))
    }

    pub fn from_image(image: RgbaImage) -> Result<Self> {
        Ok(Tile::Image(ImageTile::new(image)?))
    }

    /// Pixel dimensions; `None` for uniform tiles, which have no extent
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self {
            Tile::Uniform(_) => None,
            Tile::Image(tile) => Some(tile.image.dimensions()),
        }
    }
}

impl Swatch for Tile {
    fn representative_color(&self) -> Rgba<u8> {
        match self {
            Tile::Uniform(tile) => tile.representative_color(),
            Tile::Image(tile) => tile.representative_color(),
        }
    }

    fn color_at(&self, rect: Rectangle) -> Option<Rgba<u8>> {
        match self {
            Tile::Uniform(tile) => tile.color_at(rect),
            Tile::Image(tile) => tile.color_at(rect),
        }
    }
}
