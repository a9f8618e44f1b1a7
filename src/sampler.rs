//! Dominant-color sampling
//!
//! Pixels are first snapped to the web-safe cube so the histogram stays small,
//! then the most frequent bin wins. Ties go to the color that reached the
//! winning count first in row-major scan order, which keeps output
//! reproducible across runs.

use image::{Rgba, RgbaImage};
use std::collections::HashMap;

use crate::color::{quantize_web_safe, ColorKey};
use crate::grid::Rectangle;

/// Most frequent quantized color inside `rect`, clipped to the image.
/// Returns `None` when nothing of `rect` lies inside the image.
pub fn dominant_color(image: &RgbaImage, rect: Rectangle) -> Option<Rgba<u8>> {
    let rect = rect.intersect(&Rectangle::from_dimensions(image.dimensions()));
    if rect.is_empty() {
        return None;
    }

    let mut bins: HashMap<ColorKey, u32> = HashMap::new();
    let mut best: Option<(ColorKey, u32)> = None;

    for y in rect.min_y..rect.max_y {
        for x in rect.min_x..rect.max_x {
            let key = ColorKey::new(quantize_web_safe(*image.get_pixel(x, y)));
            let count = bins.entry(key).or_insert(0);
            *count += 1;

            match best {
                Some((_, max)) if *count <= max => {}
                _ => best = Some((key, *count)),
            }
        }
    }

    best.map(|(key, _)| key.color())
}

/// Read-only view over the source image shared by every pipeline worker
#[derive(Debug, Clone, Copy)]
pub struct Sampler<'a> {
    image: &'a RgbaImage,
}

impl<'a> Sampler<'a> {
    pub fn new(image: &'a RgbaImage) -> Self {
        Self { image }
    }

    pub fn bounds(&self) -> Rectangle {
        Rectangle::from_dimensions(self.image.dimensions())
    }

    pub fn color_at(&self, rect: Rectangle) -> Option<Rgba<u8>> {
        dominant_color(self.image, rect)
    }
}
