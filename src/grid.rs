//! Sampling grid
//!
//! Splits the source bounds into non-overlapping sample rectangles and maps
//! each one onto the output canvas.

use crate::error::{MosaicError, Result};

// ============================================================================
// RECTANGLE
// ============================================================================

/// Half-open bounds `[min_x, max_x) x [min_y, max_y)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rectangle {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl Rectangle {
    /// Corners are swapped as needed so that min <= max on both axes
    pub fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self {
            min_x: x0.min(x1),
            min_y: y0.min(y1),
            max_x: x0.max(x1),
            max_y: y0.max(y1),
        }
    }

    /// Bounds of a `width x height` image anchored at the origin
    pub fn from_dimensions((width, height): (u32, u32)) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn width(&self) -> u32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.min_x >= self.max_x || self.min_y >= self.max_y
    }

    /// Overlap of two rectangles; empty (but well-formed) when disjoint
    pub fn intersect(&self, other: &Rectangle) -> Rectangle {
        let min_x = self.min_x.max(other.min_x);
        let min_y = self.min_y.max(other.min_y);
        let max_x = self.max_x.min(other.max_x).max(min_x);
        let max_y = self.max_y.min(other.max_y).max(min_y);
        Rectangle { min_x, min_y, max_x, max_y }
    }

    pub fn overlaps(&self, other: &Rectangle) -> bool {
        !self.intersect(other).is_empty()
    }
}

// ============================================================================
// GRID PARTITIONER
// ============================================================================

/// Requested tile counts across and down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    width: u32,
    height: u32,
}

impl Grid {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(MosaicError::InvalidParameter(format!(
                "grid must be at least 1x1 tiles, got {}x{}",
                width, height
            )));
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Column-major sequence of sample rectangles covering `bounds`.
    ///
    /// Steps use integer division, so an uneven remainder spills into one
    /// extra, narrower column or row. A step never drops below one pixel.
    pub fn partition(&self, bounds: Rectangle) -> Partition {
        Partition {
            bounds,
            dx: (bounds.width() / self.width).max(1),
            dy: (bounds.height() / self.height).max(1),
            x: bounds.min_x,
            y: bounds.min_y,
            done: bounds.is_empty(),
        }
    }
}

/// Lazy, single-pass iterator produced by [`Grid::partition`]
#[derive(Debug, Clone)]
pub struct Partition {
    bounds: Rectangle,
    dx: u32,
    dy: u32,
    x: u32,
    y: u32,
    done: bool,
}

impl Partition {
    /// Step sizes along X and Y
    pub fn step(&self) -> (u32, u32) {
        (self.dx, self.dy)
    }
}

impl Iterator for Partition {
    type Item = Rectangle;

    fn next(&mut self) -> Option<Rectangle> {
        if self.done {
            return None;
        }

        let max_x = self.bounds.max_x;
        let max_y = self.bounds.max_y;
        let rect = Rectangle::new(
            self.x,
            self.y,
            self.x.saturating_add(self.dx).min(max_x),
            self.y.saturating_add(self.dy).min(max_y),
        );

        if self.y.saturating_add(self.dy) >= max_y {
            // column finished
            self.y = self.bounds.min_y;
            if self.x.saturating_add(self.dx) >= max_x {
                self.done = true;
            } else {
                self.x += self.dx;
            }
        } else {
            self.y += self.dy;
        }

        Some(rect)
    }
}

// ============================================================================
// SOURCE -> CANVAS MAPPING
// ============================================================================

/// Per-axis scale from source pixel space to canvas pixel space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scale {
    source: (u32, u32),
    canvas: (u32, u32),
}

impl Scale {
    pub fn new(source: (u32, u32), canvas: (u32, u32)) -> Self {
        Self { source, canvas }
    }

    /// Canvas pixels per source pixel on each axis
    pub fn factors(&self) -> (f64, f64) {
        (
            self.canvas.0 as f64 / self.source.0 as f64,
            self.canvas.1 as f64 / self.source.1 as f64,
        )
    }

    /// Both corners are floored independently in integer arithmetic, so
    /// adjacent source rectangles map to adjacent destination rectangles and
    /// the source's far edge lands exactly on the canvas edge.
    pub fn map(&self, rect: Rectangle) -> Rectangle {
        let floor = |v: u32, canvas: u32, source: u32| {
            if source == 0 {
                return 0;
            }
            (v as u64 * canvas as u64 / source as u64) as u32
        };
        Rectangle {
            min_x: floor(rect.min_x, self.canvas.0, self.source.0),
            min_y: floor(rect.min_y, self.canvas.1, self.source.1),
            max_x: floor(rect.max_x, self.canvas.0, self.source.0),
            max_y: floor(rect.max_y, self.canvas.1, self.source.1),
        }
    }
}
