//! Masked source-over compositing of tiles onto the output canvas

use image::{imageops, Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use crate::grid::Rectangle;
use crate::tile::{Swatch, Tile};

/// Paint `tile` into `dest` on `canvas`, blended through a uniform `alpha` mask.
///
/// Image tiles are aligned to the top-left of `dest` and clipped to their own
/// extent; uniform tiles fill the whole rectangle. Anything outside the
/// canvas is ignored.
pub fn draw(canvas: &mut RgbaImage, dest: Rectangle, tile: &Tile, alpha: u8) {
    let clip = dest.intersect(&Rectangle::from_dimensions(canvas.dimensions()));
    if clip.is_empty() || alpha == 0 {
        return;
    }

    match tile {
        Tile::Uniform(uniform) => {
            let color = uniform.representative_color();
            if alpha == u8::MAX && color[3] == u8::MAX {
                let rect = Rect::at(clip.min_x as i32, clip.min_y as i32).of_size(clip.width(), clip.height());
                draw_filled_rect_mut(canvas, rect, color);
                return;
            }
            let patch = RgbaImage::from_pixel(clip.width(), clip.height(), mask_pixel(color, alpha));
            imageops::overlay(canvas, &patch, clip.min_x as i64, clip.min_y as i64);
        }
        Tile::Image(image_tile) => {
            let src = image_tile.image();
            let max_x = clip.max_x.min(dest.min_x.saturating_add(src.width()));
            let max_y = clip.max_y.min(dest.min_y.saturating_add(src.height()));
            if max_x <= clip.min_x || max_y <= clip.min_y {
                return;
            }

            let mut patch = imageops::crop_imm(
                src,
                clip.min_x - dest.min_x,
                clip.min_y - dest.min_y,
                max_x - clip.min_x,
                max_y - clip.min_y,
            )
            .to_image();
            if alpha < u8::MAX {
                for pixel in patch.pixels_mut() {
                    *pixel = mask_pixel(*pixel, alpha);
                }
            }
            imageops::overlay(canvas, &patch, clip.min_x as i64, clip.min_y as i64);
        }
    }
}

/// Scale the pixel's own alpha by `mask`, rounding to nearest
fn mask_pixel(pixel: Rgba<u8>, mask: u8) -> Rgba<u8> {
    let a = (pixel[3] as u32 * mask as u32 + 127) / 255;
    Rgba([pixel[0], pixel[1], pixel[2], a as u8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_pixel_scales_alpha() {
        assert_eq!(mask_pixel(Rgba([9, 8, 7, 255]), 255), Rgba([9, 8, 7, 255]));
        assert_eq!(mask_pixel(Rgba([9, 8, 7, 255]), 0)[3], 0);
        assert_eq!(mask_pixel(Rgba([9, 8, 7, 255]), 128)[3], 128);
        assert_eq!(mask_pixel(Rgba([9, 8, 7, 128]), 128)[3], 64);
    }

    #[test]
    fn test_draw_zero_alpha_keeps_canvas() {
        let mut canvas = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        let before = canvas.clone();
        draw(&mut canvas, Rectangle::new(0, 0, 4, 4), &Tile::uniform(Rgba([200, 100, 50, 255])), 0);
        assert_eq!(canvas, before);
    }

    #[test]
    fn test_draw_half_alpha_blends_uniform() {
        let mut canvas = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        draw(&mut canvas, Rectangle::new(1, 1, 3, 3), &Tile::uniform(Rgba([255, 255, 255, 255])), 128);

        let blended = *canvas.get_pixel(1, 1);
        assert_eq!(blended[3], 255);
        assert!((126..=129).contains(&blended[0]), "got {:?}", blended);
        assert_eq!(*canvas.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
        assert_eq!(*canvas.get_pixel(3, 3), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_draw_half_alpha_blends_image() {
        let tile = Tile::from_image(RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 255]))).unwrap();
        let mut canvas = RgbaImage::from_pixel(3, 3, Rgba([0, 0, 0, 255]));
        draw(&mut canvas, Rectangle::new(1, 1, 3, 3), &tile, 128);

        let blended = *canvas.get_pixel(2, 2);
        assert!((126..=129).contains(&blended[0]), "got {:?}", blended);
        assert_eq!(*canvas.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_draw_uniform_fills_rect_only() {
        let mut canvas = RgbaImage::from_pixel(6, 6, Rgba([0, 0, 0, 255]));
        draw(&mut canvas, Rectangle::new(2, 2, 4, 5), &Tile::uniform(Rgba([255, 0, 0, 255])), 255);

        for (x, y, p) in canvas.enumerate_pixels() {
            let inside = (2..4).contains(&x) && (2..5).contains(&y);
            let expected = if inside { Rgba([255, 0, 0, 255]) } else { Rgba([0, 0, 0, 255]) };
            assert_eq!(*p, expected, "pixel ({}, {})", x, y);
        }
    }

    #[test]
    fn test_draw_image_aligned_and_clipped() {
        let mut src = RgbaImage::from_pixel(2, 2, Rgba([0, 255, 0, 255]));
        src.put_pixel(0, 0, Rgba([0, 0, 255, 255]));
        let tile = Tile::from_image(src).unwrap();

        let mut canvas = RgbaImage::from_pixel(5, 5, Rgba([0, 0, 0, 255]));
        // destination larger than the tile: only the tile's 2x2 is painted
        draw(&mut canvas, Rectangle::new(1, 1, 4, 4), &tile, 255);

        assert_eq!(*canvas.get_pixel(1, 1), Rgba([0, 0, 255, 255]));
        assert_eq!(*canvas.get_pixel(2, 2), Rgba([0, 255, 0, 255]));
        assert_eq!(*canvas.get_pixel(3, 3), Rgba([0, 0, 0, 255]));
        assert_eq!(*canvas.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_draw_outside_canvas_is_noop() {
        let mut canvas = RgbaImage::from_pixel(3, 3, Rgba([1, 1, 1, 255]));
        let before = canvas.clone();
        draw(&mut canvas, Rectangle::new(3, 0, 9, 3), &Tile::uniform(Rgba([255, 0, 0, 255])), 255);
        assert_eq!(canvas, before);
    }
}
