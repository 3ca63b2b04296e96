//! Synthetic test canvas.
//!
//! A white raster tiled with random color swatches so the JPEG encoder has
//! real entropy to chew on, plus a `Speed Test Image - WxH` caption in the
//! top-left area.

use image::{Rgb, RgbImage};
use rand::Rng;

/// Grid pitch in pixels.
pub const CELL_SIZE: u32 = 50;
/// Side of the colored square drawn at the top-left of every cell.
pub const SWATCH_SIZE: u32 = 25;

const LABEL_ORIGIN: (u32, u32) = (50, 50);
const LABEL_SCALE: u32 = 2;
const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// Build the test canvas for the given dimensions.
///
/// Callers validate dimensions first; a zero-sized canvas is simply empty.
pub fn render_canvas<R: Rng + ?Sized>(width: u32, height: u32, rng: &mut R) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(width, height, WHITE);

    for cell_x in (0..width).step_by(CELL_SIZE as usize) {
        for cell_y in (0..height).step_by(CELL_SIZE as usize) {
            let color = Rgb([rng.random(), rng.random(), rng.random()]);
            fill_rect(&mut canvas, cell_x, cell_y, SWATCH_SIZE, SWATCH_SIZE, color);
        }
    }

    draw_label(&mut canvas, &caption(width, height));
    canvas
}

/// Caption drawn onto the canvas.
pub fn caption(width: u32, height: u32) -> String {
    format!("Speed Test Image - {}", dimension_label(width, height))
}

/// The `"{width}x{height}"` label used on the canvas and in the transfer log.
pub fn dimension_label(width: u32, height: u32) -> String {
    format!("{}x{}", width, height)
}

fn fill_rect(canvas: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    let x_end = x.saturating_add(w).min(canvas.width());
    let y_end = y.saturating_add(h).min(canvas.height());
    for px in x..x_end {
        for py in y..y_end {
            canvas.put_pixel(px, py, color);
        }
    }
}

/// Draw `text` with the built-in bitmap font. Unknown characters are skipped
/// but still advance the cursor.
fn draw_label(canvas: &mut RgbImage, text: &str) {
    let (mut cursor_x, origin_y) = LABEL_ORIGIN;
    let advance = (GLYPH_WIDTH + 1) * LABEL_SCALE;

    for ch in text.chars() {
        if let Some(rows) = glyph(ch) {
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if bits & (0x10 >> col) != 0 {
                        fill_rect(
                            canvas,
                            cursor_x + col * LABEL_SCALE,
                            origin_y + row as u32 * LABEL_SCALE,
                            LABEL_SCALE,
                            LABEL_SCALE,
                            BLACK,
                        );
                    }
                }
            }
        }
        cursor_x += advance;
    }
}

/// 5x7 glyphs, one byte per row, bit 4 is the leftmost column. Covers the
/// caption alphabet; space has no glyph.
fn glyph(ch: char) -> Option<[u8; GLYPH_HEIGHT as usize]> {
    let rows = match ch {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        'x' => [0x00, 0x00, 0x11, 0x0A, 0x04, 0x0A, 0x11],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'a' => [0x00, 0x00, 0x0E, 0x01, 0x0F, 0x11, 0x0F],
        'd' => [0x01, 0x01, 0x0D, 0x13, 0x11, 0x11, 0x0F],
        'e' => [0x00, 0x00, 0x0E, 0x11, 0x1F, 0x10, 0x0E],
        'g' => [0x00, 0x0F, 0x11, 0x11, 0x0F, 0x01, 0x0E],
        'm' => [0x00, 0x00, 0x1A, 0x15, 0x15, 0x11, 0x11],
        'p' => [0x00, 0x00, 0x1E, 0x11, 0x1E, 0x10, 0x10],
        's' => [0x00, 0x00, 0x0E, 0x10, 0x0E, 0x01, 0x1E],
        't' => [0x08, 0x08, 0x1C, 0x08, 0x08, 0x09, 0x06],
        _ => return None,
    };
    Some(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn canvas_has_requested_dimensions() {
        let mut rng = StdRng::seed_from_u64(7);
        let canvas = render_canvas(123, 45, &mut rng);
        assert_eq!(canvas.dimensions(), (123, 45));
    }

    #[test]
    fn swatch_gap_stays_white() {
        let mut rng = StdRng::seed_from_u64(7);
        let canvas = render_canvas(200, 40, &mut rng);
        // Column 30 falls between the swatch (0..25) and the next cell (50..).
        for y in 0..40 {
            assert_eq!(*canvas.get_pixel(30, y), WHITE);
        }
    }

    #[test]
    fn swatches_are_uniform_inside_cell() {
        let mut rng = StdRng::seed_from_u64(11);
        let canvas = render_canvas(100, 100, &mut rng);
        let corner = *canvas.get_pixel(0, 0);
        assert_eq!(*canvas.get_pixel(24, 24), corner);
        assert_eq!(*canvas.get_pixel(12, 3), corner);
    }

    #[test]
    fn same_seed_same_canvas() {
        let a = render_canvas(300, 200, &mut StdRng::seed_from_u64(42));
        let b = render_canvas(300, 200, &mut StdRng::seed_from_u64(42));
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn label_is_drawn_in_black() {
        let canvas = render_canvas(400, 200, &mut StdRng::seed_from_u64(3));
        // Glyph rows span y=50..64 at scale 2.
        let black = (50..200)
            .flat_map(|x| (50..64).map(move |y| (x, y)))
            .filter(|&(x, y)| *canvas.get_pixel(x, y) == BLACK)
            .count();
        assert!(black > 0);
    }

    #[test]
    fn tiny_canvas_clips_label() {
        let canvas = render_canvas(10, 10, &mut StdRng::seed_from_u64(1));
        assert_eq!(canvas.dimensions(), (10, 10));
    }

    #[test]
    fn dimension_label_format() {
        assert_eq!(dimension_label(1920, 1080), "1920x1080");
    }

    #[test]
    fn caption_is_fully_drawable() {
        let text = caption(1920, 1080);
        assert_eq!(text, "Speed Test Image - 1920x1080");
        for ch in text.chars().filter(|ch| *ch != ' ') {
            assert!(glyph(ch).is_some(), "missing glyph for {:?}", ch);
        }
    }

    #[test]
    fn caption_reaches_dimension_digits() {
        // "Speed Test Image - " is 19 cells of 12px, so the digits start at x=278.
        let canvas = render_canvas(600, 100, &mut StdRng::seed_from_u64(8));
        let black = (278..400)
            .flat_map(|x| (50..64).map(move |y| (x, y)))
            .filter(|&(x, y)| *canvas.get_pixel(x, y) == BLACK)
            .count();
        assert!(black > 0);
    }
}
