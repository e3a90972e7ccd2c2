use image::{ImageResult, Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect as ImageRect;
use std::path::Path;

/// Maps a utilisation ratio onto green (idle) .. red (full) .. magenta (overflow).
fn utilization_color(ratio: f64) -> Rgb<u8> {
    if ratio > 1.0 {
        let t = ((ratio - 1.0).min(1.0) * 255.0) as u8;
        return Rgb([255, 0, t]);
    }
    let r = (ratio.clamp(0.0, 1.0) * 255.0) as u8;
    Rgb([r, 255 - r, 30])
}

/// Renders a per-gcell utilisation map; `utilization` is row-major with
/// `x_size` entries per row and row 0 at the bottom of the image.
pub fn draw_congestion_map(
    utilization: &[f64],
    x_size: usize,
    y_size: usize,
    filename: &str,
    width: u32,
    height: u32,
) -> ImageResult<()> {
    let mut img = RgbImage::from_pixel(width, height, Rgb([20, 20, 20]));
    if x_size == 0 || y_size == 0 {
        return img.save(Path::new(filename));
    }

    let cell_w = (width as f64 / x_size as f64).max(1.0);
    let cell_h = (height as f64 / y_size as f64).max(1.0);

    for y in 0..y_size {
        for x in 0..x_size {
            let ratio = utilization[y * x_size + x];
            let px = (x as f64 * cell_w) as i32;
            let py = (height as f64 - (y as f64 + 1.0) * cell_h) as i32;
            let rect = ImageRect::at(px, py).of_size(cell_w.ceil() as u32, cell_h.ceil() as u32);
            draw_filled_rect_mut(&mut img, rect, utilization_color(ratio));
        }
    }
    img.save(Path::new(filename))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_is_visually_distinct() {
        assert_eq!(utilization_color(0.0), Rgb([0, 255, 30]));
        assert_eq!(utilization_color(1.0), Rgb([255, 0, 30]));
        assert_eq!(utilization_color(3.0), Rgb([255, 0, 255]));
    }
}
