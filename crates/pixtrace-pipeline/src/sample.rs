//! Region color sampling: mean color under a polygon.
//!
//! The polygon is rasterized into a temporary full-resolution mask
//! (interior filled, boundary pixels included, matching how the
//! boundary was traced), and each color channel is averaged over the
//! masked pixels. Means are truncated to 8 bits.

use image::{GrayImage, Luma};
use imageproc::drawing::{draw_line_segment_mut, draw_polygon_mut};

use crate::buffer::{ChannelLayout, PixelBuffer};
use crate::threshold::FOREGROUND;
use crate::types::{Color, Polygon};

/// Rasterize `polygon` into a `width × height` mask (255 inside, 0
/// outside). Vertices outside the image are clipped.
#[must_use = "returns the rasterized mask"]
pub fn rasterize(polygon: &Polygon, width: u32, height: u32) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    let mut points: Vec<imageproc::point::Point<i32>> = polygon
        .points()
        .iter()
        .map(|p| imageproc::point::Point::new(p.x, p.y))
        .collect();
    // draw_polygon_mut rejects an explicitly closed ring.
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    let white = Luma([FOREGROUND]);
    match points.as_slice() {
        [] => {}
        [only] => {
            if let (Ok(x), Ok(y)) = (u32::try_from(only.x), u32::try_from(only.y))
                && x < width
                && y < height
            {
                mask.put_pixel(x, y, white);
            }
        }
        [a, b] => {
            #[allow(clippy::cast_precision_loss)]
            draw_line_segment_mut(
                &mut mask,
                (a.x as f32, a.y as f32),
                (b.x as f32, b.y as f32),
                white,
            );
        }
        ring => draw_polygon_mut(&mut mask, ring, white),
    }
    mask
}

/// Mean color of `buffer` under `mask` (non-zero = selected).
///
/// Gray buffers yield a gray color with `r = g = b = mean luma`; alpha
/// is ignored. Returns `None` if the mask selects no pixels or its size
/// differs from the buffer.
#[must_use]
pub fn mean_color_under(buffer: &PixelBuffer, mask: &GrayImage) -> Option<Color> {
    if mask.dimensions() != (buffer.width(), buffer.height()) {
        return None;
    }

    let mut sums = [0u64; 3];
    let mut count = 0u64;
    for (px, m) in buffer.pixels().zip(mask.as_raw()) {
        if *m == 0 {
            continue;
        }
        count += 1;
        match buffer.layout() {
            ChannelLayout::Gray => {
                let v = u64::from(px[0]);
                sums.iter_mut().for_each(|s| *s += v);
            }
            ChannelLayout::Rgb | ChannelLayout::Rgba => {
                for (s, &v) in sums.iter_mut().zip(&px[..3]) {
                    *s += u64::from(v);
                }
            }
        }
    }

    if count == 0 {
        return None;
    }
    let mean = |sum: u64| u8::try_from(sum / count).unwrap_or(u8::MAX);
    Some(Color::new(mean(sums[0]), mean(sums[1]), mean(sums[2])))
}

/// Mean color of `buffer` inside `polygon`.
///
/// Returns `None` if the polygon covers no pixel of the image.
#[must_use]
pub fn sample_region(buffer: &PixelBuffer, polygon: &Polygon) -> Option<Color> {
    let mask = rasterize(polygon, buffer.width(), buffer.height());
    mean_color_under(buffer, &mask)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Point;

    fn square(x0: i32, y0: i32, x1: i32, y1: i32) -> Polygon {
        Polygon::new(vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ])
    }

    fn rgb_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> [u8; 3]) -> PixelBuffer {
        image::RgbImage::from_fn(width, height, |x, y| image::Rgb(f(x, y))).into()
    }

    #[test]
    fn rasterize_includes_boundary_and_interior() {
        let mask = rasterize(&square(2, 2, 5, 5), 8, 8);
        for y in 0..8 {
            for x in 0..8 {
                let inside = (2..=5).contains(&x) && (2..=5).contains(&y);
                assert_eq!(
                    mask.get_pixel(x, y).0[0] == FOREGROUND,
                    inside,
                    "pixel ({x}, {y})",
                );
            }
        }
    }

    #[test]
    fn rasterize_handles_closed_ring_and_degenerate_input() {
        let closed = Polygon::new(vec![
            Point::new(1, 1),
            Point::new(3, 1),
            Point::new(3, 3),
            Point::new(1, 1),
        ]);
        let mask = rasterize(&closed, 5, 5);
        assert_eq!(mask.get_pixel(3, 3).0[0], FOREGROUND);

        let single = Polygon::new(vec![Point::new(2, 2)]);
        let mask = rasterize(&single, 5, 5);
        assert_eq!(crate::threshold::count_foreground(&mask), 1);

        let outside = Polygon::new(vec![Point::new(-3, 7)]);
        let mask = rasterize(&outside, 5, 5);
        assert_eq!(crate::threshold::count_foreground(&mask), 0);
    }

    #[test]
    fn uniform_region_returns_exact_color() {
        let buffer = rgb_fn(10, 10, |_, _| [12, 34, 56]);
        let color = sample_region(&buffer, &square(1, 1, 8, 8)).unwrap();
        assert_eq!(color, Color::new(12, 34, 56));
    }

    #[test]
    fn region_mean_ignores_outside_pixels() {
        // Left half red, right half blue; the square covers only the left.
        let buffer = rgb_fn(10, 10, |x, _| if x < 5 { [200, 0, 0] } else { [0, 0, 200] });
        let color = sample_region(&buffer, &square(0, 0, 4, 9)).unwrap();
        assert_eq!(color, Color::new(200, 0, 0));
    }

    #[test]
    fn mixed_region_truncates_mean() {
        // Two columns: 10 and 13 -> mean 11.5 truncated to 11.
        let buffer = rgb_fn(2, 2, |x, _| if x == 0 { [10, 10, 10] } else { [13, 13, 13] });
        let mask = GrayImage::from_pixel(2, 2, Luma([255]));
        assert_eq!(
            mean_color_under(&buffer, &mask),
            Some(Color::new(11, 11, 11))
        );
    }

    #[test]
    fn gray_buffer_yields_gray_color() {
        let buffer: PixelBuffer = GrayImage::from_pixel(6, 6, Luma([90])).into();
        let color = sample_region(&buffer, &square(0, 0, 5, 5)).unwrap();
        assert_eq!(color, Color::new(90, 90, 90));
    }

    #[test]
    fn rgba_alpha_is_ignored() {
        let buffer: PixelBuffer =
            image::RgbaImage::from_pixel(4, 4, image::Rgba([1, 2, 3, 0])).into();
        let color = sample_region(&buffer, &square(0, 0, 3, 3)).unwrap();
        assert_eq!(color, Color::new(1, 2, 3));
    }

    #[test]
    fn empty_selection_is_none() {
        let buffer = rgb_fn(4, 4, |_, _| [1, 1, 1]);
        assert_eq!(mean_color_under(&buffer, &GrayImage::new(4, 4)), None);
        assert_eq!(mean_color_under(&buffer, &GrayImage::new(3, 3)), None);
    }
}
