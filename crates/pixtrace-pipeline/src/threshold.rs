//! Grayscale conversion and binary thresholding with auto-inversion.
//!
//! Produces the two-level mask that contour extraction consumes:
//! 255 = foreground (traced), 0 = background.
//!
//! Polarity rules:
//!
//! - normal: foreground iff `luma > threshold`
//! - inverted: foreground iff `luma <= threshold`
//!
//! The mask is inverted when the caller asks for it, or (with
//! auto-inversion enabled) when the mean luminance is below
//! [`AUTO_INVERT_MEAN`], i.e. light shapes on a dark background.

use image::{GrayImage, Luma};

use crate::buffer::{ChannelLayout, PixelBuffer};

/// Mean luminance below which a dark background is assumed.
pub const AUTO_INVERT_MEAN: f64 = 127.0;

/// Foreground mask value.
pub const FOREGROUND: u8 = 255;

/// Background mask value.
pub const BACKGROUND: u8 = 0;

/// Convert a buffer to 8-bit luma using ITU-R BT.601 weights
/// (`0.299 R + 0.587 G + 0.114 B`, rounded).
///
/// The `image` crate's own `to_luma8` uses Rec. 709 weights, so this
/// is done by hand. Alpha, if present, is ignored; composite first.
#[must_use = "returns the grayscale image"]
pub fn to_luma(buffer: &PixelBuffer) -> GrayImage {
    let data: Vec<u8> = match buffer.layout() {
        ChannelLayout::Gray => buffer.as_raw().to_vec(),
        ChannelLayout::Rgb | ChannelLayout::Rgba => {
            buffer.pixels().map(|px| bt601(px[0], px[1], px[2])).collect()
        }
    };
    GrayImage::from_raw(buffer.width(), buffer.height(), data)
        .unwrap_or_else(|| GrayImage::new(buffer.width(), buffer.height()))
}

/// BT.601 luma of one pixel, rounded to the nearest integer.
#[must_use]
pub fn bt601(r: u8, g: u8, b: u8) -> u8 {
    let weighted = 299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b);
    u8::try_from((weighted + 500) / 1000).unwrap_or(u8::MAX)
}

/// Mean pixel value of a grayscale image. Zero for an empty image.
#[must_use]
pub fn mean_luminance(gray: &GrayImage) -> f64 {
    let raw = gray.as_raw();
    if raw.is_empty() {
        return 0.0;
    }
    let sum: u64 = raw.iter().map(|&v| u64::from(v)).sum();
    #[allow(clippy::cast_precision_loss)]
    let mean = sum as f64 / raw.len() as f64;
    mean
}

/// A binary mask and the polarity decision that produced it.
#[derive(Debug, Clone)]
pub struct Thresholded {
    /// Binary mask, every value in {0, 255}.
    pub mask: GrayImage,
    /// Whether foreground was taken as `luma <= threshold`.
    pub inverted: bool,
    /// Whether inversion came from the mean-luminance check rather than
    /// the explicit flag.
    pub auto_inverted: bool,
    /// Mean luminance of the input.
    pub mean_luminance: f64,
}

/// Threshold a grayscale image into a binary mask.
///
/// An explicit `invert` always inverts. Otherwise, when `auto_invert`
/// is set and the mean luminance is below [`AUTO_INVERT_MEAN`], the
/// polarity is inverted as well.
#[must_use = "returns the binary mask"]
pub fn threshold(gray: &GrayImage, level: u8, invert: bool, auto_invert: bool) -> Thresholded {
    let mean = mean_luminance(gray);
    let auto_inverted = !invert && auto_invert && mean < AUTO_INVERT_MEAN;
    let inverted = invert || auto_inverted;

    let mask = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let luma = gray.get_pixel(x, y).0[0];
        let foreground = if inverted { luma <= level } else { luma > level };
        Luma([if foreground { FOREGROUND } else { BACKGROUND }])
    });

    Thresholded {
        mask,
        inverted,
        auto_inverted,
        mean_luminance: mean,
    }
}

/// Count foreground pixels in a mask.
#[must_use]
pub fn count_foreground(mask: &GrayImage) -> u64 {
    mask.pixels()
        .map(|p| u64::from(u8::from(p.0[0] == FOREGROUND)))
        .sum()
}
