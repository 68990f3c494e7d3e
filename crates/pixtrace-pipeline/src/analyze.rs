//! Image analysis: descriptive statistics that steer method choice.
//!
//! Color counting and variance run over a regular sampling grid once
//! the image exceeds [`SAMPLING_PIXEL_LIMIT`] pixels, so `num_colors`
//! is an estimate for large images. Grayscale and transparency checks
//! always scan every pixel.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::buffer::{ChannelLayout, PixelBuffer};

/// Pixel count above which color counting and variance are sampled.
pub const SAMPLING_PIXEL_LIMIT: usize = 1_000_000;

/// Coarse visual-richness bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    /// Fewer than 10 colors and variance below 1000.
    Low,
    /// Fewer than 100 colors and variance below 5000.
    Medium,
    /// Everything else.
    High,
}

impl Complexity {
    /// Bucket an image from its color count and variance.
    #[must_use]
    pub fn classify(num_colors: usize, variance: f64) -> Self {
        if num_colors < 10 && variance < 1000.0 {
            Self::Low
        } else if num_colors < 100 && variance < 5000.0 {
            Self::Medium
        } else {
            Self::High
        }
    }
}

/// Statistics describing one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAnalysis {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// `width * height`.
    pub total_pixels: u64,
    /// Whether the buffer has an alpha channel.
    pub has_alpha: bool,
    /// Whether any pixel has alpha below 255.
    pub has_transparency: bool,
    /// Single channel, or R = G = B at every pixel.
    pub is_grayscale: bool,
    /// Distinct colors (alpha ignored). An estimate when
    /// `num_colors_is_estimate` is set.
    pub num_colors: usize,
    /// Whether `num_colors` and `variance` come from a sampling grid.
    pub num_colors_is_estimate: bool,
    /// Complexity bucket.
    pub complexity: Complexity,
    /// More than 500 colors and variance above 3000.
    pub is_photo: bool,
    /// Population variance of the sampled channel values.
    pub variance: f64,
}

/// Grid stride used for an image of `pixels` pixels: 1 up to the limit,
/// then `ceil(sqrt(pixels / limit))`.
#[must_use]
pub fn sampling_stride(pixels: usize) -> usize {
    if pixels <= SAMPLING_PIXEL_LIMIT {
        return 1;
    }
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let stride = (pixels as f64 / SAMPLING_PIXEL_LIMIT as f64).sqrt().ceil() as usize;
    stride.max(1)
}

/// Analyze a pixel buffer. Deterministic for a given input.
#[must_use]
pub fn analyze(buffer: &PixelBuffer) -> ImageAnalysis {
    let width = buffer.width();
    let height = buffer.height();
    let layout = buffer.layout();

    let has_alpha = layout == ChannelLayout::Rgba;
    let has_transparency = has_alpha && buffer.pixels().any(|px| px[3] < u8::MAX);
    let is_grayscale = match layout {
        ChannelLayout::Gray => true,
        ChannelLayout::Rgb | ChannelLayout::Rgba => {
            buffer.pixels().all(|px| px[0] == px[1] && px[1] == px[2])
        }
    };

    let stride = sampling_stride(buffer.pixel_count());
    let color_stats = ColorStats::collect(buffer, stride);
    let variance = color_stats.variance();
    let num_colors = color_stats.distinct;

    let complexity = Complexity::classify(num_colors, variance);
    let is_photo = num_colors > 500 && variance > 3000.0;

    log::debug!(
        "analyzed {width}x{height}: colors={num_colors} variance={variance:.1} stride={stride} complexity={complexity:?}",
    );

    ImageAnalysis {
        width,
        height,
        total_pixels: u64::from(width) * u64::from(height),
        has_alpha,
        has_transparency,
        is_grayscale,
        num_colors,
        num_colors_is_estimate: stride > 1,
        complexity,
        is_photo,
        variance,
    }
}

/// Distinct-color count and running moments over the sampling grid.
struct ColorStats {
    distinct: usize,
    count: u64,
    sum: u64,
    sum_sq: u64,
}

impl ColorStats {
    fn collect(buffer: &PixelBuffer, stride: usize) -> Self {
        let width = buffer.width() as usize;
        let height = buffer.height() as usize;
        let channels = usize::from(buffer.channels());
        // Alpha never counts towards color identity or variance.
        let color_channels = channels.min(3);
        let raw = buffer.as_raw();

        let mut seen: HashSet<[u8; 3]> = HashSet::new();
        let mut stats = Self {
            distinct: 0,
            count: 0,
            sum: 0,
            sum_sq: 0,
        };

        for y in (0..height).step_by(stride) {
            for x in (0..width).step_by(stride) {
                let offset = (y * width + x) * channels;
                let px = &raw[offset..offset + color_channels];
                let mut key = [0u8; 3];
                key[..color_channels].copy_from_slice(px);
                seen.insert(key);
                for &v in px {
                    let v = u64::from(v);
                    stats.count += 1;
                    stats.sum += v;
                    stats.sum_sq += v * v;
                }
            }
        }

        stats.distinct = seen.len();
        stats
    }

    /// Population variance; zero for no samples.
    #[allow(clippy::cast_precision_loss)]
    fn variance(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = self.count as f64;
        let mean = self.sum as f64 / n;
        (self.sum_sq as f64 / n - mean * mean).max(0.0)
    }
}
