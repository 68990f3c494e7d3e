//! Pixel buffers: the decoded raster handed to the pipeline.
//!
//! Decoding is the caller's job. A [`PixelBuffer`] is an immutable grid
//! of 8-bit samples in one of three interleaved layouts. Conversions from
//! the `image` crate's buffer types are provided so callers that decode
//! with `image` can hand their result straight in.

use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, PipelineError};

/// Channel layout of a [`PixelBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelLayout {
    /// One luma channel.
    Gray,
    /// Red, green, blue.
    Rgb,
    /// Red, green, blue, alpha.
    Rgba,
}

impl ChannelLayout {
    /// Number of samples per pixel.
    #[must_use]
    pub const fn channels(self) -> u8 {
        match self {
            Self::Gray => 1,
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }

    /// Map a channel count to a layout.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnsupportedChannelLayout`] for anything
    /// other than 1, 3, or 4.
    pub const fn from_channels(channels: u8) -> Result<Self, PipelineError> {
        match channels {
            1 => Ok(Self::Gray),
            3 => Ok(Self::Rgb),
            4 => Ok(Self::Rgba),
            other => Err(PipelineError::UnsupportedChannelLayout(other)),
        }
    }
}

/// A `width × height` raster with 1, 3, or 4 interleaved 8-bit channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    dimensions: Dimensions,
    layout: ChannelLayout,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw row-major samples.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnsupportedChannelLayout`] if `channels`
    /// is not 1, 3, or 4, and [`PipelineError::BufferSizeMismatch`] if
    /// `data` is not exactly `width * height * channels` bytes.
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self, PipelineError> {
        let layout = ChannelLayout::from_channels(channels)?;
        Self::with_layout(width, height, layout, data)
    }

    /// Like [`new`](Self::new) with the layout already known.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::BufferSizeMismatch`] if the length of
    /// `data` disagrees with the dimensions.
    pub fn with_layout(
        width: u32,
        height: u32,
        layout: ChannelLayout,
        data: Vec<u8>,
    ) -> Result<Self, PipelineError> {
        let expected = width as usize * height as usize * usize::from(layout.channels());
        if data.len() != expected {
            return Err(PipelineError::BufferSizeMismatch {
                expected,
                found: data.len(),
            });
        }
        Ok(Self {
            dimensions: Dimensions { width, height },
            layout,
            data,
        })
    }

    /// Image width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.dimensions.width
    }

    /// Image height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.dimensions.height
    }

    /// Image dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Channel layout.
    #[must_use]
    pub const fn layout(&self) -> ChannelLayout {
        self.layout
    }

    /// Samples per pixel.
    #[must_use]
    pub const fn channels(&self) -> u8 {
        self.layout.channels()
    }

    /// Number of pixels.
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.dimensions.width as usize * self.dimensions.height as usize
    }

    /// Raw interleaved samples.
    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// Iterate over pixels as channel slices.
    pub fn pixels(&self) -> std::slice::ChunksExact<'_, u8> {
        self.data.chunks_exact(usize::from(self.channels()))
    }

    /// Consume the buffer and return its samples.
    #[must_use]
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }
}

impl From<GrayImage> for PixelBuffer {
    fn from(image: GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            dimensions: Dimensions { width, height },
            layout: ChannelLayout::Gray,
            data: image.into_raw(),
        }
    }
}

impl From<RgbImage> for PixelBuffer {
    fn from(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            dimensions: Dimensions { width, height },
            layout: ChannelLayout::Rgb,
            data: image.into_raw(),
        }
    }
}

impl From<RgbaImage> for PixelBuffer {
    fn from(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            dimensions: Dimensions { width, height },
            layout: ChannelLayout::Rgba,
            data: image.into_raw(),
        }
    }
}

/// Maps any decoded image onto the closest supported layout: luma stays
/// gray, luma+alpha and every other alpha-carrying format become RGBA,
/// everything else becomes RGB. Samples wider than 8 bits are narrowed.
impl From<DynamicImage> for PixelBuffer {
    fn from(image: DynamicImage) -> Self {
        match image {
            DynamicImage::ImageLuma8(gray) => gray.into(),
            DynamicImage::ImageRgb8(rgb) => rgb.into(),
            DynamicImage::ImageRgba8(rgba) => rgba.into(),
            other @ DynamicImage::ImageLuma16(_) => other.to_luma8().into(),
            other if other.color().has_alpha() => other.to_rgba8().into(),
            other => other.to_rgb8().into(),
        }
    }
}
