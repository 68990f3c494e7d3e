//! Shared types for the pixtrace tracing pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::contour::ContourMode;

/// Re-export `GrayImage` so downstream crates can reference masks and
/// luma rasters without depending on `image` directly.
pub use image::GrayImage;

/// A 2D point on the integer pixel grid, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: i32,
    /// Vertical position (pixels from top edge).
    pub y: i32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        dx.hypot(dy)
    }
}

/// A closed boundary polygon in pixel coordinates.
///
/// The last point implicitly connects back to the first; the closing
/// point is never stored twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polygon(Vec<Point>);

impl Polygon {
    /// Create a new polygon from its vertices in traversal order.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polygon has no vertices.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of vertices.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all vertices.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Area enclosed by the ring, via the shoelace formula.
    ///
    /// Computed over vertex coordinates (not pixel counts), so a
    /// boundary traced around an `n×n` block of pixels reports
    /// `(n-1)²`. Orientation does not affect the result.
    #[must_use]
    pub fn area(&self) -> f64 {
        let points = &self.0;
        if points.len() < 3 {
            return 0.0;
        }
        let twice: i64 = points
            .iter()
            .zip(points.iter().cycle().skip(1))
            .map(|(a, b)| i64::from(a.x) * i64::from(b.y) - i64::from(b.x) * i64::from(a.y))
            .sum();
        #[allow(clippy::cast_precision_loss)]
        let area = twice.unsigned_abs() as f64 / 2.0;
        area
    }
}

/// An opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Color {
    /// Opaque white, the default compositing background.
    pub const WHITE: Self = Self::new(255, 255, 255);

    /// Opaque black, the fill used for single-channel traces.
    pub const BLACK: Self = Self::new(0, 0, 0);

    /// Create a color from its channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a `#RRGGBB` hex string. The leading `#` is optional.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidColorFormat`] unless the input is
    /// exactly six hex digits after the optional `#`.
    pub fn from_hex(input: &str) -> Result<Self, PipelineError> {
        let digits = input.strip_prefix('#').unwrap_or(input);
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(PipelineError::InvalidColorFormat(input.to_owned()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| PipelineError::InvalidColorFormat(input.to_owned()))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Lowercase `#rrggbb` form, as used in SVG `fill` attributes.
    #[must_use]
    pub fn to_hex(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total pixel count.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// A simplified polygon paired with its fill color: one SVG `<path>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRecord {
    /// Simplified boundary, at least 3 vertices.
    pub polygon: Polygon,
    /// Fill color.
    pub color: Color,
}

/// How paths are filled when the source image has a single channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GrayscaleFill {
    /// Fill every path with `#000000`.
    #[default]
    Black,
    /// Fill with the mean gray level under the region.
    Sampled,
}

/// Configuration for the tracing pipeline.
///
/// The background color is kept as the caller-supplied string and parsed
/// when the pipeline runs, so a malformed value surfaces as
/// [`PipelineError::InvalidColorFormat`] for that image only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Binary threshold in `0..=255`.
    pub threshold: u8,

    /// Ramer-Douglas-Peucker tolerance in pixels. Must be finite and
    /// greater than zero.
    pub simplify_tolerance: f64,

    /// Force inverted polarity (foreground = pixels at or below the
    /// threshold).
    pub invert: bool,

    /// Invert automatically when the mean luminance is below
    /// [`threshold::AUTO_INVERT_MEAN`](crate::threshold::AUTO_INVERT_MEAN).
    pub auto_invert: bool,

    /// Background for alpha compositing as `#RRGGBB`. `None` means white.
    pub background_color: Option<String>,

    /// Which boundaries the contour extractor returns.
    pub contour_mode: ContourMode,

    /// Regions whose enclosed area is not above this are dropped.
    pub min_area: f64,

    /// Regions whose boundary has no more than this many vertices are
    /// dropped.
    pub min_vertices: usize,

    /// Fill policy for single-channel images.
    pub grayscale_fill: GrayscaleFill,
}

impl TraceConfig {
    /// Default binary threshold.
    pub const DEFAULT_THRESHOLD: u8 = 128;
    /// Default simplification tolerance in pixels.
    pub const DEFAULT_SIMPLIFY_TOLERANCE: f64 = 2.0;
    /// Default minimum region area.
    pub const DEFAULT_MIN_AREA: f64 = 50.0;
    /// Default minimum boundary vertex count (exclusive).
    pub const DEFAULT_MIN_VERTICES: usize = 3;

    /// Check invariants that the field types cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] for a non-finite or
    /// non-positive tolerance or a negative minimum area, and
    /// [`PipelineError::InvalidColorFormat`] for a malformed background.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.simplify_tolerance.is_finite() || self.simplify_tolerance <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "simplify tolerance must be finite and > 0, got {}",
                self.simplify_tolerance,
            )));
        }
        if self.min_area.is_nan() || self.min_area < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "minimum area must be >= 0, got {}",
                self.min_area,
            )));
        }
        self.background()?;
        Ok(())
    }

    /// The parsed compositing background, white when unset.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidColorFormat`] if the configured
    /// string is not a `#RRGGBB` color.
    pub fn background(&self) -> Result<Color, PipelineError> {
        self.background_color
            .as_deref()
            .map_or(Ok(Color::WHITE), Color::from_hex)
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
            simplify_tolerance: Self::DEFAULT_SIMPLIFY_TOLERANCE,
            invert: false,
            auto_invert: true,
            background_color: None,
            contour_mode: ContourMode::default(),
            min_area: Self::DEFAULT_MIN_AREA,
            min_vertices: Self::DEFAULT_MIN_VERTICES,
            grayscale_fill: GrayscaleFill::default(),
        }
    }
}

/// Result of tracing one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceOutput {
    /// Source image dimensions, used for the SVG `viewBox`.
    pub dimensions: Dimensions,
    /// Paths in contour extraction order.
    pub paths: Vec<PathRecord>,
    /// Number of contours found before area and vertex filtering.
    pub contour_count: usize,
    /// Whether foreground was taken as the dark side of the threshold.
    pub inverted: bool,
    /// Whether the inversion came from the mean-luminance check rather
    /// than the caller's flag.
    pub auto_inverted: bool,
}

/// Errors that can occur in the pipeline.
///
/// Simplified polygons with fewer than three points are dropped, not
/// reported, so there is no empty-region variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum PipelineError {
    /// A background color was not of the form `#RRGGBB`.
    #[error("invalid color format: {0:?} (expected #RRGGBB)")]
    InvalidColorFormat(String),

    /// A pixel buffer had a channel count other than 1, 3, or 4.
    #[error("unsupported channel layout: {0} channels (expected 1, 3, or 4)")]
    UnsupportedChannelLayout(u8),

    /// Raw sample data did not match `width * height * channels`.
    #[error("pixel buffer holds {found} bytes, expected {expected}")]
    BufferSizeMismatch {
        /// Length implied by the dimensions and layout.
        expected: usize,
        /// Length actually supplied.
        found: usize,
    },

    /// Pipeline configuration is invalid.
    #[error("invalid trace configuration: {0}")]
    InvalidConfig(String),
}
