//! Contour extraction: boundary polygons of foreground regions.
//!
//! This module defines the [`ContourExtractor`] trait and the
//! [`ContourMode`] enum that selects which boundaries are returned.
//! Both modes use Suzuki-Abe border following via
//! `imageproc::contours::find_contours`; they differ only in which
//! borders of the resulting hierarchy they keep.
//!
//! Polygons are returned at full resolution (one vertex per boundary
//! pixel). Area and vertex-count filtering is the caller's decision, see
//! [`crate::trace`].

use image::GrayImage;
use imageproc::contours::{BorderType, Contour};
use serde::{Deserialize, Serialize};

use crate::types::{Point, Polygon};

/// Selects which boundaries the extractor returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContourMode {
    /// Outermost boundaries only; holes and anything nested inside them
    /// are ignored. Keeps the path count low for color tracing.
    #[default]
    Outer,
    /// Every boundary in the hierarchy: outer borders and hole borders
    /// at any depth. Preserves silhouettes with holes.
    Full,
}

/// Trait for contour extraction strategies.
///
/// Input: a binary mask (non-zero = foreground).
/// Output: one closed polygon per retained boundary, in a deterministic
/// order for a given mask.
pub trait ContourExtractor {
    /// Extract boundary polygons from the mask.
    fn extract(&self, mask: &GrayImage) -> Vec<Polygon>;
}

impl ContourExtractor for ContourMode {
    fn extract(&self, mask: &GrayImage) -> Vec<Polygon> {
        let contours: Vec<Contour<i32>> = imageproc::contours::find_contours(&pad(mask));
        let mode = *self;

        contours
            .into_iter()
            .filter(|c| match mode {
                Self::Outer => c.border_type == BorderType::Outer && c.parent.is_none(),
                Self::Full => true,
            })
            .filter(|c| !c.points.is_empty())
            .map(|c| to_polygon(c.points))
            .collect()
    }
}

/// Copy `mask` into a canvas one pixel larger on every side.
///
/// Border following assumes a background frame around the image; without
/// it, regions touching the edge are reported as holes of the frame.
fn pad(mask: &GrayImage) -> GrayImage {
    let mut canvas = GrayImage::new(mask.width() + 2, mask.height() + 2);
    image::imageops::replace(&mut canvas, mask, 1, 1);
    canvas
}

/// Convert padded `imageproc` points to a [`Polygon`] in mask
/// coordinates, dropping a repeated closing vertex if present.
fn to_polygon(points: Vec<imageproc::point::Point<i32>>) -> Polygon {
    let mut vertices: Vec<Point> = points
        .into_iter()
        .map(|p| Point::new(p.x - 1, p.y - 1))
        .collect();
    if vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }
    Polygon::new(vertices)
}
