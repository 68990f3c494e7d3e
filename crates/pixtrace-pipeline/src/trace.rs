//! The per-image trace pipeline.
//!
//! Stages, in order:
//!
//! 1. composite alpha against the configured background
//! 2. BT.601 luma and binary threshold (with auto-inversion)
//! 3. contour extraction in the configured
//!    [`ContourMode`](crate::contour::ContourMode)
//! 4. area and vertex-count filtering
//! 5. RDP simplification, dropping results under 3 points
//! 6. color sampling under each kept region
//!
//! Either every stage succeeds and a full [`TraceOutput`] is returned, or
//! the call fails with a single [`PipelineError`] before any output is
//! built. All error sources are in the configuration, which is validated
//! up front.

use std::borrow::Cow;
use std::collections::HashSet;

use crate::buffer::{ChannelLayout, PixelBuffer};
use crate::composite::composite;
use crate::contour::ContourExtractor;
use crate::diagnostics::{
    self, Clock, NoClock, StageDiagnostics, StageMetrics, TraceDiagnostics, TraceSummary,
};
use crate::sample::sample_region;
use crate::simplify::simplify;
use crate::threshold::{count_foreground, threshold, to_luma};
use crate::types::{
    Color, GrayscaleFill, PathRecord, PipelineError, Polygon, TraceConfig, TraceOutput,
};

/// Trace an image into filled polygon paths.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] or
/// [`PipelineError::InvalidColorFormat`] if `config` fails
/// [`TraceConfig::validate`].
pub fn trace(buffer: &PixelBuffer, config: &TraceConfig) -> Result<TraceOutput, PipelineError> {
    trace_staged(buffer, config, &NoClock).map(|(output, _)| output)
}

/// Whether paths are filled with sampled colors for this buffer and
/// policy. Single-channel images fill black unless sampling is asked for.
#[must_use]
pub const fn samples_color(layout: ChannelLayout, fill: GrayscaleFill) -> bool {
    !matches!(layout, ChannelLayout::Gray) || matches!(fill, GrayscaleFill::Sampled)
}

/// Keep a contour iff its area and vertex count both exceed the minimums.
#[must_use]
pub fn keep_region(polygon: &Polygon, min_area: f64, min_vertices: usize) -> bool {
    polygon.area() > min_area && polygon.len() > min_vertices
}

/// Run every stage, timing each with `clock`.
#[allow(clippy::too_many_lines)]
pub(crate) fn trace_staged<C: Clock>(
    buffer: &PixelBuffer,
    config: &TraceConfig,
    clock: &C,
) -> Result<(TraceOutput, TraceDiagnostics), PipelineError> {
    config.validate()?;
    let total_start = clock.now();

    // Stage 1: composite.
    let start = clock.now();
    let background = config.background()?;
    let flattened = composite(buffer, background);
    let composite_diag = StageDiagnostics {
        duration: clock.elapsed(start),
        metrics: StageMetrics::Composite {
            input_channels: buffer.channels(),
            composited: matches!(flattened, Cow::Owned(_)),
            background: background.to_hex(),
        },
    };

    // Stage 2: threshold.
    let start = clock.now();
    let gray = to_luma(&flattened);
    let binary = threshold(&gray, config.threshold, config.invert, config.auto_invert);
    let threshold_diag = StageDiagnostics {
        duration: clock.elapsed(start),
        metrics: StageMetrics::Threshold {
            level: config.threshold,
            mean_luminance: binary.mean_luminance,
            inverted: binary.inverted,
            auto_inverted: binary.auto_inverted,
            foreground_pixels: count_foreground(&binary.mask),
            total_pixels: buffer.dimensions().pixel_count(),
        },
    };
    log::debug!(
        "threshold {} mean={:.1} inverted={} auto={}",
        config.threshold,
        binary.mean_luminance,
        binary.inverted,
        binary.auto_inverted,
    );

    // Stage 3: contours.
    let start = clock.now();
    let contours = config.contour_mode.extract(&binary.mask);
    let stats = diagnostics::contour_stats(&contours);
    let contour_diag = StageDiagnostics {
        duration: clock.elapsed(start),
        metrics: StageMetrics::ContourExtraction {
            mode: config.contour_mode,
            contour_count: contours.len(),
            total_point_count: stats.total,
            min_contour_points: stats.min,
            max_contour_points: stats.max,
            mean_contour_points: stats.mean,
        },
    };
    let contour_count = contours.len();

    // Stage 4: filter.
    let start = clock.now();
    let kept: Vec<Polygon> = contours
        .into_iter()
        .filter(|c| keep_region(c, config.min_area, config.min_vertices))
        .collect();
    let filter_diag = StageDiagnostics {
        duration: clock.elapsed(start),
        metrics: StageMetrics::Filtering {
            min_area: config.min_area,
            min_vertices: config.min_vertices,
            kept: kept.len(),
            dropped: contour_count - kept.len(),
        },
    };

    // Stage 5: simplify. Each simplified ring stays paired with the
    // full-resolution boundary it came from, which the sampler fills.
    let start = clock.now();
    let kept_count = kept.len();
    let points_before = diagnostics::total_points(&kept);
    let simplified: Vec<(Polygon, Polygon)> = kept
        .into_iter()
        .map(|full| (simplify(&full, config.simplify_tolerance), full))
        .filter(|(s, _)| s.len() >= 3)
        .collect();
    let points_after: usize = simplified.iter().map(|(s, _)| s.len()).sum();
    let simplify_diag = StageDiagnostics {
        duration: clock.elapsed(start),
        metrics: StageMetrics::Simplification {
            tolerance: config.simplify_tolerance,
            polygon_count: simplified.len(),
            degenerate_count: kept_count - simplified.len(),
            points_before,
            points_after,
            reduction_ratio: diagnostics::reduction_ratio(points_before, points_after),
        },
    };

    // Stage 6: color.
    let start = clock.now();
    let sampled = samples_color(buffer.layout(), config.grayscale_fill);
    let paths: Vec<PathRecord> = simplified
        .into_iter()
        .map(|(polygon, full)| {
            let color = if sampled {
                sample_region(&flattened, &full).unwrap_or(Color::BLACK)
            } else {
                Color::BLACK
            };
            PathRecord { polygon, color }
        })
        .collect();
    let distinct_colors = paths.iter().map(|p| p.color).collect::<HashSet<_>>().len();
    let color_diag = StageDiagnostics {
        duration: clock.elapsed(start),
        metrics: StageMetrics::ColorSampling {
            sampled,
            path_count: paths.len(),
            distinct_colors,
        },
    };

    let total_duration = clock.elapsed(total_start);
    log::debug!(
        "traced {}x{}: {} contours -> {} paths",
        buffer.width(),
        buffer.height(),
        contour_count,
        paths.len(),
    );

    let summary = TraceSummary {
        image_width: buffer.width(),
        image_height: buffer.height(),
        pixel_count: buffer.dimensions().pixel_count(),
        contour_count,
        path_count: paths.len(),
        final_point_count: points_after,
    };

    let output = TraceOutput {
        dimensions: buffer.dimensions(),
        paths,
        contour_count,
        inverted: binary.inverted,
        auto_inverted: binary.auto_inverted,
    };

    let diagnostics = TraceDiagnostics {
        composite: composite_diag,
        threshold: threshold_diag,
        contour_extraction: contour_diag,
        filtering: filter_diag,
        simplification: simplify_diag,
        color_sampling: color_diag,
        total_duration,
        summary,
    };

    Ok((output, diagnostics))
}
