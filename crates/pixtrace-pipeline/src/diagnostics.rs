//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! [`trace_with_diagnostics`] runs the same stages as
//! [`trace`](crate::trace()) and records, per stage, a wall-clock
//! duration plus stage-specific metrics. Time comes from a caller-supplied
//! [`Clock`] so the pipeline itself never touches a platform time source.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::buffer::PixelBuffer;
use crate::contour::ContourMode;
use crate::types::{PipelineError, Polygon, TraceConfig, TraceOutput};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// A monotonic time source.
///
/// Native callers back this with `std::time::Instant`; tests can use a
/// fake that advances by a fixed step.
pub trait Clock {
    /// Opaque timestamp.
    type Instant: Copy;

    /// Current timestamp.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: Self::Instant) -> Duration;
}

/// A clock that never advances. Used when nobody reads the timings.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClock;

impl Clock for NoClock {
    type Instant = ();

    fn now(&self) -> Self::Instant {}

    fn elapsed(&self, _since: Self::Instant) -> Duration {
        Duration::ZERO
    }
}

/// Diagnostics collected from a single trace run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceDiagnostics {
    /// Stage 1: alpha compositing.
    pub composite: StageDiagnostics,
    /// Stage 2: luma conversion and thresholding.
    pub threshold: StageDiagnostics,
    /// Stage 3: contour extraction.
    pub contour_extraction: StageDiagnostics,
    /// Stage 4: area and vertex-count filtering.
    pub filtering: StageDiagnostics,
    /// Stage 5: RDP simplification.
    pub simplification: StageDiagnostics,
    /// Stage 6: per-region color sampling.
    pub color_sampling: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: TraceSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics (counts, sizes, etc.).
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Alpha compositing metrics.
    Composite {
        /// Channel count of the input buffer.
        input_channels: u8,
        /// Whether an alpha channel was flattened.
        composited: bool,
        /// Background color as `#rrggbb`.
        background: String,
    },
    /// Thresholding metrics.
    Threshold {
        /// Threshold level.
        level: u8,
        /// Mean luminance of the input.
        mean_luminance: f64,
        /// Whether polarity was inverted.
        inverted: bool,
        /// Whether inversion came from the mean-luminance check.
        auto_inverted: bool,
        /// Foreground pixels in the mask.
        foreground_pixels: u64,
        /// Total pixel count for computing coverage.
        total_pixels: u64,
    },
    /// Contour extraction metrics.
    ContourExtraction {
        /// Which boundaries were requested.
        mode: ContourMode,
        /// Number of contours found.
        contour_count: usize,
        /// Total number of points across all contours.
        total_point_count: usize,
        /// Minimum points in any single contour.
        min_contour_points: usize,
        /// Maximum points in any single contour.
        max_contour_points: usize,
        /// Mean points per contour.
        mean_contour_points: f64,
    },
    /// Area and vertex-count filtering metrics.
    Filtering {
        /// Area a region must exceed.
        min_area: f64,
        /// Vertex count a boundary must exceed.
        min_vertices: usize,
        /// Regions kept.
        kept: usize,
        /// Regions dropped.
        dropped: usize,
    },
    /// Simplification metrics.
    Simplification {
        /// RDP tolerance in pixels.
        tolerance: f64,
        /// Polygons left after dropping degenerate results.
        polygon_count: usize,
        /// Polygons that fell below 3 points and were dropped.
        degenerate_count: usize,
        /// Total points before simplification.
        points_before: usize,
        /// Total points after simplification.
        points_after: usize,
        /// Reduction ratio: `1.0 - (after / before)`.
        reduction_ratio: f64,
    },
    /// Color sampling metrics.
    ColorSampling {
        /// Whether colors were sampled or fixed to black.
        sampled: bool,
        /// Number of paths emitted.
        path_count: usize,
        /// Distinct fill colors among the paths.
        distinct_colors: usize,
    },
}

/// High-level summary counts for the entire pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Contours found before filtering.
    pub contour_count: usize,
    /// Paths in the output.
    pub path_count: usize,
    /// Vertices across all output paths.
    pub final_point_count: usize,
}

impl TraceDiagnostics {
    /// Stages in pipeline order, labelled for display.
    #[must_use]
    pub fn stages(&self) -> [(&'static str, &StageDiagnostics); 6] {
        [
            ("Composite", &self.composite),
            ("Threshold", &self.threshold),
            ("Contour Extraction", &self.contour_extraction),
            ("Filtering", &self.filtering),
            ("Simplification", &self.simplification),
            ("Color Sampling", &self.color_sampling),
        ]
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Trace Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Contours: {}  |  Paths: {}  |  Final points: {}",
            self.summary.contour_count, self.summary.path_count, self.summary.final_point_count,
        ));

        lines.join("\n")
    }
}

/// Trace an image and collect per-stage diagnostics.
///
/// Produces exactly the [`TraceOutput`] that [`trace`](crate::trace())
/// would.
///
/// # Errors
///
/// Same as [`trace`](crate::trace()).
pub fn trace_with_diagnostics<C: Clock>(
    buffer: &PixelBuffer,
    config: &TraceConfig,
    clock: &C,
) -> Result<(TraceOutput, TraceDiagnostics), PipelineError> {
    crate::trace::trace_staged(buffer, config, clock)
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Composite {
            input_channels,
            composited,
            background,
        } => {
            if *composited {
                format!("{input_channels}ch over {background}")
            } else {
                format!("{input_channels}ch, no alpha")
            }
        }
        StageMetrics::Threshold {
            level,
            mean_luminance,
            inverted,
            auto_inverted,
            foreground_pixels,
            total_pixels,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let coverage = if *total_pixels > 0 {
                *foreground_pixels as f64 / *total_pixels as f64 * 100.0
            } else {
                0.0
            };
            let polarity = match (inverted, auto_inverted) {
                (false, _) => "normal",
                (true, false) => "inverted",
                (true, true) => "auto-inverted",
            };
            format!(
                "T={level} mean={mean_luminance:.1} {polarity} fg={foreground_pixels} ({coverage:.1}%)",
            )
        }
        StageMetrics::ContourExtraction {
            mode,
            contour_count,
            total_point_count,
            min_contour_points,
            max_contour_points,
            mean_contour_points,
        } => {
            format!(
                "{mode:?} {contour_count} contours, {total_point_count} pts (min={min_contour_points} max={max_contour_points} mean={mean_contour_points:.1})",
            )
        }
        StageMetrics::Filtering {
            min_area,
            min_vertices,
            kept,
            dropped,
        } => {
            format!("area>{min_area:.1} verts>{min_vertices} kept={kept} dropped={dropped}")
        }
        StageMetrics::Simplification {
            tolerance,
            degenerate_count,
            points_before,
            points_after,
            reduction_ratio,
            ..
        } => {
            format!(
                "tol={tolerance:.2} {points_before}->{points_after} pts ({:.1}% reduction) degenerate={degenerate_count}",
                reduction_ratio * 100.0,
            )
        }
        StageMetrics::ColorSampling {
            sampled,
            path_count,
            distinct_colors,
        } => {
            let how = if *sampled { "sampled" } else { "black" };
            format!("{how} {path_count} paths, {distinct_colors} colors")
        }
    }
}

/// Statistics for a set of contour polygons.
pub(crate) struct ContourStats {
    /// Total number of points across all contours.
    pub total: usize,
    /// Minimum number of points in any single contour.
    pub min: usize,
    /// Maximum number of points in any single contour.
    pub max: usize,
    /// Mean number of points per contour.
    pub mean: f64,
}

/// Compute contour statistics from a set of polygons.
pub(crate) fn contour_stats(contours: &[Polygon]) -> ContourStats {
    let total = total_points(contours);
    let min = contours.iter().map(Polygon::len).min().unwrap_or(0);
    let max = contours.iter().map(Polygon::len).max().unwrap_or(0);
    #[allow(clippy::cast_precision_loss)]
    let mean = if contours.is_empty() {
        0.0
    } else {
        total as f64 / contours.len() as f64
    };
    ContourStats {
        total,
        min,
        max,
        mean,
    }
}

/// Total points across a slice of polygons.
pub(crate) fn total_points(polygons: &[Polygon]) -> usize {
    polygons.iter().map(Polygon::len).sum()
}

/// `1.0 - after / before`, zero when nothing went in.
pub(crate) fn reduction_ratio(before: usize, after: usize) -> f64 {
    if before == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = 1.0 - after as f64 / before as f64;
    ratio
}
