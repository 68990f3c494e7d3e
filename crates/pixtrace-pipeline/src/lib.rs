//! pixtrace-pipeline: Pure raster tracing and image analysis (sans-IO).
//!
//! Converts pixel buffers into filled polygon paths through:
//! alpha composite -> BT.601 luma -> threshold (auto-invert) ->
//! contour extraction -> area filter -> simplification -> color sampling.
//!
//! Independently, [`analyze()`] describes an image and [`recommend()`]
//! scores that description into a trace-or-embed suggestion.
//!
//! This crate has **no I/O dependencies** -- it operates on decoded
//! in-memory pixel buffers and returns structured data. Decoding lives
//! with the caller; SVG serialization lives in `pixtrace-export`.

pub mod analyze;
pub mod buffer;
pub mod composite;
pub mod contour;
pub mod diagnostics;
pub mod recommend;
pub mod sample;
pub mod simplify;
pub mod threshold;
pub mod trace;
pub mod types;

pub use analyze::{Complexity, ImageAnalysis, analyze};
pub use buffer::{ChannelLayout, PixelBuffer};
pub use contour::{ContourExtractor, ContourMode};
pub use diagnostics::{Clock, TraceDiagnostics, trace_with_diagnostics};
pub use recommend::{Method, Recommendation, recommend};
pub use trace::trace;
pub use types::{
    Color, Dimensions, GrayscaleFill, PathRecord, PipelineError, Point, Polygon, TraceConfig,
    TraceOutput,
};
