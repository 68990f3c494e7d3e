//! Single-image conversion: one pixel buffer in, one SVG document out.
//!
//! Both strategies come back as the same [`Conversion`] record; the
//! trace-only counts are `None` for embedded output.

use serde::{Deserialize, Serialize};

use pixtrace_export::{ExportError, SvgMetadata, to_embed_svg, to_trace_svg};
use pixtrace_pipeline::{
    Method, PipelineError, PixelBuffer, Recommendation, TraceConfig, analyze, recommend, trace,
};

/// How the conversion method is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodSelection {
    /// Always trace.
    #[default]
    Trace,
    /// Always embed.
    Embed,
    /// Analyze the image and follow the recommendation.
    Auto,
}

/// Options for one conversion.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Method choice.
    pub method: MethodSelection,
    /// Tracing parameters. Validated for every method so a malformed
    /// background fails the same way whichever strategy runs.
    pub trace: TraceConfig,
    /// Optional `<title>` for traced documents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// A finished conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    /// The SVG document.
    pub svg: String,
    /// The method that produced it.
    pub method: Method,
    /// Contours extracted before filtering (trace only).
    pub contour_count: Option<usize>,
    /// `<path>` elements emitted (trace only).
    pub path_count: Option<usize>,
    /// The recommendation that picked the method (auto only).
    pub recommendation: Option<Recommendation>,
}

/// Why a conversion failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConvertError {
    /// The tracing pipeline rejected its input or configuration.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// SVG serialization failed.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// No pixel buffer was available for this item.
    #[error("failed to decode image: {0}")]
    Decode(String),
}

impl ConvertError {
    /// Stable tag naming the failure category.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Pipeline(PipelineError::InvalidColorFormat(_)) => "InvalidColorFormat",
            Self::Pipeline(PipelineError::UnsupportedChannelLayout(_)) => {
                "UnsupportedChannelLayout"
            }
            Self::Pipeline(PipelineError::BufferSizeMismatch { .. }) => "BufferSizeMismatch",
            Self::Pipeline(PipelineError::InvalidConfig(_)) => "InvalidConfig",
            Self::Export(ExportError::PngEncode(_)) => "PngEncode",
            Self::Decode(_) => "DecodeFailure",
        }
    }
}

/// Convert one image.
///
/// # Errors
///
/// Returns [`ConvertError::Pipeline`] for an invalid trace configuration
/// (checked for every method) and [`ConvertError::Export`] if the
/// embedded PNG cannot be encoded.
pub fn convert(buffer: &PixelBuffer, options: &ConvertOptions) -> Result<Conversion, ConvertError> {
    options.trace.validate()?;

    let (method, recommendation) = match options.method {
        MethodSelection::Trace => (Method::Trace, None),
        MethodSelection::Embed => (Method::Embed, None),
        MethodSelection::Auto => {
            let recommendation = recommend(&analyze(buffer));
            log::debug!(
                "auto method: {} (confidence {:.2}): {}",
                recommendation.method,
                recommendation.confidence,
                recommendation.reason(),
            );
            (recommendation.method, Some(recommendation))
        }
    };

    match method {
        Method::Trace => {
            let output = trace(buffer, &options.trace)?;
            let metadata = SvgMetadata {
                title: options.title.as_deref(),
                description: None,
            };
            Ok(Conversion {
                svg: to_trace_svg(output.dimensions, &output.paths, &metadata),
                method,
                contour_count: Some(output.contour_count),
                path_count: Some(output.paths.len()),
                recommendation,
            })
        }
        Method::Embed => Ok(Conversion {
            svg: to_embed_svg(buffer)?,
            method,
            contour_count: None,
            path_count: None,
            recommendation,
        }),
    }
}
