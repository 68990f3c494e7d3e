//! pixtrace-export: Pure SVG serializers (sans-IO)
//!
//! Turns pipeline output into standalone SVG documents: traced paths as
//! filled polygons, or a raster buffer embedded as a base64 PNG.

pub mod svg;

pub use svg::{
    ExportError, SvgMetadata, encode_png, path_data, png_data_uri, to_embed_svg, to_trace_svg,
};
