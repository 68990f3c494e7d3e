//! SVG export serializer.
//!
//! Two document shapes:
//!
//! - **trace**: one filled `<path>` per [`PathRecord`], using absolute
//!   `M x y L x y ... Z` commands on integer pixel coordinates.
//! - **embed**: a single `<image>` whose `xlink:href` is a
//!   `data:image/png;base64,...` URI of the re-encoded buffer.
//!
//! Both are written with manual string formatting so the byte layout is
//! fixed: XML declaration, root `<svg>` with `xmlns`, `width`, `height`
//! and `viewBox="0 0 W H"`, two-space indented children, no background
//! `<rect>`.
//!
//! These are pure functions with no I/O -- they return a `String`.

use std::fmt::Write;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use pixtrace_pipeline::{ChannelLayout, Dimensions, PathRecord, PixelBuffer, Polygon};

/// SVG namespace.
const SVG_NS: &str = "http://www.w3.org/2000/svg";

/// `XLink` namespace, for `xlink:href` on embedded images.
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Errors from SVG export.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    /// The buffer could not be encoded as PNG.
    #[error("PNG encoding failed: {0}")]
    PngEncode(String),
}

impl From<image::ImageError> for ExportError {
    fn from(err: image::ImageError) -> Self {
        Self::PngEncode(err.to_string())
    }
}

/// Metadata to embed in a trace document.
///
/// Both fields are optional. When present, a `<title>` and/or `<desc>`
/// element is emitted immediately after the opening `<svg>` tag. With
/// both absent the document carries paths only.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the source image filename (without extension).
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,
}

/// Build the `d` attribute for a closed polygon.
///
/// Returns `None` for polygons with fewer than 3 points, which cannot
/// enclose an area.
///
/// # Examples
///
/// ```
/// use pixtrace_pipeline::{Point, Polygon};
/// use pixtrace_export::path_data;
///
/// let triangle = Polygon::new(vec![
///     Point::new(1, 2),
///     Point::new(10, 2),
///     Point::new(5, 9),
/// ]);
/// assert_eq!(path_data(&triangle).as_deref(), Some("M 1 2 L 10 2 L 5 9 Z"));
/// ```
#[must_use]
pub fn path_data(polygon: &Polygon) -> Option<String> {
    let points = polygon.points();
    let (first, rest) = points.split_first()?;
    if points.len() < 3 {
        return None;
    }

    let mut d = format!("M {} {}", first.x, first.y);
    for p in rest {
        let _ = write!(d, " L {} {}", p.x, p.y);
    }
    d.push_str(" Z");
    Some(d)
}

/// Escape the five XML special characters for safe embedding in element
/// text content and attribute values.
///
/// Handles `&` (must be first), `<`, `>`, `"`, and `'`.
fn xml_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

/// Write the XML declaration and the opening `<svg>` tag.
fn write_svg_open(out: &mut String, dimensions: Dimensions, xlink: bool) {
    let _ = writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let Dimensions { width, height } = dimensions;
    if xlink {
        let _ = writeln!(
            out,
            r#"<svg xmlns="{SVG_NS}" xmlns:xlink="{XLINK_NS}" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#,
        );
    } else {
        let _ = writeln!(
            out,
            r#"<svg xmlns="{SVG_NS}" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#,
        );
    }
}

/// Serialize traced paths into an SVG document string.
///
/// Every record whose polygon has at least 3 points becomes one
/// `<path d="..." fill="#rrggbb" stroke="none"/>` line, in input order.
///
/// # Examples
///
/// ```
/// use pixtrace_pipeline::{Color, Dimensions, PathRecord, Point, Polygon};
/// use pixtrace_export::{SvgMetadata, to_trace_svg};
///
/// let paths = vec![PathRecord {
///     polygon: Polygon::new(vec![Point::new(0, 0), Point::new(4, 0), Point::new(0, 3)]),
///     color: Color::new(255, 0, 0),
/// }];
/// let svg = to_trace_svg(Dimensions { width: 8, height: 6 }, &paths, &SvgMetadata::default());
/// assert!(svg.contains(r#"viewBox="0 0 8 6""#));
/// assert!(svg.contains(r##"<path d="M 0 0 L 4 0 L 0 3 Z" fill="#ff0000" stroke="none"/>"##));
/// ```
#[must_use]
pub fn to_trace_svg(
    dimensions: Dimensions,
    paths: &[PathRecord],
    metadata: &SvgMetadata<'_>,
) -> String {
    let mut out = String::new();
    write_svg_open(&mut out, dimensions, false);

    if let Some(title) = metadata.title {
        let _ = writeln!(out, "  <title>{}</title>", xml_escape(title));
    }
    if let Some(description) = metadata.description {
        let _ = writeln!(out, "  <desc>{}</desc>", xml_escape(description));
    }

    for record in paths {
        if let Some(d) = path_data(&record.polygon) {
            let _ = writeln!(
                out,
                r#"  <path d="{d}" fill="{}" stroke="none"/>"#,
                record.color,
            );
        }
    }

    out.push_str("</svg>");
    out
}

/// Encode a buffer as PNG, keeping its channel layout.
///
/// # Errors
///
/// Returns [`ExportError::PngEncode`] if the encoder rejects the buffer
/// (for example a zero-sized image).
pub fn encode_png(buffer: &PixelBuffer) -> Result<Vec<u8>, ExportError> {
    let color_type = match buffer.layout() {
        ChannelLayout::Gray => ExtendedColorType::L8,
        ChannelLayout::Rgb => ExtendedColorType::Rgb8,
        ChannelLayout::Rgba => ExtendedColorType::Rgba8,
    };
    let mut png = Vec::new();
    PngEncoder::new(&mut png).write_image(
        buffer.as_raw(),
        buffer.width(),
        buffer.height(),
        color_type,
    )?;
    Ok(png)
}

/// `data:image/png;base64,...` URI for PNG bytes.
#[must_use]
pub fn png_data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

/// Wrap a buffer, re-encoded as PNG, in an SVG `<image>` element.
///
/// Alpha is preserved. The image is sized to the buffer's pixel
/// dimensions, matching the `viewBox`.
///
/// # Errors
///
/// Returns [`ExportError::PngEncode`] if PNG encoding fails.
pub fn to_embed_svg(buffer: &PixelBuffer) -> Result<String, ExportError> {
    let uri = png_data_uri(&encode_png(buffer)?);
    let Dimensions { width, height } = buffer.dimensions();

    let mut out = String::with_capacity(uri.len() + 256);
    write_svg_open(&mut out, buffer.dimensions(), true);
    let _ = writeln!(
        out,
        r#"  <image width="{width}" height="{height}" xlink:href="{uri}"/>"#,
    );
    out.push_str("</svg>");
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pixtrace_pipeline::{Color, Point};

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    fn record(points: &[(i32, i32)], color: Color) -> PathRecord {
        PathRecord {
            polygon: Polygon::new(points.iter().map(|&(x, y)| Point::new(x, y)).collect()),
            color,
        }
    }

    fn no_meta() -> SvgMetadata<'static> {
        SvgMetadata::default()
    }

    // --- path data ---

    #[test]
    fn path_data_empty_polygon() {
        assert_eq!(path_data(&Polygon::new(vec![])), None);
    }

    #[test]
    fn path_data_two_points_is_not_emittable() {
        let polygon = Polygon::new(vec![Point::new(0, 0), Point::new(1, 1)]);
        assert_eq!(path_data(&polygon), None);
    }

    #[test]
    fn path_data_square() {
        let square = record(&[(0, 0), (9, 0), (9, 9), (0, 9)], Color::BLACK);
        assert_eq!(
            path_data(&square.polygon).as_deref(),
            Some("M 0 0 L 9 0 L 9 9 L 0 9 Z")
        );
    }

    #[test]
    fn path_data_negative_coordinates() {
        let polygon = record(&[(-1, 0), (3, -2), (3, 3)], Color::BLACK).polygon;
        assert_eq!(path_data(&polygon).as_deref(), Some("M -1 0 L 3 -2 L 3 3 Z"));
    }

    // --- trace document ---

    #[test]
    fn empty_trace_is_exact() {
        let svg = to_trace_svg(dims(3, 2), &[], &no_meta());
        assert_eq!(
            svg,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <svg xmlns=\"http://www.w3.org/2000/svg\" width=\"3\" height=\"2\" viewBox=\"0 0 3 2\">\n\
             </svg>"
        );
    }

    #[test]
    fn trace_paths_are_exact_and_ordered() {
        let paths = vec![
            record(&[(0, 0), (4, 0), (4, 4)], Color::new(0xab, 0xcd, 0xef)),
            record(&[(5, 5), (6, 5), (6, 6)], Color::BLACK),
        ];
        let svg = to_trace_svg(dims(10, 10), &paths, &no_meta());
        let lines: Vec<&str> = svg.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(
            lines[2],
            r##"  <path d="M 0 0 L 4 0 L 4 4 Z" fill="#abcdef" stroke="none"/>"##
        );
        assert_eq!(
            lines[3],
            r##"  <path d="M 5 5 L 6 5 L 6 6 Z" fill="#000000" stroke="none"/>"##
        );
        assert_eq!(lines[4], "</svg>");
    }

    #[test]
    fn degenerate_records_are_skipped() {
        let paths = vec![
            record(&[(0, 0), (1, 1)], Color::BLACK),
            record(&[(0, 0), (4, 0), (4, 4)], Color::BLACK),
        ];
        let svg = to_trace_svg(dims(10, 10), &paths, &no_meta());
        assert_eq!(svg.matches("<path ").count(), 1);
    }

    #[test]
    fn no_background_rect() {
        let svg = to_trace_svg(dims(10, 10), &[record(&[(0, 0), (4, 0), (4, 4)], Color::WHITE)], &no_meta());
        assert!(!svg.contains("<rect"));
    }

    #[test]
    fn title_and_desc_follow_svg_open() {
        let metadata = SvgMetadata {
            title: Some("logo"),
            description: Some("traced at T=128"),
        };
        let svg = to_trace_svg(dims(10, 10), &[record(&[(0, 0), (4, 0), (4, 4)], Color::BLACK)], &metadata);
        let lines: Vec<&str> = svg.lines().collect();
        assert_eq!(lines[2], "  <title>logo</title>");
        assert_eq!(lines[3], "  <desc>traced at T=128</desc>");
        assert!(lines[4].starts_with("  <path "));
    }

    #[test]
    fn special_characters_in_title_are_escaped() {
        let metadata = SvgMetadata {
            title: Some("<cats & \"dogs\">"),
            description: None,
        };
        let svg = to_trace_svg(dims(1, 1), &[], &metadata);
        assert!(svg.contains("<title>&lt;cats &amp; &quot;dogs&quot;&gt;</title>"));
    }

    #[test]
    fn xml_escape_handles_all_special_chars() {
        assert_eq!(xml_escape(r#"&<>"'"#), "&amp;&lt;&gt;&quot;&apos;");
        assert_eq!(xml_escape("plain"), "plain");
        assert_eq!(xml_escape(""), "");
    }

    // --- embed document ---

    #[test]
    fn embed_header_declares_xlink() {
        let buffer: PixelBuffer = image::RgbImage::from_pixel(3, 2, image::Rgb([1, 2, 3])).into();
        let svg = to_embed_svg(&buffer).unwrap();
        let lines: Vec<&str> = svg.lines().collect();
        assert_eq!(lines[0], r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        assert_eq!(
            lines[1],
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="3" height="2" viewBox="0 0 3 2">"#
        );
        assert!(lines[2].starts_with(r#"  <image width="3" height="2" xlink:href="data:image/png;base64,"#));
        assert!(lines[2].ends_with(r#""/>"#));
        assert_eq!(lines[3], "</svg>");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn encode_png_has_png_signature() {
        for buffer in [
            PixelBuffer::new(2, 2, 1, vec![0; 4]).unwrap(),
            PixelBuffer::new(2, 2, 3, vec![0; 12]).unwrap(),
            PixelBuffer::new(2, 2, 4, vec![0; 16]).unwrap(),
        ] {
            let png = encode_png(&buffer).unwrap();
            assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        }
    }

    #[test]
    fn png_data_uri_prefix() {
        assert_eq!(png_data_uri(b"abc"), "data:image/png;base64,YWJj");
    }
}
