//! Document-level checks on trace and embed output.
//!
//! Pipeline output is serialized, then read back with the `svg` crate's
//! event parser to check structure independently of the writer.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use svg::node::element::tag::Type;
use svg::parser::Event;

use pixtrace_export::{SvgMetadata, to_embed_svg, to_trace_svg};
use pixtrace_pipeline::{PixelBuffer, TraceConfig, trace};

/// Parsed element: name plus attributes as plain strings.
struct Element {
    name: String,
    attributes: HashMap<String, String>,
}

/// Parse `content`, asserting that every start tag is closed in order,
/// and return the elements in document order.
fn parse_balanced(content: &str) -> Vec<Element> {
    let mut stack: Vec<String> = Vec::new();
    let mut elements = Vec::new();

    for event in svg::read(content).unwrap() {
        assert!(!matches!(event, Event::Error(_)), "SVG parse error");
        match event {
            Event::Tag(name, kind, attributes) => {
                match kind {
                    Type::Start => stack.push(name.to_owned()),
                    Type::End => {
                        assert_eq!(stack.pop().as_deref(), Some(name), "mismatched </{name}>");
                        continue;
                    }
                    Type::Empty => {}
                }
                elements.push(Element {
                    name: name.to_owned(),
                    attributes: attributes
                        .iter()
                        .map(|(k, v)| (k.clone(), (**v).to_owned()))
                        .collect(),
                });
            }
            _ => {}
        }
    }

    assert!(stack.is_empty(), "unclosed tags: {stack:?}");
    elements
}

/// Dark shapes on a white canvas.
fn shapes_image() -> PixelBuffer {
    image::RgbImage::from_fn(120, 80, |x, y| {
        let in_square = (10..40).contains(&x) && (10..40).contains(&y);
        let in_bar = (60..110).contains(&x) && (20..30).contains(&y);
        let dx = i64::from(x) - 80;
        let dy = i64::from(y) - 60;
        let in_disc = dx * dx + dy * dy < 12 * 12;
        if in_square {
            image::Rgb([200, 20, 20])
        } else if in_bar {
            image::Rgb([20, 20, 200])
        } else if in_disc {
            image::Rgb([20, 120, 20])
        } else {
            image::Rgb([255, 255, 255])
        }
    })
    .into()
}

#[test]
fn traced_document_is_well_formed_with_one_path_per_record() {
    let buffer = shapes_image();
    let config = TraceConfig {
        invert: true,
        ..TraceConfig::default()
    };
    let output = trace(&buffer, &config).unwrap();
    assert_eq!(output.paths.len(), 3);

    let svg = to_trace_svg(output.dimensions, &output.paths, &SvgMetadata::default());
    let elements = parse_balanced(&svg);

    let root = &elements[0];
    assert_eq!(root.name, "svg");
    assert_eq!(root.attributes["width"], "120");
    assert_eq!(root.attributes["height"], "80");
    assert_eq!(root.attributes["viewBox"], "0 0 120 80");
    assert_eq!(root.attributes["xmlns"], "http://www.w3.org/2000/svg");

    let paths: Vec<&Element> = elements.iter().filter(|e| e.name == "path").collect();
    assert_eq!(paths.len(), output.paths.len());
    for (element, record) in paths.iter().zip(&output.paths) {
        assert_eq!(element.attributes["fill"], record.color.to_hex());
        assert_eq!(element.attributes["stroke"], "none");
        let d = &element.attributes["d"];
        assert!(d.starts_with("M "));
        assert!(d.ends_with(" Z"));
    }

    let mut fills: Vec<&str> = paths.iter().map(|p| p.attributes["fill"].as_str()).collect();
    fills.sort_unstable();
    assert_eq!(fills, vec!["#1414c8", "#147814", "#c81414"]);
}

#[test]
fn embedded_red_square_decodes_back() {
    let buffer: PixelBuffer = image::RgbImage::from_pixel(10, 10, image::Rgb([255, 0, 0])).into();
    let svg = to_embed_svg(&buffer).unwrap();
    let elements = parse_balanced(&svg);

    let images: Vec<&Element> = elements.iter().filter(|e| e.name == "image").collect();
    assert_eq!(images.len(), 1);
    let image_el = images[0];
    assert_eq!(image_el.attributes["width"], "10");
    assert_eq!(image_el.attributes["height"], "10");

    let href = &image_el.attributes["xlink:href"];
    let payload = href.strip_prefix("data:image/png;base64,").unwrap();
    let png = STANDARD.decode(payload).unwrap();
    let decoded = image::load_from_memory_with_format(&png, image::ImageFormat::Png)
        .unwrap()
        .to_rgb8();
    assert_eq!(decoded.dimensions(), (10, 10));
    assert!(decoded.pixels().all(|p| p.0 == [255, 0, 0]));
}

#[test]
fn embed_preserves_alpha() {
    let mut rgba = image::RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 255, 255]));
    rgba.put_pixel(0, 0, image::Rgba([0, 0, 0, 0]));
    let svg = to_embed_svg(&rgba.into()).unwrap();

    let start = svg.find("base64,").unwrap() + "base64,".len();
    let end = start + svg[start..].find('"').unwrap();
    let png = STANDARD.decode(&svg[start..end]).unwrap();
    let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(decoded.get_pixel(0, 0).0[3], 0);
    assert_eq!(decoded.get_pixel(1, 1).0, [0, 0, 255, 255]);
}

#[test]
fn metadata_document_is_well_formed() {
    let metadata = SvgMetadata {
        title: Some("a <b> & 'c'"),
        description: Some("threshold=128"),
    };
    let svg = to_trace_svg(
        pixtrace_pipeline::Dimensions {
            width: 5,
            height: 5,
        },
        &[],
        &metadata,
    );
    let names: Vec<String> = parse_balanced(&svg).into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["svg", "title", "desc"]);
}
