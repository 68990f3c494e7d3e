//! Alpha compositing: flatten RGBA onto an opaque background.
//!
//! Each output channel is `alpha * src + (1 - alpha) * bg` with
//! `alpha = A / 255`, truncated to 8 bits. Buffers without an alpha
//! channel pass through untouched.
//!
//! This is step 1 of the trace pipeline, before grayscale conversion.

use std::borrow::Cow;

use crate::buffer::{ChannelLayout, PixelBuffer};
use crate::types::{Color, PipelineError};

/// Composite `buffer` over `background` if it carries alpha.
///
/// RGBA input produces a new RGB buffer; gray and RGB input are borrowed
/// back unchanged.
#[must_use = "returns the composited buffer"]
pub fn composite(buffer: &PixelBuffer, background: Color) -> Cow<'_, PixelBuffer> {
    if buffer.layout() != ChannelLayout::Rgba {
        return Cow::Borrowed(buffer);
    }

    let bg = [background.r, background.g, background.b];
    let mut data = Vec::with_capacity(buffer.pixel_count() * 3);
    for px in buffer.pixels() {
        let alpha = u32::from(px[3]);
        for c in 0..3 {
            data.push(blend(px[c], bg[c], alpha));
        }
    }

    // Length is pixel_count * 3 by construction.
    match PixelBuffer::with_layout(buffer.width(), buffer.height(), ChannelLayout::Rgb, data) {
        Ok(rgb) => Cow::Owned(rgb),
        Err(_) => Cow::Borrowed(buffer),
    }
}

/// Composite with a background given as a `#RRGGBB` string; `None`
/// means white.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidColorFormat`] if `background` is
/// malformed, even when the buffer has no alpha channel.
pub fn composite_hex<'a>(
    buffer: &'a PixelBuffer,
    background: Option<&str>,
) -> Result<Cow<'a, PixelBuffer>, PipelineError> {
    let bg = background.map_or(Ok(Color::WHITE), Color::from_hex)?;
    Ok(composite(buffer, bg))
}

/// Integer form of `a/255 * src + (1 - a/255) * bg`, truncated.
fn blend(src: u8, bg: u8, alpha: u32) -> u8 {
    let value = (alpha * u32::from(src) + (255 - alpha) * u32::from(bg)) / 255;
    // value <= 255 because it is a convex combination of two u8 values.
    u8::try_from(value).unwrap_or(u8::MAX)
}
