use std::path::Path;

use crate::foundation::core::{Canvas, Rgb8};
use crate::foundation::error::{CompositorError, CompositorResult};
use crate::timeline::segment::Segment;

/// Longest caption drawn on a placeholder frame, in characters.
pub const PLACEHOLDER_LABEL_CHARS: usize = 40;

/// Caption for a segment with no resolvable visual.
///
/// Uses the segment label when present, otherwise `Segment <id>`, and is safe to embed in a
/// single-quoted `drawtext` argument.
pub fn placeholder_caption(segment: &Segment) -> String {
    let text = segment
        .label
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Segment {}", segment.id));
    sanitize_caption(&text)
}

/// Strip characters the engine's text filter treats specially and clip the result.
pub fn sanitize_caption(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\'' | '\\' | '%' | '"' => {}
            ':' => out.push_str(" -"),
            c if c.is_control() => out.push(' '),
            c => out.push(c),
        }
    }
    out.trim().chars().take(PLACEHOLDER_LABEL_CHARS).collect()
}

/// Write a flat `color` frame of `size` as PNG.
pub fn write_placeholder_frame(path: &Path, size: Canvas, color: Rgb8) -> CompositorResult<()> {
    if size.width == 0 || size.height == 0 {
        return Err(CompositorError::resolution(
            "placeholder frame width/height must be non-zero",
        ));
    }
    let frame = image::RgbImage::from_pixel(size.width, size.height, image::Rgb(color.0));
    frame
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| {
            CompositorError::resolution(format!(
                "write placeholder frame '{}': {e}",
                path.display()
            ))
        })
}

#[cfg(test)]
#[path = "../../tests/unit/assets/placeholder.rs"]
mod tests;
