use crate::foundation::error::{CompositorError, CompositorResult};

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// `WxH` form used in engine arguments.
    pub fn size_arg(self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Opaque 8-bit RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgb8(pub [u8; 3]);

impl Rgb8 {
    /// `0xRRGGBB` form understood by the engine's color sources and filters.
    pub fn hex(self) -> String {
        let [r, g, b] = self.0;
        format!("0x{r:02X}{g:02X}{b:02X}")
    }
}

/// Axis-aligned pixel rectangle with a top-left origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Resolution, frame rate and fill color shared by every rendered clip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OutputFormat {
    /// Final output canvas.
    pub canvas: Canvas,
    /// Integer frames per second.
    pub fps: u32,
    /// Letterbox and placeholder fill.
    pub background: Rgb8,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self {
            canvas: Canvas {
                width: 1920,
                height: 1080,
            },
            fps: 30,
            background: Rgb8([0x1E, 0x1B, 0x4B]),
        }
    }
}

impl OutputFormat {
    /// Check the format can be encoded as yuv420p H.264.
    pub fn validate(&self) -> CompositorResult<()> {
        if self.fps == 0 {
            return Err(CompositorError::configuration("fps must be non-zero"));
        }
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(CompositorError::configuration(
                "output width/height must be non-zero",
            ));
        }
        if !self.canvas.width.is_multiple_of(2) || !self.canvas.height.is_multiple_of(2) {
            return Err(CompositorError::configuration(
                "output width/height must be even (required for yuv420p output)",
            ));
        }
        Ok(())
    }
}
