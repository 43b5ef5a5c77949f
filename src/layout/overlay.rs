use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::foundation::core::{Canvas, Rect};
use crate::foundation::error::CompositorError;

/// Margin between the presenter window and the canvas edge, in pixels.
pub const PIP_PADDING: u32 = 20;

/// Corner the presenter window is pinned to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipPosition {
    /// Lower right corner.
    #[default]
    BottomRight,
    /// Lower left corner.
    BottomLeft,
    /// Upper right corner.
    TopRight,
    /// Upper left corner.
    TopLeft,
}

/// Presenter window size preset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipSize {
    /// 288x162.
    Small,
    /// 384x216.
    #[default]
    Medium,
    /// 480x270.
    Large,
}

impl PipSize {
    /// Window size in pixels.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Self::Small => (288, 162),
            Self::Medium => (384, 216),
            Self::Large => (480, 270),
        }
    }
}

impl FromStr for PipPosition {
    type Err = CompositorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "bottom-right" => Ok(Self::BottomRight),
            "bottom-left" => Ok(Self::BottomLeft),
            "top-right" => Ok(Self::TopRight),
            "top-left" => Ok(Self::TopLeft),
            other => Err(CompositorError::configuration(format!(
                "unknown pip position '{other}' (expected bottom-right, bottom-left, top-right or top-left)"
            ))),
        }
    }
}

impl FromStr for PipSize {
    type Err = CompositorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" => Ok(Self::Small),
            "medium" => Ok(Self::Medium),
            "large" => Ok(Self::Large),
            other => Err(CompositorError::configuration(format!(
                "unknown pip size '{other}' (expected small, medium or large)"
            ))),
        }
    }
}

impl fmt::Display for PipPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BottomRight => "bottom-right",
            Self::BottomLeft => "bottom-left",
            Self::TopRight => "top-right",
            Self::TopLeft => "top-left",
        })
    }
}

impl fmt::Display for PipSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        })
    }
}

/// Rectangle for the presenter window on `canvas`.
///
/// The window is clipped to the canvas and kept inside it when the canvas is smaller than the
/// preset plus padding.
pub fn place(position: PipPosition, size: PipSize, canvas: Canvas) -> Rect {
    let (w, h) = size.dimensions();
    let width = w.min(canvas.width);
    let height = h.min(canvas.height);

    let left = PIP_PADDING.min(canvas.width - width);
    let top = PIP_PADDING.min(canvas.height - height);
    let right = canvas.width.saturating_sub(width + PIP_PADDING);
    let bottom = canvas.height.saturating_sub(height + PIP_PADDING);

    let (x, y) = match position {
        PipPosition::BottomRight => (right, bottom),
        PipPosition::BottomLeft => (left, bottom),
        PipPosition::TopRight => (right, top),
        PipPosition::TopLeft => (left, top),
    };
    Rect {
        x,
        y,
        width,
        height,
    }
}

/// Region the visual track fills in presenter mode: the top 80 % of the canvas, rounded down
/// to an even height.
pub fn visual_area(canvas: Canvas) -> Canvas {
    let height = (canvas.height * 4 / 5) & !1;
    Canvas {
        width: canvas.width,
        height: height.max(2).min(canvas.height),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layout/overlay.rs"]
mod tests;
