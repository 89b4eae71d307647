//! Watermark error types.

use std::fmt;

/// Errors that can occur while rendering or compositing a watermark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatermarkError {
    /// Text color is not `#RGB` or `#RRGGBB`
    InvalidColor(String),

    /// Failed to render text watermark
    RenderError(String),
}

impl fmt::Display for WatermarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidColor(msg) => write!(f, "Invalid watermark color: {}", msg),
            Self::RenderError(msg) => write!(f, "Failed to render text watermark: {}", msg),
        }
    }
}

impl std::error::Error for WatermarkError {}
