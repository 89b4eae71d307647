//! Image transformation error types
//!
//! Provides structured error handling with HTTP status mapping. Every
//! pipeline failure is one of these; the service layer folds them into the
//! request-level taxonomy.

use std::fmt;

/// Errors that can occur while validating or running a transformation
#[derive(Debug, Clone)]
pub enum ImageError {
    // === Decoding Errors ===
    /// Requested output format has no encoder
    UnsupportedFormat { format: String },
    /// Source bytes are not a decodable raster image
    DecodeFailed { message: String },
    /// Image dimensions exceed safety limits (image bomb protection)
    ImageBombDetected {
        width: u32,
        height: u32,
        pixels: u64,
        max_pixels: u64,
    },

    // === Processing Errors ===
    /// Resize operation failed
    ResizeFailed { message: String },
    /// Watermark text could not be rendered
    RenderFailed { message: String },
    /// Encoding to output format failed
    EncodeFailed { format: String, message: String },

    // === Parameter Errors ===
    /// Invalid transformation parameter
    InvalidParameter { param: String, message: String },
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::UnsupportedFormat { format } => {
                write!(f, "Unsupported image format: {}", format)
            }
            ImageError::DecodeFailed { message } => {
                write!(f, "Failed to decode image: {}", message)
            }
            ImageError::ImageBombDetected {
                width,
                height,
                pixels,
                max_pixels,
            } => {
                write!(
                    f,
                    "Image dimensions {}x{} ({} pixels) exceed limit of {} pixels",
                    width, height, pixels, max_pixels
                )
            }
            ImageError::ResizeFailed { message } => {
                write!(f, "Resize failed: {}", message)
            }
            ImageError::RenderFailed { message } => {
                write!(f, "Failed to render watermark: {}", message)
            }
            ImageError::EncodeFailed { format, message } => {
                write!(f, "Failed to encode to {}: {}", format, message)
            }
            ImageError::InvalidParameter { param, message } => {
                write!(f, "Invalid parameter '{}': {}", param, message)
            }
        }
    }
}

impl std::error::Error for ImageError {}

impl ImageError {
    /// Maps image errors to HTTP status codes
    ///
    /// Status mapping:
    /// - UnsupportedFormat, InvalidParameter, ImageBombDetected → 400 (Bad Request)
    /// - DecodeFailed, ResizeFailed, RenderFailed, EncodeFailed → 500 (Internal Server Error)
    pub fn to_http_status(&self) -> u16 {
        match self {
            ImageError::UnsupportedFormat { .. }
            | ImageError::InvalidParameter { .. }
            | ImageError::ImageBombDetected { .. } => 400,

            ImageError::DecodeFailed { .. }
            | ImageError::ResizeFailed { .. }
            | ImageError::RenderFailed { .. }
            | ImageError::EncodeFailed { .. } => 500,
        }
    }

    /// True for errors caused by the request itself rather than the image or encoder
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ImageError::InvalidParameter { .. } | ImageError::ImageBombDetected { .. }
        )
    }

    pub fn unsupported_format(format: impl Into<String>) -> Self {
        ImageError::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn decode_failed(message: impl Into<String>) -> Self {
        ImageError::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn resize_failed(message: impl Into<String>) -> Self {
        ImageError::ResizeFailed {
            message: message.into(),
        }
    }

    pub fn render_failed(message: impl Into<String>) -> Self {
        ImageError::RenderFailed {
            message: message.into(),
        }
    }

    pub fn encode_failed(format: impl Into<String>, message: impl Into<String>) -> Self {
        ImageError::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn invalid_param(param: impl Into<String>, message: impl Into<String>) -> Self {
        ImageError::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }

    pub fn image_bomb(width: u32, height: u32, max_pixels: u64) -> Self {
        ImageError::ImageBombDetected {
            width,
            height,
            pixels: width as u64 * height as u64,
            max_pixels,
        }
    }
}
