//! Image size and encoding limits.
//!
//! Uploads are capped before they reach storage, and stored objects fetched
//! back for transformation are capped again (bytes and decoded pixels) so a
//! pipeline run never decodes an unbounded image.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_JPEG_QUALITY, DEFAULT_MAX_SOURCE_BYTES, DEFAULT_MAX_SOURCE_PIXELS,
    DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_WATERMARK_FONT_SIZE,
};
use crate::transform::PipelineOptions;

fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

fn default_max_source_bytes() -> usize {
    DEFAULT_MAX_SOURCE_BYTES
}

fn default_max_source_pixels() -> u64 {
    DEFAULT_MAX_SOURCE_PIXELS
}

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

fn default_watermark_font_size() -> f32 {
    DEFAULT_WATERMARK_FONT_SIZE
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageLimitsConfig {
    /// Maximum upload body in bytes (default: 5 MB)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Maximum stored object size accepted as a transform source (default: 20 MB)
    #[serde(default = "default_max_source_bytes")]
    pub max_source_bytes: usize,
    /// Maximum decoded pixel count (default: 40 MP)
    #[serde(default = "default_max_source_pixels")]
    pub max_source_pixels: u64,
    /// JPEG quality for pipeline output, 1-100 (default: 85)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// Watermark text size in pixels (default: 24)
    #[serde(default = "default_watermark_font_size")]
    pub watermark_font_size: f32,
}

impl Default for ImageLimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload_bytes(),
            max_source_bytes: default_max_source_bytes(),
            max_source_pixels: default_max_source_pixels(),
            jpeg_quality: default_jpeg_quality(),
            watermark_font_size: default_watermark_font_size(),
        }
    }
}

impl ImageLimitsConfig {
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            jpeg_quality: self.jpeg_quality,
            max_pixels: self.max_source_pixels,
            watermark_font_size: self.watermark_font_size,
        }
    }
}
