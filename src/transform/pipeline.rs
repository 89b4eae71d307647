//! Transformation pipeline
//!
//! Decode once, run every stage of the spec over one RGBA working buffer in
//! canonical order, encode once. Each stage consumes the previous stage's
//! output, so operations compose (resize then crop crops the resized image).

use std::io::Cursor;
use std::time::Instant;

use image::io::Reader as ImageReader;
use image::RgbaImage;

use super::encoder::EncoderFactory;
use super::error::ImageError;
use super::filters;
use super::format::OutputFormat;
use super::geometry;
use super::operations::{Operation, TransformationSpec};
use crate::constants::{
    DEFAULT_JPEG_QUALITY, DEFAULT_MAX_SOURCE_PIXELS, DEFAULT_WATERMARK_FONT_SIZE,
};
use crate::metrics::Metrics;
use crate::watermark::{apply_text_watermark, TextStamp};

/// Knobs that come from configuration rather than the request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineOptions {
    /// JPEG output quality, 1-100
    pub jpeg_quality: u8,
    /// Largest decoded or intermediate image, in pixels
    pub max_pixels: u64,
    pub watermark_font_size: f32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_pixels: DEFAULT_MAX_SOURCE_PIXELS,
            watermark_font_size: DEFAULT_WATERMARK_FONT_SIZE,
        }
    }
}

/// Encoded result of a pipeline run
#[derive(Debug)]
pub struct TransformedImage {
    pub data: Vec<u8>,
    pub format: OutputFormat,
    pub content_type: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Source format and dimensions, read from the header without decoding pixels
pub fn probe(data: &[u8]) -> Result<(image::ImageFormat, u32, u32), ImageError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ImageError::decode_failed(e.to_string()))?;
    let format = reader
        .format()
        .ok_or_else(|| ImageError::decode_failed("unrecognized image format"))?;
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| ImageError::decode_failed(e.to_string()))?;
    Ok((format, width, height))
}

fn check_pixels(width: u32, height: u32, max_pixels: u64) -> Result<(), ImageError> {
    if width as u64 * height as u64 > max_pixels {
        return Err(ImageError::image_bomb(width, height, max_pixels));
    }
    Ok(())
}

fn decode(data: &[u8], max_pixels: u64) -> Result<RgbaImage, ImageError> {
    // Refuse oversized images before allocating the pixel buffer
    let (_, width, height) = probe(data)?;
    check_pixels(width, height, max_pixels)?;

    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ImageError::decode_failed(e.to_string()))?;
    let decoded = reader
        .decode()
        .map_err(|e| ImageError::decode_failed(e.to_string()))?;
    Ok(decoded.to_rgba8())
}

fn run_stage(
    img: RgbaImage,
    op: &Operation,
    options: &PipelineOptions,
) -> Result<RgbaImage, ImageError> {
    match op {
        Operation::Resize { width, height } => {
            check_pixels(*width, *height, options.max_pixels)?;
            geometry::resize(&img, *width, *height)
        }
        Operation::Crop {
            x,
            y,
            width,
            height,
        } => geometry::crop(&img, *x, *y, *width, *height),
        Operation::Rotate { degrees } => {
            let (width, height) = geometry::rotated_bounds(img.width(), img.height(), *degrees);
            check_pixels(width, height, options.max_pixels)?;
            Ok(geometry::rotate(&img, *degrees))
        }
        Operation::Flip(direction) => {
            let mut img = img;
            geometry::flip(&mut img, *direction);
            Ok(img)
        }
        // Selects the encoder; pixels are untouched
        Operation::ConvertFormat(_) => Ok(img),
        Operation::Filter(adjustments) => {
            let mut img = img;
            filters::apply(&mut img, adjustments);
            Ok(img)
        }
        Operation::Watermark(watermark) => {
            let mut img = img;
            let stamp = TextStamp {
                text: &watermark.text,
                x: watermark.x,
                y: watermark.y,
                opacity_percent: watermark.opacity,
                color: watermark.color,
                font_size: options.watermark_font_size,
            };
            apply_text_watermark(&mut img, &stamp)
                .map_err(|e| ImageError::render_failed(e.to_string()))?;
            Ok(img)
        }
    }
}

/// Run `spec` over `source` and encode the result
///
/// An empty spec re-encodes the source as JPEG.
pub fn apply(
    source: &[u8],
    spec: &TransformationSpec,
    options: &PipelineOptions,
) -> Result<TransformedImage, ImageError> {
    let metrics = Metrics::global();

    let started = Instant::now();
    let mut img = decode(source, options.max_pixels)?;
    metrics.observe_stage("decode", started);
    tracing::debug!(
        width = img.width(),
        height = img.height(),
        stages = ?spec.stage_names(),
        "Decoded source image"
    );

    for op in spec.operations() {
        let started = Instant::now();
        img = run_stage(img, op, options)?;
        metrics.observe_stage(op.name(), started);
        tracing::trace!(
            stage = op.name(),
            width = img.width(),
            height = img.height(),
            "Stage complete"
        );
    }

    let format = spec.output_format();
    let (width, height) = img.dimensions();
    let started = Instant::now();
    let encoded = EncoderFactory::create(format).encode(
        img.as_raw(),
        width,
        height,
        options.jpeg_quality,
    )?;
    metrics.observe_stage("encode", started);

    Ok(TransformedImage {
        data: encoded.data,
        format: encoded.format,
        content_type: encoded.content_type,
        width,
        height,
    })
}
