//! Image transformation
//!
//! Turns a stored image plus a `TransformationRequest` into a newly encoded
//! image:
//!
//! 1. The request is validated into a `TransformationSpec`, an ordered list of
//!    `Operation`s (resize, crop, rotate, flip, format conversion, filter,
//!    watermark). Unsupported output formats are rejected here, before any I/O.
//! 2. `pipeline::apply` decodes the source once, runs each stage on the
//!    result of the previous one, and encodes once (JPEG unless converted).
//!
//! # Example
//!
//! ```no_run
//! use vixel::transform::{apply, PipelineOptions, TransformationRequest, TransformationSpec};
//!
//! # fn example(source: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
//! let request = TransformationRequest::from_json(br#"{"resize": {"width": 50, "height": 50}}"#)?;
//! let spec = TransformationSpec::try_from(request)?;
//! let output = apply(source, &spec, &PipelineOptions::default())?;
//! assert_eq!((output.width, output.height), (50, 50));
//! # Ok(())
//! # }
//! ```

pub mod encoder;
pub mod error;
pub mod filters;
pub mod format;
pub mod geometry;
pub mod operations;
pub mod pipeline;
pub mod request;

pub use encoder::{EncodedImage, EncoderFactory, ImageEncoder};
pub use error::ImageError;
pub use format::{detect_format, OutputFormat};
pub use operations::{FilterAdjustments, FlipDirection, Operation, TransformationSpec, WatermarkText};
pub use pipeline::{apply, probe, PipelineOptions, TransformedImage};
pub use request::TransformationRequest;
