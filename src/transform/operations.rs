//! Validated transformation operations
//!
//! A `TransformationSpec` is an ordered list of `Operation`s. Construction
//! validates every operation and sorts the list into canonical stage order,
//! so the pipeline can run it front to back without re-checking anything.

use super::error::ImageError;
use super::format::OutputFormat;
use super::request::{
    CropRequest, FilterRequest, FlipRequest, FormatConversionRequest, ResizeRequest,
    RotateRequest, TransformationRequest, WatermarkRequest,
};
use crate::watermark::{parse_hex_color, Color};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipDirection {
    Horizontal,
    Vertical,
}

impl std::str::FromStr for FlipDirection {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "horizontal" => Ok(FlipDirection::Horizontal),
            "vertical" => Ok(FlipDirection::Vertical),
            other => Err(ImageError::invalid_param(
                "flip.direction",
                format!("'{}' is not one of horizontal, vertical", other),
            )),
        }
    }
}

/// Signed percentage adjustments, each in -100..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterAdjustments {
    pub saturation: i8,
    pub brightness: i8,
    pub contrast: i8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkText {
    pub text: String,
    /// Top-left of the text box; may be negative, overflow is clipped
    pub x: i32,
    pub y: i32,
    /// Composite alpha in percent, 0..=100
    pub opacity: u8,
    pub color: Color,
}

/// One pipeline stage with its parameters
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Resize { width: u32, height: u32 },
    Crop { x: u32, y: u32, width: u32, height: u32 },
    Rotate { degrees: f64 },
    Flip(FlipDirection),
    ConvertFormat(OutputFormat),
    Filter(FilterAdjustments),
    Watermark(WatermarkText),
}

impl Operation {
    /// Position of this operation in the canonical stage order
    pub fn stage_index(&self) -> usize {
        match self {
            Operation::Resize { .. } => 0,
            Operation::Crop { .. } => 1,
            Operation::Rotate { .. } => 2,
            Operation::Flip(_) => 3,
            Operation::ConvertFormat(_) => 4,
            Operation::Filter(_) => 5,
            Operation::Watermark(_) => 6,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Resize { .. } => "resize",
            Operation::Crop { .. } => "crop",
            Operation::Rotate { .. } => "rotate",
            Operation::Flip(_) => "flip",
            Operation::ConvertFormat(_) => "format_conversion",
            Operation::Filter(_) => "filter",
            Operation::Watermark(_) => "watermark",
        }
    }

    pub fn validate(&self) -> Result<(), ImageError> {
        match self {
            Operation::Resize { width, height } => {
                if *width == 0 {
                    return Err(ImageError::invalid_param("resize.width", "must be > 0"));
                }
                if *height == 0 {
                    return Err(ImageError::invalid_param("resize.height", "must be > 0"));
                }
            }
            Operation::Crop {
                x,
                y,
                width,
                height,
            } => {
                if *width == 0 {
                    return Err(ImageError::invalid_param("crop.width", "must be > 0"));
                }
                if *height == 0 {
                    return Err(ImageError::invalid_param("crop.height", "must be > 0"));
                }
                // Requests written against corner-pair semantics would produce an
                // empty or inverted region here; refuse them outright.
                if width <= x {
                    return Err(ImageError::invalid_param(
                        "crop.width",
                        format!("must be greater than x ({})", x),
                    ));
                }
                if height <= y {
                    return Err(ImageError::invalid_param(
                        "crop.height",
                        format!("must be greater than y ({})", y),
                    ));
                }
            }
            Operation::Rotate { degrees } => {
                if !degrees.is_finite() {
                    return Err(ImageError::invalid_param("rotate.angle", "must be finite"));
                }
            }
            Operation::Flip(_) | Operation::ConvertFormat(_) => {}
            Operation::Filter(adjustments) => {
                for (name, value) in [
                    ("filter.saturation", adjustments.saturation),
                    ("filter.brightness", adjustments.brightness),
                    ("filter.contrast", adjustments.contrast),
                ] {
                    if !(-100..=100).contains(&value) {
                        return Err(ImageError::invalid_param(name, "must be within -100..=100"));
                    }
                }
            }
            Operation::Watermark(watermark) => {
                if watermark.text.trim().is_empty() {
                    return Err(ImageError::invalid_param("watermark.text", "cannot be empty"));
                }
                if watermark.opacity > 100 {
                    return Err(ImageError::invalid_param(
                        "watermark.opacity",
                        "must be within 0..=100",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Validated operations in canonical stage order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformationSpec {
    operations: Vec<Operation>,
}

impl TransformationSpec {
    /// Validate and order a list of operations
    ///
    /// At most one operation per stage is allowed.
    pub fn new(mut operations: Vec<Operation>) -> Result<Self, ImageError> {
        for op in &operations {
            op.validate()?;
        }
        operations.sort_by_key(Operation::stage_index);
        if let Some(pair) = operations
            .windows(2)
            .find(|pair| pair[0].stage_index() == pair[1].stage_index())
        {
            return Err(ImageError::invalid_param(
                pair[0].name(),
                "given more than once",
            ));
        }
        Ok(Self { operations })
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Encoding target: the requested conversion, or JPEG
    pub fn output_format(&self) -> OutputFormat {
        self.operations
            .iter()
            .find_map(|op| match op {
                Operation::ConvertFormat(format) => Some(*format),
                _ => None,
            })
            .unwrap_or_default()
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.operations.iter().map(Operation::name).collect()
    }
}

impl TryFrom<TransformationRequest> for TransformationSpec {
    type Error = ImageError;

    fn try_from(request: TransformationRequest) -> Result<Self, Self::Error> {
        let mut operations = Vec::new();
        if let Some(resize) = request.resize {
            operations.push(resize.try_into()?);
        }
        if let Some(crop) = request.crop {
            operations.push(crop.try_into()?);
        }
        if let Some(rotate) = request.rotate {
            operations.push(rotate.into());
        }
        if let Some(flip) = request.flip {
            operations.push(flip.try_into()?);
        }
        if let Some(conversion) = request.format_conversion {
            operations.push(conversion.try_into()?);
        }
        if let Some(filter) = request.filter {
            operations.push(filter.try_into()?);
        }
        if let Some(watermark) = request.watermark {
            operations.push(watermark.try_into()?);
        }
        Self::new(operations)
    }
}

fn positive_u32(param: &str, value: i64) -> Result<u32, ImageError> {
    if value <= 0 {
        return Err(ImageError::invalid_param(param, "must be > 0"));
    }
    u32::try_from(value).map_err(|_| ImageError::invalid_param(param, "is too large"))
}

fn non_negative_u32(param: &str, value: i64) -> Result<u32, ImageError> {
    if value < 0 {
        return Err(ImageError::invalid_param(param, "must be >= 0"));
    }
    u32::try_from(value).map_err(|_| ImageError::invalid_param(param, "is too large"))
}

fn percentage(param: &str, value: i64, min: i64) -> Result<i64, ImageError> {
    if value < min || value > 100 {
        return Err(ImageError::invalid_param(
            param,
            format!("must be within {}..=100", min),
        ));
    }
    Ok(value)
}

impl TryFrom<ResizeRequest> for Operation {
    type Error = ImageError;

    fn try_from(r: ResizeRequest) -> Result<Self, Self::Error> {
        Ok(Operation::Resize {
            width: positive_u32("resize.width", r.width)?,
            height: positive_u32("resize.height", r.height)?,
        })
    }
}

impl TryFrom<CropRequest> for Operation {
    type Error = ImageError;

    fn try_from(c: CropRequest) -> Result<Self, Self::Error> {
        Ok(Operation::Crop {
            x: non_negative_u32("crop.x", c.x)?,
            y: non_negative_u32("crop.y", c.y)?,
            width: positive_u32("crop.width", c.width)?,
            height: positive_u32("crop.height", c.height)?,
        })
    }
}

impl From<RotateRequest> for Operation {
    fn from(r: RotateRequest) -> Self {
        Operation::Rotate { degrees: r.angle }
    }
}

impl TryFrom<FlipRequest> for Operation {
    type Error = ImageError;

    fn try_from(f: FlipRequest) -> Result<Self, Self::Error> {
        Ok(Operation::Flip(f.direction.parse()?))
    }
}

impl TryFrom<FormatConversionRequest> for Operation {
    type Error = ImageError;

    fn try_from(f: FormatConversionRequest) -> Result<Self, Self::Error> {
        Ok(Operation::ConvertFormat(f.format.parse()?))
    }
}

impl TryFrom<FilterRequest> for Operation {
    type Error = ImageError;

    fn try_from(f: FilterRequest) -> Result<Self, Self::Error> {
        // Range-checked to -100..=100, so the narrowing casts are lossless
        Ok(Operation::Filter(FilterAdjustments {
            saturation: percentage("filter.saturation", f.saturation, -100)? as i8,
            brightness: percentage("filter.brightness", f.brightness, -100)? as i8,
            contrast: percentage("filter.contrast", f.contrast, -100)? as i8,
        }))
    }
}

impl TryFrom<WatermarkRequest> for Operation {
    type Error = ImageError;

    fn try_from(w: WatermarkRequest) -> Result<Self, Self::Error> {
        let opacity = percentage("watermark.opacity", w.opacity, 0)? as u8;
        let x = i32::try_from(w.position.x)
            .map_err(|_| ImageError::invalid_param("watermark.position.x", "out of range"))?;
        let y = i32::try_from(w.position.y)
            .map_err(|_| ImageError::invalid_param("watermark.position.y", "out of range"))?;
        let color = match w.color.as_deref() {
            Some(hex) => parse_hex_color(hex)
                .map_err(|e| ImageError::invalid_param("watermark.color", e.to_string()))?,
            None => Color::white(),
        };
        Ok(Operation::Watermark(WatermarkText {
            text: w.text,
            x,
            y,
            opacity,
            color,
        }))
    }
}
