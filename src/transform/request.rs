//! Wire representation of a transformation request
//!
//! Every operation is optional and independent; field order in the payload
//! carries no meaning. Integers are kept signed here so out-of-range values
//! surface as validation errors with a parameter name instead of a JSON
//! type error.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resize: Option<ResizeRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop: Option<CropRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotate: Option<RotateRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flip: Option<FlipRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watermark: Option<WatermarkRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_conversion: Option<FormatConversionRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterRequest>,
}

impl TransformationRequest {
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeRequest {
    pub width: i64,
    pub height: i64,
}

/// Origin plus size: the region is `[x, x+width) × [y, y+height)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRequest {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotateRequest {
    /// Degrees, counter-clockwise
    pub angle: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlipRequest {
    pub direction: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatermarkRequest {
    pub text: String,
    /// Top-left corner of the text box
    #[serde(default)]
    pub position: Point,
    pub opacity: i64,
    /// Hex text color, white when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatConversionRequest {
    pub format: String,
}

/// Signed percentages; an omitted field means no adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterRequest {
    #[serde(default)]
    pub saturation: i64,
    #[serde(default)]
    pub brightness: i64,
    #[serde(default)]
    pub contrast: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_empty_request() {
        let request = TransformationRequest::from_json(b"{}").unwrap();
        assert_eq!(request, TransformationRequest::default());
    }

    #[test]
    fn test_full_request_parses() {
        let body = br#"{
            "filter": {"saturation": 10, "brightness": -5, "contrast": 20},
            "resize": {"width": 50, "height": 40},
            "crop": {"x": 1, "y": 2, "width": 30, "height": 20},
            "rotate": {"angle": 45.5},
            "flip": {"direction": "horizontal"},
            "watermark": {"text": "hi", "position": {"x": 3, "y": 4}, "opacity": 60},
            "format_conversion": {"format": "png"}
        }"#;
        let request = TransformationRequest::from_json(body).unwrap();
        assert_eq!(request.resize, Some(ResizeRequest { width: 50, height: 40 }));
        assert_eq!(request.rotate.unwrap().angle, 45.5);
        assert_eq!(request.watermark.as_ref().unwrap().position, Point { x: 3, y: 4 });
        assert_eq!(request.watermark.unwrap().color, None);
        assert_eq!(request.format_conversion.unwrap().format, "png");
        assert_eq!(request.filter.unwrap().brightness, -5);
    }

    #[test]
    fn test_partial_filter_defaults_to_zero() {
        let request = TransformationRequest::from_json(br#"{"filter": {"contrast": 15}}"#).unwrap();
        assert_eq!(
            request.filter,
            Some(FilterRequest {
                saturation: 0,
                brightness: 0,
                contrast: 15
            })
        );
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let request = TransformationRequest::from_json(br#"{"sharpen": {"amount": 3}}"#).unwrap();
        assert_eq!(request, TransformationRequest::default());
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(TransformationRequest::from_json(b"{\"resize\": ").is_err());
        assert!(TransformationRequest::from_json(br#"{"resize": {"width": "big"}}"#).is_err());
    }
}
