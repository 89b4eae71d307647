// Pipeline behaviour driven through JSON transformation requests

use image::{ImageFormat, Rgba, RgbaImage};
use rstest::rstest;
use std::io::Cursor;
use vixel::transform::*;

fn encode(img: RgbaImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    let dynamic = image::DynamicImage::ImageRgba8(img);
    if format == ImageFormat::Jpeg {
        dynamic.to_rgb8().write_to(&mut buffer, format).unwrap();
    } else {
        dynamic.write_to(&mut buffer, format).unwrap();
    }
    buffer.into_inner()
}

fn gradient_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 90, 255])
    });
    encode(img, ImageFormat::Jpeg)
}

fn solid_png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    encode(RgbaImage::from_pixel(width, height, Rgba(color)), ImageFormat::Png)
}

fn spec(json: &str) -> Result<TransformationSpec, ImageError> {
    let request = TransformationRequest::from_json(json.as_bytes()).expect("valid JSON");
    TransformationSpec::try_from(request)
}

fn run(source: &[u8], json: &str) -> Result<TransformedImage, ImageError> {
    apply(source, &spec(json)?, &PipelineOptions::default())
}

#[rstest]
#[case("jpeg", ImageFormat::Jpeg, "image/jpeg")]
#[case("jpg", ImageFormat::Jpeg, "image/jpeg")]
#[case("png", ImageFormat::Png, "image/png")]
#[case("tiff", ImageFormat::Tiff, "image/tiff")]
#[case("bmp", ImageFormat::Bmp, "image/bmp")]
#[case("gif", ImageFormat::Gif, "image/gif")]
fn test_format_conversion_targets(
    #[case] name: &str,
    #[case] expected: ImageFormat,
    #[case] content_type: &str,
) {
    let json = format!(r#"{{"format_conversion":{{"format":"{}"}}}}"#, name);
    let out = run(&gradient_jpeg(32, 24), &json).unwrap();
    assert_eq!(detect_format(&out.data), Some(expected));
    assert_eq!(out.content_type, content_type);

    let decoded = image::load_from_memory(&out.data).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (32, 24));
}

#[rstest]
#[case("webp")]
#[case("avif")]
#[case("")]
fn test_unsupported_targets_fail_before_decode(#[case] name: &str) {
    let json = format!(r#"{{"format_conversion":{{"format":"{}"}}}}"#, name);
    assert!(matches!(
        spec(&json),
        Err(ImageError::UnsupportedFormat { .. })
    ));
}

#[test]
fn test_crop_region_is_clipped_to_source() {
    let out = run(
        &gradient_jpeg(100, 100),
        r#"{"crop":{"x":80,"y":80,"width":150,"height":150}}"#,
    )
    .unwrap();
    assert_eq!((out.width, out.height), (20, 20));
}

#[test]
fn test_crop_outside_source_is_rejected() {
    let err = run(
        &gradient_jpeg(100, 100),
        r#"{"crop":{"x":120,"y":0,"width":200,"height":10}}"#,
    )
    .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(err.to_http_status(), 400);
}

#[test]
fn test_arbitrary_rotation_keeps_transparent_corners_in_png() {
    let out = run(
        &solid_png(20, 20, [255, 0, 0, 255]),
        r#"{"rotate":{"angle":45},"format_conversion":{"format":"png"}}"#,
    )
    .unwrap();
    let decoded = image::load_from_memory(&out.data).unwrap().to_rgba8();
    assert!(decoded.width() > 20 && decoded.height() > 20);
    assert_eq!(decoded.get_pixel(0, 0)[3], 0);
    let center = decoded.get_pixel(decoded.width() / 2, decoded.height() / 2);
    assert_eq!(center[3], 255);
    assert!(center[0] > 200);
}

#[test]
fn test_watermark_marks_pixels_and_zero_opacity_does_not() {
    let source = solid_png(200, 60, [0, 0, 0, 255]);

    let marked = run(
        &source,
        r#"{"watermark":{"text":"VIXEL","position":{"x":5,"y":5},"opacity":100},
            "format_conversion":{"format":"png"}}"#,
    )
    .unwrap();
    let marked = image::load_from_memory(&marked.data).unwrap().to_rgba8();
    assert!(marked.pixels().any(|p| p[0] > 128));

    let invisible = run(
        &source,
        r#"{"watermark":{"text":"VIXEL","position":{"x":5,"y":5},"opacity":0},
            "format_conversion":{"format":"png"}}"#,
    )
    .unwrap();
    let invisible = image::load_from_memory(&invisible.data).unwrap().to_rgba8();
    assert!(invisible.pixels().all(|p| p[0] == 0 && p[1] == 0 && p[2] == 0));
}

#[test]
fn test_brightness_filter_saturates_to_white() {
    let out = run(
        &solid_png(8, 8, [128, 128, 128, 255]),
        r#"{"filter":{"brightness":100},"format_conversion":{"format":"png"}}"#,
    )
    .unwrap();
    let decoded = image::load_from_memory(&out.data).unwrap().to_rgba8();
    assert!(decoded.pixels().all(|p| p[0] == 255 && p[1] == 255 && p[2] == 255));
}

#[test]
fn test_out_of_range_filter_is_rejected() {
    assert!(matches!(
        spec(r#"{"filter":{"contrast":101}}"#),
        Err(ImageError::InvalidParameter { .. })
    ));
}

#[test]
fn test_pixel_cap_guards_decode() {
    let options = PipelineOptions {
        max_pixels: 100,
        ..Default::default()
    };
    let err = apply(&gradient_jpeg(20, 20), &spec("{}").unwrap(), &options).unwrap_err();
    assert!(matches!(err, ImageError::ImageBombDetected { .. }));
}

#[test]
fn test_garbage_source_is_decode_error() {
    let err = run(b"definitely not an image", r#"{"flip":{"direction":"vertical"}}"#)
        .unwrap_err();
    assert!(matches!(err, ImageError::DecodeFailed { .. }));
    assert_eq!(err.to_http_status(), 500);
}
