//! Geometric stages: resize, crop, rotate, flip.
//!
//! All stages work on the pipeline's RGBA working buffer.

use std::num::NonZeroU32;

use fast_image_resize::{FilterType, Image, PixelType, ResizeAlg, Resizer};
use image::{imageops, Rgba, RgbaImage};

use super::error::ImageError;
use super::operations::FlipDirection;

/// Resize to exactly `target_w`×`target_h` with Lanczos3; aspect ratio is not preserved.
pub fn resize(img: &RgbaImage, target_w: u32, target_h: u32) -> Result<RgbaImage, ImageError> {
    if (img.width(), img.height()) == (target_w, target_h) {
        return Ok(img.clone());
    }

    let src_width = NonZeroU32::new(img.width())
        .ok_or_else(|| ImageError::resize_failed("Source width is 0"))?;
    let src_height = NonZeroU32::new(img.height())
        .ok_or_else(|| ImageError::resize_failed("Source height is 0"))?;
    let dst_width =
        NonZeroU32::new(target_w).ok_or_else(|| ImageError::resize_failed("Target width is 0"))?;
    let dst_height =
        NonZeroU32::new(target_h).ok_or_else(|| ImageError::resize_failed("Target height is 0"))?;

    let src_image = Image::from_vec_u8(
        src_width,
        src_height,
        img.as_raw().clone(),
        PixelType::U8x4,
    )
    .map_err(|e| ImageError::resize_failed(format!("Failed to create source image: {:?}", e)))?;

    let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x4);

    let mut resizer = Resizer::new(ResizeAlg::Convolution(FilterType::Lanczos3));
    resizer
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| ImageError::resize_failed(format!("Resize operation failed: {:?}", e)))?;

    RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| ImageError::resize_failed("Failed to create output image buffer"))
}

/// Extract `[x, x+width) × [y, y+height)`, clipped to the source bounds.
///
/// An origin outside the image is a parameter error; an empty result is never produced.
pub fn crop(
    img: &RgbaImage,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
) -> Result<RgbaImage, ImageError> {
    let (src_w, src_h) = img.dimensions();
    if x >= src_w || y >= src_h {
        return Err(ImageError::invalid_param(
            "crop",
            format!(
                "origin ({}, {}) lies outside the {}x{} image",
                x, y, src_w, src_h
            ),
        ));
    }

    let clipped_w = width.min(src_w - x);
    let clipped_h = height.min(src_h - y);
    Ok(imageops::crop_imm(img, x, y, clipped_w, clipped_h).to_image())
}

/// Quarter turns in `degrees`, if it is an exact multiple of 90
fn quarter_turns(degrees: f64) -> Option<u32> {
    let normalized = degrees.rem_euclid(360.0);
    let quarter = (normalized / 90.0).round();
    ((normalized - quarter * 90.0).abs() < 1e-9).then_some(quarter as u32 % 4)
}

/// Output dimensions of [`rotate`], computed without touching pixels
pub fn rotated_bounds(width: u32, height: u32, degrees: f64) -> (u32, u32) {
    match quarter_turns(degrees) {
        Some(0) | Some(2) => (width, height),
        Some(_) => (height, width),
        None => {
            let (sin, cos) = degrees.rem_euclid(360.0).to_radians().sin_cos();
            let (w, h) = (width as f64, height as f64);
            let dst_w = ((w * cos.abs() + h * sin.abs()).ceil() as u32).max(1);
            let dst_h = ((w * sin.abs() + h * cos.abs()).ceil() as u32).max(1);
            (dst_w, dst_h)
        }
    }
}

/// Rotate counter-clockwise by `degrees` about the image center.
///
/// Quarter turns are exact pixel permutations. Other angles grow the canvas
/// to the rotated bounding box and fill exposed corners with transparency.
pub fn rotate(img: &RgbaImage, degrees: f64) -> RgbaImage {
    match quarter_turns(degrees) {
        // Counter-clockwise quarter turns map onto imageops' clockwise ones
        Some(0) => img.clone(),
        Some(1) => imageops::rotate270(img),
        Some(2) => imageops::rotate180(img),
        Some(_) => imageops::rotate90(img),
        None => rotate_bilinear(img, degrees),
    }
}

fn rotate_bilinear(img: &RgbaImage, degrees: f64) -> RgbaImage {
    let (sin, cos) = degrees.rem_euclid(360.0).to_radians().sin_cos();
    let src_w = img.width() as f64;
    let src_h = img.height() as f64;

    let (dst_w, dst_h) = rotated_bounds(img.width(), img.height(), degrees);

    let (src_cx, src_cy) = (src_w / 2.0, src_h / 2.0);
    let (dst_cx, dst_cy) = (dst_w as f64 / 2.0, dst_h as f64 / 2.0);

    RgbaImage::from_fn(dst_w, dst_h, |dx, dy| {
        // Destination pixel center relative to the canvas center
        let rx = dx as f64 + 0.5 - dst_cx;
        let ry = dy as f64 + 0.5 - dst_cy;

        // Inverse of a counter-clockwise rotation in y-down coordinates
        let sx = rx * cos - ry * sin + src_cx - 0.5;
        let sy = rx * sin + ry * cos + src_cy - 0.5;

        sample_bilinear(img, sx, sy)
    })
}

/// Bilinear sample with transparent pixels outside the image.
///
/// Interpolates premultiplied color so edges fade to transparent rather than dark.
fn sample_bilinear(img: &RgbaImage, sx: f64, sy: f64) -> Rgba<u8> {
    let x0 = sx.floor();
    let y0 = sy.floor();
    let fx = sx - x0;
    let fy = sy - y0;

    let fetch = |x: f64, y: f64| -> [f64; 4] {
        if x < 0.0 || y < 0.0 || x >= img.width() as f64 || y >= img.height() as f64 {
            return [0.0; 4];
        }
        let p = img.get_pixel(x as u32, y as u32);
        let a = p[3] as f64 / 255.0;
        [p[0] as f64 * a, p[1] as f64 * a, p[2] as f64 * a, a]
    };

    let taps = [
        (fetch(x0, y0), (1.0 - fx) * (1.0 - fy)),
        (fetch(x0 + 1.0, y0), fx * (1.0 - fy)),
        (fetch(x0, y0 + 1.0), (1.0 - fx) * fy),
        (fetch(x0 + 1.0, y0 + 1.0), fx * fy),
    ];

    let mut acc = [0.0f64; 4];
    for (px, weight) in taps {
        for (sum, channel) in acc.iter_mut().zip(px) {
            *sum += channel * weight;
        }
    }

    let alpha = acc[3];
    if alpha <= f64::EPSILON {
        return Rgba([0, 0, 0, 0]);
    }
    let unpremultiply = |c: f64| (c / alpha).round().clamp(0.0, 255.0) as u8;
    Rgba([
        unpremultiply(acc[0]),
        unpremultiply(acc[1]),
        unpremultiply(acc[2]),
        (alpha * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

pub fn flip(img: &mut RgbaImage, direction: FlipDirection) {
    match direction {
        FlipDirection::Horizontal => imageops::flip_horizontal_in_place(img),
        FlipDirection::Vertical => imageops::flip_vertical_in_place(img),
    }
}
