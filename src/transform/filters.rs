//! Color adjustments applied by the filter stage.
//!
//! Saturation, brightness and contrast run in that order. Each takes a
//! signed percentage in -100..=100; zero leaves the image untouched. Alpha
//! is never modified.

use image::RgbaImage;

use super::operations::FilterAdjustments;

pub fn apply(img: &mut RgbaImage, adjustments: &FilterAdjustments) {
    if adjustments.saturation != 0 {
        adjust_saturation(img, adjustments.saturation as f64);
    }
    if adjustments.brightness != 0 {
        adjust_brightness(img, adjustments.brightness as f64);
    }
    if adjustments.contrast != 0 {
        adjust_contrast(img, adjustments.contrast as f64);
    }
}

/// Scale HSL saturation by `1 + percentage/100`, capped at full saturation.
pub fn adjust_saturation(img: &mut RgbaImage, percentage: f64) {
    let multiplier = 1.0 + percentage.clamp(-100.0, 100.0) / 100.0;
    for pixel in img.pixels_mut() {
        let (h, s, l) = rgb_to_hsl(pixel[0], pixel[1], pixel[2]);
        let (r, g, b) = hsl_to_rgb(h, (s * multiplier).clamp(0.0, 1.0), l);
        pixel[0] = r;
        pixel[1] = g;
        pixel[2] = b;
    }
}

/// Shift every channel by `255 * percentage/100`.
pub fn adjust_brightness(img: &mut RgbaImage, percentage: f64) {
    let shift = 255.0 * percentage.clamp(-100.0, 100.0) / 100.0;
    let lut: [u8; 256] = std::array::from_fn(|i| clamp_u8(i as f64 + shift));
    apply_lut(img, &lut);
}

/// Stretch or compress channel values around the midpoint.
///
/// -100 collapses to flat gray, +100 is a hard threshold at 50%.
pub fn adjust_contrast(img: &mut RgbaImage, percentage: f64) {
    let v = (100.0 + percentage.clamp(-100.0, 100.0)) / 100.0;
    let lut: [u8; 256] = std::array::from_fn(|i| {
        let c = i as f64 / 255.0;
        if (0.0..=1.0).contains(&v) {
            clamp_u8((0.5 + (c - 0.5) * v) * 255.0)
        } else if v > 1.0 && v < 2.0 {
            clamp_u8((0.5 + (c - 0.5) * (1.0 / (2.0 - v))) * 255.0)
        } else if c >= 0.5 {
            255
        } else {
            0
        }
    });
    apply_lut(img, &lut);
}

fn apply_lut(img: &mut RgbaImage, lut: &[u8; 256]) {
    for pixel in img.pixels_mut() {
        for channel in pixel.0.iter_mut().take(3) {
            *channel = lut[*channel as usize];
        }
    }
}

fn clamp_u8(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let r = r as f64 / 255.0;
    let g = g as f64 / 255.0;
    let b = b as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if max == min {
        return (0.0, 0.0, l);
    }

    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };

    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    (h / 6.0, s, l)
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    if s == 0.0 {
        let v = clamp_u8(l * 255.0);
        return (v, v, v);
    }

    let q = if l < 0.5 {
        l * (1.0 + s)
    } else {
        l + s - l * s
    };
    let p = 2.0 * l - q;

    let hue_to_channel = |mut t: f64| -> f64 {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        }
    };

    (
        clamp_u8(hue_to_channel(h + 1.0 / 3.0) * 255.0),
        clamp_u8(hue_to_channel(h) * 255.0),
        clamp_u8(hue_to_channel(h - 1.0 / 3.0) * 255.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn single(pixel: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(1, 1, Rgba(pixel))
    }

    #[test]
    fn test_hsl_round_trip() {
        for rgb in [(255, 0, 0), (12, 200, 99), (128, 128, 128), (0, 0, 0), (250, 240, 10)] {
            let (h, s, l) = rgb_to_hsl(rgb.0, rgb.1, rgb.2);
            assert_eq!(hsl_to_rgb(h, s, l), rgb);
        }
    }

    #[test]
    fn test_full_desaturation_is_gray() {
        let mut img = single([200, 40, 90, 77]);
        adjust_saturation(&mut img, -100.0);
        let p = img.get_pixel(0, 0);
        assert_eq!(p[0], p[1]);
        assert_eq!(p[1], p[2]);
        assert_eq!(p[3], 77);
    }

    #[test]
    fn test_saturation_increase_spreads_channels() {
        let mut img = single([150, 110, 100, 255]);
        adjust_saturation(&mut img, 80.0);
        let p = img.get_pixel(0, 0);
        assert!(p[0] as i32 - p[2] as i32 > 50);
    }

    #[test]
    fn test_brightness_shifts_and_clamps() {
        let mut img = single([10, 128, 250, 255]);
        adjust_brightness(&mut img, 10.0);
        assert_eq!(*img.get_pixel(0, 0), Rgba([36, 154, 255, 255]));

        let mut dark = single([10, 128, 250, 255]);
        adjust_brightness(&mut dark, -100.0);
        assert_eq!(*dark.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_contrast_minimum_is_flat_gray() {
        let mut img = single([0, 100, 255, 255]);
        adjust_contrast(&mut img, -100.0);
        let p = img.get_pixel(0, 0);
        assert_eq!((p[0], p[1], p[2]), (128, 128, 128));
    }

    #[test]
    fn test_contrast_maximum_thresholds() {
        let mut img = single([100, 127, 128, 255]);
        adjust_contrast(&mut img, 100.0);
        assert_eq!(*img.get_pixel(0, 0), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_contrast_increase_moves_away_from_midpoint() {
        let mut img = single([64, 192, 128, 255]);
        adjust_contrast(&mut img, 50.0);
        let p = img.get_pixel(0, 0);
        assert!(p[0] < 64);
        assert!(p[1] > 192);
    }

    #[test]
    fn test_zero_adjustments_are_noop() {
        let mut img = RgbaImage::from_fn(4, 4, |x, y| Rgba([x as u8 * 60, y as u8 * 60, 33, 200]));
        let before = img.clone();
        apply(&mut img, &FilterAdjustments::default());
        assert_eq!(img, before);
    }
}
