//! Text watermark rendering.
//!
//! Renders a line of text in the embedded font onto a transparent RGBA
//! canvas sized to fit it. Glyph coverage becomes the alpha channel; the
//! caller's opacity is applied later, at composite time.

use super::WatermarkError;
use ab_glyph::{Font, FontRef, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use std::sync::OnceLock;

static DEFAULT_FONT: OnceLock<Option<FontRef<'static>>> = OnceLock::new();

/// DejaVu Sans Mono, monospace for predictable widths.
const EMBEDDED_FONT_DATA: &[u8] = include_bytes!("fonts/DejaVuSansMono.ttf");

/// Get the default font, parsing it on first use.
fn default_font() -> Result<&'static FontRef<'static>, WatermarkError> {
    DEFAULT_FONT
        .get_or_init(|| FontRef::try_from_slice(EMBEDDED_FONT_DATA).ok())
        .as_ref()
        .ok_or_else(|| WatermarkError::RenderError("embedded font failed to load".to_string()))
}

/// RGB text color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255)
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0)
    }
}

/// Options for text rendering.
#[derive(Debug, Clone)]
pub struct TextRenderOptions {
    pub text: String,
    /// Font size in pixels.
    pub font_size: f32,
    pub color: Color,
}

impl Default for TextRenderOptions {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_size: 24.0,
            color: Color::white(),
        }
    }
}

fn hex_digits(hex: &str) -> Result<u8, WatermarkError> {
    u8::from_str_radix(hex, 16)
        .map_err(|_| WatermarkError::InvalidColor(format!("invalid hex digits '{}'", hex)))
}

/// Parse a hex color string into RGB components.
///
/// Supports both #RGB and #RRGGBB formats.
///
/// ```
/// use vixel::watermark::{parse_hex_color, Color};
///
/// assert_eq!(parse_hex_color("#FFF").unwrap(), Color::new(255, 255, 255));
/// assert_eq!(parse_hex_color("#FF0000").unwrap(), Color::new(255, 0, 0));
/// ```
pub fn parse_hex_color(hex: &str) -> Result<Color, WatermarkError> {
    let hex = hex
        .trim()
        .strip_prefix('#')
        .ok_or_else(|| WatermarkError::InvalidColor("color must start with '#'".to_string()))?;

    if !hex.is_ascii() {
        return Err(WatermarkError::InvalidColor(
            "color must be ASCII hex".to_string(),
        ));
    }

    match hex.len() {
        3 => {
            // Each digit doubled: 0xF -> 0xFF
            let r = hex_digits(&hex[0..1])?;
            let g = hex_digits(&hex[1..2])?;
            let b = hex_digits(&hex[2..3])?;
            Ok(Color::new(r * 17, g * 17, b * 17))
        }
        6 => {
            let r = hex_digits(&hex[0..2])?;
            let g = hex_digits(&hex[2..4])?;
            let b = hex_digits(&hex[4..6])?;
            Ok(Color::new(r, g, b))
        }
        n => Err(WatermarkError::InvalidColor(format!(
            "color must be #RGB or #RRGGBB, got {} digits",
            n
        ))),
    }
}

/// Calculate the dimensions of rendered text.
///
/// Returns (width, height) in pixels.
pub fn measure_text(text: &str, font_size: f32) -> Result<(u32, u32), WatermarkError> {
    let font = default_font()?;
    let scale = PxScale::from(font_size);
    let scaled_font = font.as_scaled(scale);

    let mut width = 0.0f32;
    let mut prev_glyph: Option<ab_glyph::GlyphId> = None;

    for c in text.chars() {
        let glyph_id = scaled_font.glyph_id(c);
        if let Some(prev) = prev_glyph {
            width += scaled_font.kern(prev, glyph_id);
        }
        width += scaled_font.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);
    }

    let height = scaled_font.height();

    let padding = 2;
    Ok((
        (width.ceil() as u32).saturating_add(padding),
        (height.ceil() as u32).saturating_add(padding),
    ))
}

/// Rectangle of the text box to rasterise, in text-local pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextWindow {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

pub(crate) fn validate_options(options: &TextRenderOptions) -> Result<(), WatermarkError> {
    if options.text.is_empty() {
        return Err(WatermarkError::RenderError(
            "cannot render empty text".to_string(),
        ));
    }
    if options.font_size.is_nan() || options.font_size <= 0.0 {
        return Err(WatermarkError::RenderError(format!(
            "font size must be > 0, got {}",
            options.font_size
        )));
    }
    Ok(())
}

/// Render text to a transparent RGBA image sized to fit it.
pub fn render_text(options: &TextRenderOptions) -> Result<RgbaImage, WatermarkError> {
    validate_options(options)?;
    let (width, height) = measure_text(&options.text, options.font_size)?;
    render_text_window(
        options,
        TextWindow {
            x: 0,
            y: 0,
            width,
            height,
        },
    )
}

/// Render only `window` of the text box.
///
/// The canvas is the size of the window, never of the whole text, so a long
/// line clipped by a small image costs no more memory than the image.
pub fn render_text_window(
    options: &TextRenderOptions,
    window: TextWindow,
) -> Result<RgbaImage, WatermarkError> {
    validate_options(options)?;

    let font = default_font()?;
    let scale = PxScale::from(options.font_size);
    let scaled_font = font.as_scaled(scale);

    let (canvas_width, canvas_height) = (window.width.max(1), window.height.max(1));
    let mut image = RgbaImage::new(canvas_width, canvas_height);

    let window_left = window.x as f32;
    let window_right = window.x as f32 + canvas_width as f32;
    // Glyph outlines may overhang their advance box by a little
    let overhang = scaled_font.height();

    let baseline_y = scaled_font.ascent();
    let mut cursor_x = 0.0f32;
    let mut prev_glyph: Option<ab_glyph::GlyphId> = None;

    for c in options.text.chars() {
        if cursor_x > window_right + overhang {
            break;
        }

        let glyph_id = scaled_font.glyph_id(c);
        if let Some(prev) = prev_glyph {
            cursor_x += scaled_font.kern(prev, glyph_id);
        }
        let advance = scaled_font.h_advance(glyph_id);

        if cursor_x + advance + overhang >= window_left {
            let glyph =
                glyph_id.with_scale_and_position(scale, ab_glyph::point(cursor_x, baseline_y));

            if let Some(outlined) = font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();

                outlined.draw(|px, py, coverage| {
                    let x = px as i64 + bounds.min.x as i64 - window.x as i64;
                    let y = py as i64 + bounds.min.y as i64 - window.y as i64;

                    if x >= 0 && y >= 0 && x < canvas_width as i64 && y < canvas_height as i64 {
                        let alpha = (coverage.clamp(0.0, 1.0) * 255.0) as u8;
                        let existing = image.get_pixel(x as u32, y as u32);
                        // Overlapping glyph edges keep the stronger coverage
                        if alpha > existing[3] {
                            image.put_pixel(
                                x as u32,
                                y as u32,
                                Rgba([options.color.r, options.color.g, options.color.b, alpha]),
                            );
                        }
                    }
                });
            }
        }

        cursor_x += advance;
        prev_glyph = Some(glyph_id);
    }

    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color_rrggbb() {
        assert_eq!(parse_hex_color("#FF0000").unwrap(), Color::new(255, 0, 0));
        assert_eq!(parse_hex_color("#00ff80").unwrap(), Color::new(0, 255, 128));
    }

    #[test]
    fn test_parse_hex_color_rgb() {
        assert_eq!(parse_hex_color("#FFF").unwrap(), Color::white());
        assert_eq!(parse_hex_color("#000").unwrap(), Color::black());
        assert_eq!(parse_hex_color("#A0F").unwrap(), Color::new(170, 0, 255));
    }

    #[test]
    fn test_parse_hex_color_invalid() {
        assert!(parse_hex_color("FFFFFF").is_err());
        assert!(parse_hex_color("#FFFF").is_err());
        assert!(parse_hex_color("#GGGGGG").is_err());
        assert!(parse_hex_color("#").is_err());
        assert!(matches!(
            parse_hex_color("#ÿÿ"),
            Err(WatermarkError::InvalidColor(_))
        ));
    }

    #[test]
    fn test_render_text_creates_rgba_image() {
        let options = TextRenderOptions {
            text: "Vixel".to_string(),
            ..Default::default()
        };
        let image = render_text(&options).unwrap();
        let (w, h) = measure_text("Vixel", 24.0).unwrap();
        assert_eq!((image.width(), image.height()), (w, h));
        assert!(image.pixels().any(|p| p[3] > 0), "no glyph pixels drawn");
        assert!(image.pixels().any(|p| p[3] == 0), "no transparent background");
    }

    #[test]
    fn test_render_text_uses_color() {
        let options = TextRenderOptions {
            text: "X".to_string(),
            font_size: 32.0,
            color: Color::new(10, 20, 30),
        };
        let image = render_text(&options).unwrap();
        let drawn = image.pixels().find(|p| p[3] > 0).unwrap();
        assert_eq!((drawn[0], drawn[1], drawn[2]), (10, 20, 30));
    }

    #[test]
    fn test_font_size_affects_dimensions() {
        let small = measure_text("Hello", 12.0).unwrap();
        let large = measure_text("Hello", 48.0).unwrap();
        assert!(large.0 > small.0);
        assert!(large.1 > small.1);
    }

    #[test]
    fn test_window_matches_full_render() {
        let options = TextRenderOptions {
            text: "window".to_string(),
            ..Default::default()
        };
        let full = render_text(&options).unwrap();
        let window = TextWindow {
            x: 20,
            y: 4,
            width: 30,
            height: 15,
        };
        let part = render_text_window(&options, window).unwrap();

        assert_eq!(part.dimensions(), (30, 15));
        for (x, y, pixel) in part.enumerate_pixels() {
            assert_eq!(pixel, full.get_pixel(x + 20, y + 4), "at ({}, {})", x, y);
        }
    }

    #[test]
    fn test_long_text_window_stays_small() {
        let options = TextRenderOptions {
            text: "W".repeat(200_000),
            ..Default::default()
        };
        let (full_width, _) = measure_text(&options.text, options.font_size).unwrap();
        assert!(full_width > 1_000_000);

        let part = render_text_window(
            &options,
            TextWindow {
                x: 0,
                y: 0,
                width: 10,
                height: 10,
            },
        )
        .unwrap();
        assert_eq!(part.dimensions(), (10, 10));
        assert!(part.pixels().any(|p| p[3] > 0));
    }

    #[test]
    fn test_render_empty_text_error() {
        assert!(render_text(&TextRenderOptions::default()).is_err());
    }

    #[test]
    fn test_render_rejects_zero_font_size() {
        let options = TextRenderOptions {
            text: "hi".to_string(),
            font_size: 0.0,
            ..Default::default()
        };
        assert!(render_text(&options).is_err());
    }
}
