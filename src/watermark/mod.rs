//! Text watermarks.
//!
//! Renders caller-supplied text in the embedded font and composites it onto
//! an image at an absolute position. The requested opacity (percent) is the
//! composite alpha of the text layer.

pub mod compositor;
pub mod error;
pub mod text_renderer;

pub use compositor::{blend_layer, WatermarkLayer};
pub use error::WatermarkError;
pub use text_renderer::{
    measure_text, parse_hex_color, render_text, render_text_window, Color, TextRenderOptions,
    TextWindow,
};

use image::RgbaImage;

/// Parameters for stamping one line of text onto an image.
#[derive(Debug, Clone)]
pub struct TextStamp<'a> {
    pub text: &'a str,
    pub x: i32,
    pub y: i32,
    /// 0..=100
    pub opacity_percent: u8,
    pub color: Color,
    pub font_size: f32,
}

/// Render `stamp.text` and blend it onto `target` in place.
///
/// Only the part of the text box that overlaps `target` is rasterised.
pub fn apply_text_watermark(
    target: &mut RgbaImage,
    stamp: &TextStamp<'_>,
) -> Result<(), WatermarkError> {
    let options = TextRenderOptions {
        text: stamp.text.to_string(),
        font_size: stamp.font_size,
        color: stamp.color,
    };
    text_renderer::validate_options(&options)?;
    let (text_width, text_height) = measure_text(stamp.text, stamp.font_size)?;

    let (x, y) = (stamp.x as i64, stamp.y as i64);
    let left = x.max(0);
    let top = y.max(0);
    let right = (x + text_width as i64).min(target.width() as i64);
    let bottom = (y + text_height as i64).min(target.height() as i64);
    if right <= left || bottom <= top {
        return Ok(());
    }

    let window = TextWindow {
        x: (left - x) as u32,
        y: (top - y) as u32,
        width: (right - left) as u32,
        height: (bottom - top) as u32,
    };
    let rendered = render_text_window(&options, window)?;

    let layer = WatermarkLayer {
        image: rendered,
        x: left as i32,
        y: top as i32,
        opacity: stamp.opacity_percent.min(100) as f32 / 100.0,
    };
    blend_layer(target, &layer);
    Ok(())
}
