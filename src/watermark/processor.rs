//! Text watermark application.
//!
//! Draws a semi-transparent white caption into the bottom-right corner of a
//! [`RasterImage`]. The caption is sized relative to the image width so it
//! reads the same at any output resolution.

use tracing::debug;

use super::compositor::{blend_layer, WatermarkLayer};
use super::position::{
    bottom_right_position, font_size_for_width, is_visible, ImageDimensions, WatermarkDimensions,
};
use super::text_renderer::{measure_text, render_text, Color, TextRenderOptions};
use super::WatermarkError;
use crate::image_optimizer::RasterImage;

/// Caption height as a fraction of the image width
pub const FONT_SIZE_RATIO: f32 = 0.05;

/// Inset from the bottom and right edges, in pixels
pub const EDGE_PADDING: u32 = 20;

/// Alpha of the caption ink (about 50%)
pub const TEXT_ALPHA: u8 = 128;

/// Composite `text` onto `image`.
///
/// Absent, empty and whitespace-only text return the image untouched. Images
/// without alpha come back without alpha; images with alpha keep it.
pub fn apply_text_watermark(
    image: RasterImage,
    text: Option<&str>,
) -> Result<RasterImage, WatermarkError> {
    let text = match text {
        Some(text) if !text.is_empty() => text,
        _ => return Ok(image),
    };

    let font_size = font_size_for_width(image.width(), FONT_SIZE_RATIO);
    let metrics = measure_text(text, font_size)?;
    if metrics.is_blank() {
        debug!(text = %text, "Watermark text has no visible glyphs, skipping");
        return Ok(image);
    }

    let image_dims = ImageDimensions {
        width: image.width(),
        height: image.height(),
    };
    let mark_dims = WatermarkDimensions {
        width: metrics.width,
        height: metrics.height,
    };
    let position = bottom_right_position(&image_dims, &mark_dims, EDGE_PADDING);
    if !is_visible(&position, &image_dims, &mark_dims) {
        return Ok(image);
    }

    let rendered = render_text(&TextRenderOptions {
        text: text.to_string(),
        font_size,
        color: Color::white(),
        alpha: TEXT_ALPHA,
    })?;

    debug!(
        font_size,
        text_width = metrics.width,
        text_height = metrics.height,
        x = position.x,
        y = position.y,
        "Compositing text watermark"
    );

    let had_alpha = image.has_alpha();
    let mut canvas = image
        .into_rgba_image()
        .map_err(|e| WatermarkError::CompositeError(e.to_string()))?;
    blend_layer(&mut canvas, &WatermarkLayer::new(rendered, position));

    let composited = RasterImage::from_rgba_image(canvas);
    Ok(if had_alpha {
        composited
    } else {
        composited.flatten()
    })
}
