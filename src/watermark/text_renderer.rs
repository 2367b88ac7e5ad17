//! Text watermark rendering.
//!
//! Lays out a single line of text with the embedded DejaVu Sans Bold font and
//! rasterizes it onto a transparent RGBA canvas cropped to the text's ink
//! bounding box (the union of the glyph outlines, not the advance box).

use super::WatermarkError;
use ab_glyph::{point, Font, FontRef, InvalidFont, OutlinedGlyph, PxScale, Rect, ScaleFont};
use image::{Rgba, RgbaImage};
use std::sync::OnceLock;

const EMBEDDED_FONT_DATA: &[u8] = include_bytes!("fonts/DejaVuSans-Bold.ttf");

static EMBEDDED_FONT: OnceLock<Result<FontRef<'static>, InvalidFont>> = OnceLock::new();

/// Get the embedded font, parsing it on first use.
fn embedded_font() -> Result<&'static FontRef<'static>, WatermarkError> {
    EMBEDDED_FONT
        .get_or_init(|| FontRef::try_from_slice(EMBEDDED_FONT_DATA))
        .as_ref()
        .map_err(|e| WatermarkError::FontError(e.to_string()))
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
}

/// Options for text rendering.
#[derive(Debug, Clone)]
pub struct TextRenderOptions {
    /// The text to render.
    pub text: String,
    /// Font size in pixels.
    pub font_size: f32,
    pub color: Color,
    /// Alpha of fully covered pixels (0-255).
    pub alpha: u8,
}

impl Default for TextRenderOptions {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_size: 24.0,
            color: Color::white(),
            alpha: 128,
        }
    }
}

/// Ink extent of a laid-out line of text, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextMetrics {
    pub width: u32,
    pub height: u32,
}

impl TextMetrics {
    /// True when the text produced no visible glyphs (e.g. only spaces).
    pub fn is_blank(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

struct TextLayout {
    glyphs: Vec<OutlinedGlyph>,
    ink: Option<Rect>,
}

impl TextLayout {
    fn metrics(&self) -> TextMetrics {
        match self.ink {
            Some(ink) => TextMetrics {
                width: (ink.max.x - ink.min.x).max(0.0) as u32,
                height: (ink.max.y - ink.min.y).max(0.0) as u32,
            },
            None => TextMetrics::default(),
        }
    }
}

fn layout_text(text: &str, font_size: f32) -> Result<TextLayout, WatermarkError> {
    if !(font_size.is_finite() && font_size > 0.0) {
        return Err(WatermarkError::RenderError(format!(
            "font size must be positive, got {}",
            font_size
        )));
    }

    let font = embedded_font()?;
    let scale = PxScale::from(font_size);
    let scaled_font = font.as_scaled(scale);
    let baseline_y = scaled_font.ascent();

    let mut glyphs = Vec::new();
    let mut ink: Option<Rect> = None;
    let mut cursor_x = 0.0f32;
    let mut prev_glyph: Option<ab_glyph::GlyphId> = None;

    for c in text.chars() {
        let glyph_id = scaled_font.glyph_id(c);

        if let Some(prev) = prev_glyph {
            cursor_x += scaled_font.kern(prev, glyph_id);
        }

        let glyph = glyph_id.with_scale_and_position(scale, point(cursor_x, baseline_y));
        cursor_x += scaled_font.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);

        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            ink = Some(match ink {
                Some(acc) => Rect {
                    min: point(acc.min.x.min(bounds.min.x), acc.min.y.min(bounds.min.y)),
                    max: point(acc.max.x.max(bounds.max.x), acc.max.y.max(bounds.max.y)),
                },
                None => bounds,
            });
            glyphs.push(outlined);
        }
    }

    Ok(TextLayout { glyphs, ink })
}

/// Measure the ink bounding box of `text` at `font_size`.
pub fn measure_text(text: &str, font_size: f32) -> Result<TextMetrics, WatermarkError> {
    Ok(layout_text(text, font_size)?.metrics())
}

/// Render text to a transparent RGBA image cropped to its ink bounding box.
///
/// Blank text (empty or whitespace only) is an error; callers are expected to
/// skip rendering in that case.
pub fn render_text(options: &TextRenderOptions) -> Result<RgbaImage, WatermarkError> {
    let layout = layout_text(&options.text, options.font_size)?;
    let metrics = layout.metrics();
    let ink = match layout.ink {
        Some(ink) if !metrics.is_blank() => ink,
        _ => {
            return Err(WatermarkError::RenderError(
                "text has no visible glyphs".to_string(),
            ))
        }
    };

    let mut canvas = RgbaImage::new(metrics.width, metrics.height);
    let (canvas_w, canvas_h) = (metrics.width as i32, metrics.height as i32);

    for glyph in &layout.glyphs {
        let bounds = glyph.px_bounds();
        let offset_x = (bounds.min.x - ink.min.x) as i32;
        let offset_y = (bounds.min.y - ink.min.y) as i32;

        glyph.draw(|px, py, coverage| {
            let x = px as i32 + offset_x;
            let y = py as i32 + offset_y;
            if x < 0 || y < 0 || x >= canvas_w || y >= canvas_h {
                return;
            }

            let coverage_alpha = (coverage.clamp(0.0, 1.0) * options.alpha as f32).round() as u8;
            if coverage_alpha == 0 {
                return;
            }

            // Overlapping glyph edges keep the stronger coverage
            let existing = canvas.get_pixel(x as u32, y as u32)[3];
            canvas.put_pixel(
                x as u32,
                y as u32,
                Rgba([
                    options.color.r,
                    options.color.g,
                    options.color.b,
                    existing.max(coverage_alpha),
                ]),
            );
        });
    }

    Ok(canvas)
}
