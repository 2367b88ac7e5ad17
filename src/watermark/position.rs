//! Position calculation for watermark placement.
//!
//! Text watermarks are anchored to the bottom-right corner of the image with
//! a fixed inset. Marks wider or taller than the available space are pinned
//! to the top/left edge instead of going negative.

/// Dimensions of the target image.
#[derive(Debug, Clone, Copy)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Dimensions of the watermark to be placed.
#[derive(Debug, Clone, Copy)]
pub struct WatermarkDimensions {
    pub width: u32,
    pub height: u32,
}

/// Top-left corner where a watermark should be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementPosition {
    pub x: i32,
    pub y: i32,
}

impl PlacementPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Place the mark so its bottom-right corner sits `margin` pixels in from the
/// image's bottom-right corner, clamped at zero.
pub fn bottom_right_position(
    image: &ImageDimensions,
    watermark: &WatermarkDimensions,
    margin: u32,
) -> PlacementPosition {
    let x = image.width as i64 - watermark.width as i64 - margin as i64;
    let y = image.height as i64 - watermark.height as i64 - margin as i64;
    PlacementPosition::new(x.max(0) as i32, y.max(0) as i32)
}

/// Font size for a watermark on an image `image_width` pixels wide.
///
/// `ratio` of the width, truncated, and never below one pixel.
pub fn font_size_for_width(image_width: u32, ratio: f32) -> f32 {
    ((image_width as f32 * ratio).floor()).max(1.0)
}

/// Check whether any part of the watermark lands on the image.
pub fn is_visible(
    position: &PlacementPosition,
    image: &ImageDimensions,
    watermark: &WatermarkDimensions,
) -> bool {
    let right = position.x as i64 + watermark.width as i64;
    let bottom = position.y as i64 + watermark.height as i64;
    right > 0 && bottom > 0 && (position.x as i64) < image.width as i64 && (position.y as i64) < image.height as i64
}
