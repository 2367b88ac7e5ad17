//! Text watermarking.
//!
//! A watermark is a single line of white text at about 50% opacity, drawn in
//! the embedded DejaVu Sans Bold font at 5% of the image width and inset 20px
//! from the bottom-right corner.

pub mod compositor;
pub mod error;
pub mod position;
pub mod processor;
pub mod text_renderer;

pub use compositor::{blend_layer, WatermarkLayer};
pub use error::WatermarkError;
pub use position::{
    bottom_right_position, font_size_for_width, is_visible, ImageDimensions, PlacementPosition,
    WatermarkDimensions,
};
pub use processor::{apply_text_watermark, EDGE_PADDING, FONT_SIZE_RATIO, TEXT_ALPHA};
pub use text_renderer::{measure_text, render_text, Color, TextMetrics, TextRenderOptions};
