//! Processing parameters carried by an upload key
//!
//! A parameter set is the tuple `{width, height, quality, format, watermark}`.
//! Width and height describe a bounding box, not exact output dimensions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ImageError;

/// Largest accepted bounding-box edge in pixels
pub const MAX_DIMENSION: u32 = 4000;

pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 600;
pub const DEFAULT_QUALITY: u8 = 85;

/// Output image format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
    WebP,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Jpeg, OutputFormat::Png, OutputFormat::WebP];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
        }
    }

    /// File extension used for derived object keys.
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    /// Whether the encoded file can carry an alpha channel.
    pub fn supports_transparency(&self) -> bool {
        !matches!(self, Self::Jpeg)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            _ => Err(ImageError::unsupported_format(s)),
        }
    }
}

/// Image transformation parameters decoded from (or encoded into) a storage key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingParameters {
    /// Maximum output width in pixels
    pub width: u32,
    /// Maximum output height in pixels
    pub height: u32,
    /// Lossy quality (1-100); ignored for PNG
    pub quality: u8,
    pub format: OutputFormat,
    /// Watermark text. `None` means no watermark was requested, which is
    /// not the same as `Some("")`.
    pub watermark: Option<String>,
}

impl Default for ProcessingParameters {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            quality: DEFAULT_QUALITY,
            format: OutputFormat::Jpeg,
            watermark: None,
        }
    }
}

impl ProcessingParameters {
    pub fn new(width: u32, height: u32, quality: u8, format: OutputFormat) -> Self {
        Self {
            width,
            height,
            quality,
            format,
            watermark: None,
        }
    }

    pub fn with_watermark(mut self, text: impl Into<String>) -> Self {
        self.watermark = Some(text.into());
        self
    }

    /// Watermark text if one should actually be drawn.
    pub fn watermark_text(&self) -> Option<&str> {
        self.watermark.as_deref().filter(|text| !text.is_empty())
    }

    /// Check the dimension and quality invariants.
    pub fn validate(&self) -> Result<(), ImageError> {
        validate_dimension("width", self.width)?;
        validate_dimension("height", self.height)?;
        if !(1..=100).contains(&self.quality) {
            return Err(ImageError::InvalidQuality {
                quality: self.quality,
            });
        }
        Ok(())
    }
}

fn validate_dimension(name: &str, value: u32) -> Result<(), ImageError> {
    if (1..=MAX_DIMENSION).contains(&value) {
        Ok(())
    } else {
        Err(ImageError::invalid_param(
            name,
            format!("must be between 1 and {}, got {}", MAX_DIMENSION, value),
        ))
    }
}
