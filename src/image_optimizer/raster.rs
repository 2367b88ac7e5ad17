//! Decoded raster images
//!
//! Every input is normalized to 8-bit RGB or RGBA on decode so the transform
//! and encode stages only ever see two pixel layouts.

use image::io::Reader as ImageReader;
use image::{DynamicImage, RgbImage, RgbaImage};
use std::io::Cursor;

use super::error::ImageError;

/// Pixel layout of a [`RasterImage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    /// 3 bytes per pixel, opaque
    Rgb,
    /// 4 bytes per pixel, straight (non-premultiplied) alpha
    Rgba,
}

impl ColorMode {
    pub fn channels(&self) -> usize {
        match self {
            ColorMode::Rgb => 3,
            ColorMode::Rgba => 4,
        }
    }
}

/// Owned pixel buffer with its dimensions and color mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    mode: ColorMode,
    pixels: Vec<u8>,
}

impl RasterImage {
    /// Wrap a raw pixel buffer, checking that its length matches the layout.
    pub fn new(
        width: u32,
        height: u32,
        mode: ColorMode,
        pixels: Vec<u8>,
    ) -> Result<Self, ImageError> {
        let expected = width as usize * height as usize * mode.channels();
        if width == 0 || height == 0 {
            return Err(ImageError::invalid_param(
                "dimensions",
                format!("{}x{} has no pixels", width, height),
            ));
        }
        if pixels.len() != expected {
            return Err(ImageError::invalid_param(
                "pixels",
                format!("expected {} bytes, got {}", expected, pixels.len()),
            ));
        }
        Ok(Self {
            width,
            height,
            mode,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn mode(&self) -> ColorMode {
        self.mode
    }

    pub fn has_alpha(&self) -> bool {
        self.mode == ColorMode::Rgba
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Composite onto opaque white and drop the alpha channel.
    ///
    /// Identity for `Rgb` images.
    pub fn flatten(self) -> RasterImage {
        if self.mode == ColorMode::Rgb {
            return self;
        }

        let mut rgb = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for px in self.pixels.chunks_exact(4) {
            let alpha = px[3] as u32;
            for &channel in &px[..3] {
                rgb.push(blend_over_white(channel as u32, alpha));
            }
        }

        RasterImage {
            width: self.width,
            height: self.height,
            mode: ColorMode::Rgb,
            pixels: rgb,
        }
    }

    /// Add a fully opaque alpha channel. Identity for `Rgba` images.
    pub fn promote(self) -> RasterImage {
        if self.mode == ColorMode::Rgba {
            return self;
        }

        let mut rgba = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for px in self.pixels.chunks_exact(3) {
            rgba.extend_from_slice(px);
            rgba.push(255);
        }

        RasterImage {
            width: self.width,
            height: self.height,
            mode: ColorMode::Rgba,
            pixels: rgba,
        }
    }

    /// Convert into an `image` crate buffer, promoting to RGBA if needed.
    pub fn into_rgba_image(self) -> Result<RgbaImage, ImageError> {
        let promoted = self.promote();
        RgbaImage::from_raw(promoted.width, promoted.height, promoted.pixels)
            .ok_or_else(|| ImageError::invalid_param("pixels", "buffer does not match dimensions"))
    }

    pub fn from_rgba_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            mode: ColorMode::Rgba,
            pixels: image.into_raw(),
        }
    }

    pub fn from_rgb_image(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            mode: ColorMode::Rgb,
            pixels: image.into_raw(),
        }
    }

    /// Normalize any decoded image to 8-bit RGB or RGBA.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        if image.color().has_alpha() {
            Self::from_rgba_image(image.into_rgba8())
        } else {
            Self::from_rgb_image(image.into_rgb8())
        }
    }
}

fn blend_over_white(channel: u32, alpha: u32) -> u8 {
    ((channel * alpha + 255 * (255 - alpha) + 127) / 255) as u8
}

/// Decode JPEG, PNG, WebP or GIF bytes into a [`RasterImage`]
pub fn decode(data: &[u8]) -> Result<RasterImage, ImageError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ImageError::decode_failed(e.to_string()))?;

    if reader.format().is_none() {
        return Err(ImageError::unrecognized_input(
            "input does not match any supported image format",
        ));
    }

    let decoded = reader
        .decode()
        .map_err(|e| ImageError::decode_failed(e.to_string()))?;

    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(ImageError::decode_failed("image has zero area"));
    }

    Ok(RasterImage::from_dynamic(decoded))
}
