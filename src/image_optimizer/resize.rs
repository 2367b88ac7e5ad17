//! Aspect-preserving downscale
//!
//! Uses fast-image-resize with a Lanczos3 convolution. RGBA input is
//! premultiplied before resampling so transparent pixels do not bleed their
//! color into visible neighbours.

use fast_image_resize::{FilterType, Image, MulDiv, PixelType, ResizeAlg, Resizer};
use std::num::NonZeroU32;

use super::error::ImageError;
use super::raster::{ColorMode, RasterImage};

/// Largest size that fits inside `max_width` x `max_height` without upscaling.
///
/// Picks the largest scale `s <= 1` such that both edges fit, rounds each
/// edge and keeps it at least one pixel.
pub fn fit_dimensions(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let scale = f64::min(
        max_width as f64 / width as f64,
        max_height as f64 / height as f64,
    )
    .min(1.0);

    let target_w = ((width as f64 * scale).round() as u32).clamp(1, max_width.max(1));
    let target_h = ((height as f64 * scale).round() as u32).clamp(1, max_height.max(1));
    (target_w, target_h)
}

/// Downscale `image` to fit the bounding box. Images that already fit are
/// returned untouched.
pub fn resize(image: RasterImage, max_width: u32, max_height: u32) -> Result<RasterImage, ImageError> {
    let (src_w, src_h) = image.dimensions();
    let (target_w, target_h) = fit_dimensions(src_w, src_h, max_width, max_height);

    if (target_w, target_h) == (src_w, src_h) {
        return Ok(image);
    }

    resample(image, target_w, target_h)
}

fn resample(image: RasterImage, target_w: u32, target_h: u32) -> Result<RasterImage, ImageError> {
    let mode = image.mode();
    let (src_w, src_h) = image.dimensions();

    let src_width =
        NonZeroU32::new(src_w).ok_or_else(|| ImageError::resize_failed("Source width is 0"))?;
    let src_height =
        NonZeroU32::new(src_h).ok_or_else(|| ImageError::resize_failed("Source height is 0"))?;
    let dst_width =
        NonZeroU32::new(target_w).ok_or_else(|| ImageError::resize_failed("Target width is 0"))?;
    let dst_height =
        NonZeroU32::new(target_h).ok_or_else(|| ImageError::resize_failed("Target height is 0"))?;

    let pixel_type = match mode {
        ColorMode::Rgb => PixelType::U8x3,
        ColorMode::Rgba => PixelType::U8x4,
    };

    let mut src_image = Image::from_vec_u8(src_width, src_height, image.into_pixels(), pixel_type)
        .map_err(|e| ImageError::resize_failed(format!("Failed to create source image: {:?}", e)))?;
    let mut dst_image = Image::new(dst_width, dst_height, pixel_type);

    let alpha_mul_div = MulDiv::default();
    if mode == ColorMode::Rgba {
        alpha_mul_div
            .multiply_alpha_inplace(&mut src_image.view_mut())
            .map_err(|e| ImageError::resize_failed(format!("Premultiply failed: {:?}", e)))?;
    }

    let mut resizer = Resizer::new(ResizeAlg::Convolution(FilterType::Lanczos3));
    resizer
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| ImageError::resize_failed(format!("Resize operation failed: {:?}", e)))?;

    if mode == ColorMode::Rgba {
        alpha_mul_div
            .divide_alpha_inplace(&mut dst_image.view_mut())
            .map_err(|e| ImageError::resize_failed(format!("Unpremultiply failed: {:?}", e)))?;
    }

    RasterImage::new(target_w, target_h, mode, dst_image.into_vec())
        .map_err(|e| ImageError::resize_failed(e.to_string()))
}
