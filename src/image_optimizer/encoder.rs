//! Image encoder abstraction
//!
//! One encoder per [`OutputFormat`], created through [`EncoderFactory`]:
//! - JPEG via mozjpeg with optimized Huffman coding, alpha flattened onto white
//! - PNG via the image crate at best compression, then losslessly re-packed
//!   with oxipng
//! - WebP via libwebp (lossy, quality-driven)

use image::ImageEncoder as _;
use std::io::Cursor;
use std::panic::AssertUnwindSafe;
use tracing::{debug, warn};

use super::error::ImageError;
use super::params::OutputFormat;
use super::raster::{ColorMode, RasterImage};

/// Quality settings for image encoding
#[derive(Debug, Clone, Copy)]
pub struct EncoderQuality {
    /// Quality value (1-100, where 100 is best quality). Ignored by PNG.
    pub quality: u8,
    /// oxipng optimization preset (0-6, where 6 is slowest/best compression)
    pub effort: u8,
}

impl Default for EncoderQuality {
    fn default() -> Self {
        Self {
            quality: 85,
            effort: 2,
        }
    }
}

impl EncoderQuality {
    /// Create quality settings with specified quality level
    pub fn with_quality(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            ..Self::default()
        }
    }

    /// Set the PNG optimization effort
    pub fn with_effort(mut self, effort: u8) -> Self {
        self.effort = effort.min(6);
        self
    }
}

/// Result of encoding an image
#[derive(Debug)]
pub struct EncodedImage {
    /// The encoded image data
    pub data: Vec<u8>,
    /// The output format
    pub format: OutputFormat,
    /// Content-Type header value
    pub content_type: &'static str,
}

impl EncodedImage {
    pub fn new(data: Vec<u8>, format: OutputFormat) -> Self {
        let content_type = format.content_type();
        Self {
            data,
            format,
            content_type,
        }
    }
}

/// Trait for image encoders
///
/// Object-safe so the pipeline can hold a `Box<dyn ImageEncoder>`.
pub trait ImageEncoder: Send + Sync {
    /// The output format this encoder produces
    fn format(&self) -> OutputFormat;

    /// Encode a raster image to the target format
    fn encode(
        &self,
        image: &RasterImage,
        quality: EncoderQuality,
    ) -> Result<EncodedImage, ImageError>;

    /// Check if this encoder keeps the alpha channel
    fn supports_transparency(&self) -> bool {
        self.format().supports_transparency()
    }
}

/// JPEG encoder using mozjpeg
pub struct JpegEncoder;

impl JpegEncoder {
    fn compress(image: &RasterImage, quality: u8) -> std::io::Result<Vec<u8>> {
        let mut compress = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        compress.set_size(image.width() as usize, image.height() as usize);
        compress.set_quality(quality as f32);
        compress.set_optimize_coding(true);

        let mut started = compress.start_compress(Vec::new())?;
        started.write_scanlines(image.pixels())?;
        started.finish()
    }
}

impl ImageEncoder for JpegEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Jpeg
    }

    fn encode(
        &self,
        image: &RasterImage,
        quality: EncoderQuality,
    ) -> Result<EncodedImage, ImageError> {
        // JPEG has no alpha channel
        let flattened;
        let rgb = if image.has_alpha() {
            flattened = image.clone().flatten();
            &flattened
        } else {
            image
        };

        // libjpeg errors unwind out of mozjpeg
        let data = std::panic::catch_unwind(AssertUnwindSafe(|| {
            Self::compress(rgb, quality.quality)
        }))
        .map_err(|_| ImageError::encode_failed("jpeg", "mozjpeg aborted compression"))?
        .map_err(|e| ImageError::encode_failed("jpeg", e.to_string()))?;

        Ok(EncodedImage::new(data, OutputFormat::Jpeg))
    }
}

/// PNG encoder: image crate at best compression, then oxipng
pub struct PngEncoder;

impl ImageEncoder for PngEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Png
    }

    fn encode(
        &self,
        image: &RasterImage,
        quality: EncoderQuality,
    ) -> Result<EncodedImage, ImageError> {
        use image::codecs::png::{CompressionType, FilterType, PngEncoder as ImagePngEncoder};

        let color_type = match image.mode() {
            ColorMode::Rgb => image::ColorType::Rgb8,
            ColorMode::Rgba => image::ColorType::Rgba8,
        };

        let mut output = Cursor::new(Vec::new());
        let encoder = ImagePngEncoder::new_with_quality(
            &mut output,
            CompressionType::Best,
            FilterType::Adaptive,
        );

        encoder
            .write_image(image.pixels(), image.width(), image.height(), color_type)
            .map_err(|e| ImageError::encode_failed("png", e.to_string()))?;

        let png = output.into_inner();
        let options = oxipng::Options::from_preset(quality.effort);
        let data = match oxipng::optimize_from_memory(&png, &options) {
            Ok(optimized) if optimized.len() < png.len() => {
                debug!(
                    before = png.len(),
                    after = optimized.len(),
                    "oxipng reduced PNG size"
                );
                optimized
            }
            Ok(_) => png,
            Err(e) => {
                warn!(error = %e, "oxipng optimization failed, keeping unoptimized PNG");
                png
            }
        };

        Ok(EncodedImage::new(data, OutputFormat::Png))
    }
}

/// Lossy WebP encoder using libwebp
#[derive(Default)]
pub struct WebPEncoder;

impl ImageEncoder for WebPEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::WebP
    }

    fn encode(
        &self,
        image: &RasterImage,
        quality: EncoderQuality,
    ) -> Result<EncodedImage, ImageError> {
        let encoder = match image.mode() {
            ColorMode::Rgb => webp::Encoder::from_rgb(image.pixels(), image.width(), image.height()),
            ColorMode::Rgba => {
                webp::Encoder::from_rgba(image.pixels(), image.width(), image.height())
            }
        };

        let encoded = encoder.encode(quality.quality as f32);
        if encoded.is_empty() {
            return Err(ImageError::encode_failed("webp", "encoder produced no data"));
        }

        Ok(EncodedImage::new(encoded.to_vec(), OutputFormat::WebP))
    }
}

/// Factory for creating encoders based on output format
pub struct EncoderFactory;

impl EncoderFactory {
    /// Create an encoder for the specified output format
    pub fn create(format: OutputFormat) -> Box<dyn ImageEncoder> {
        match format {
            OutputFormat::Jpeg => Box::new(JpegEncoder),
            OutputFormat::Png => Box::new(PngEncoder),
            OutputFormat::WebP => Box::new(WebPEncoder),
        }
    }

    /// Resolve a raw format token (as found in a storage key) to an encoder.
    pub fn for_token(token: &str) -> Result<Box<dyn ImageEncoder>, ImageError> {
        token.parse::<OutputFormat>().map(Self::create)
    }
}

/// Encode `image` as `format` with the given lossy quality.
pub fn encode(
    image: &RasterImage,
    format: OutputFormat,
    quality: u8,
) -> Result<EncodedImage, ImageError> {
    EncoderFactory::create(format).encode(image, EncoderQuality::with_quality(quality))
}
