// Image pipeline module - turns an uploaded object into its processed derivative
//
// decode key → decode image → flatten (if needed) → resize → watermark →
// encode → derive output key
//
// A run is pure: bytes in, artifact out. Fetching and storing are the
// caller's job.

use tracing::debug;

use crate::error::ProcessingError;
use crate::image_optimizer::{
    self, EncoderFactory, EncoderQuality, ImageError, OutputFormat, ProcessingParameters,
    RasterImage,
};
use crate::keys::{derive_output_key, KeyCodec, KeyDecode};
use crate::watermark::apply_text_watermark;

/// Result of a successful pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedArtifact {
    /// The encoded image
    pub bytes: Vec<u8>,
    /// Content-Type of `bytes`
    pub content_type: &'static str,
    /// Key the artifact should be stored under
    pub output_key: String,
    /// Parameters the image was processed with
    pub params: ProcessingParameters,
    /// Whether `params` are defaults substituted for a malformed key
    pub key_degraded: bool,
    /// Decoded source dimensions (width, height)
    pub original_size: (u32, u32),
    /// Output dimensions (width, height)
    pub output_size: (u32, u32),
}

/// Stateless image pipeline
#[derive(Debug, Clone)]
pub struct Pipeline {
    codec: KeyCodec,
    png_effort: u8,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(KeyCodec::default())
    }
}

impl Pipeline {
    pub fn new(codec: KeyCodec) -> Self {
        Self {
            codec,
            png_effort: EncoderQuality::default().effort,
        }
    }

    /// Set the oxipng preset used for PNG output (0-6)
    pub fn with_png_effort(mut self, effort: u8) -> Self {
        self.png_effort = effort.min(6);
        self
    }

    pub fn codec(&self) -> &KeyCodec {
        &self.codec
    }

    /// Process `source_bytes` according to the parameters in `source_key`.
    pub fn run(
        &self,
        source_key: &str,
        source_bytes: &[u8],
    ) -> Result<ProcessedArtifact, ProcessingError> {
        let decoded_key = self.codec.decode(source_key);

        let image = image_optimizer::decode(source_bytes).map_err(ProcessingError::Decode)?;
        let original_size = image.dimensions();
        debug!(
            width = original_size.0,
            height = original_size.1,
            alpha = image.has_alpha(),
            "Decoded source image"
        );

        let (params, key_degraded) = match decoded_key {
            KeyDecode::Parsed(params) => (params, false),
            KeyDecode::Defaulted { params, .. } => (params, true),
            KeyDecode::UnsupportedFormat { token } => {
                return Err(ProcessingError::Encode(ImageError::unsupported_format(
                    token,
                )))
            }
        };

        let image = prepare_for_format(image, params.format);
        let image = image_optimizer::resize(image, params.width, params.height)?;
        debug!(
            width = image.width(),
            height = image.height(),
            "Resized image"
        );

        let image = apply_text_watermark(image, params.watermark_text())?;
        let image = prepare_for_format(image, params.format);
        let output_size = image.dimensions();

        let quality = EncoderQuality::with_quality(params.quality).with_effort(self.png_effort);
        let encoded = EncoderFactory::create(params.format)
            .encode(&image, quality)
            .map_err(ProcessingError::Encode)?;
        debug!(
            format = %params.format,
            bytes = encoded.data.len(),
            "Encoded image"
        );

        Ok(ProcessedArtifact {
            bytes: encoded.data,
            content_type: encoded.content_type,
            output_key: derive_output_key(source_key, params.format),
            params,
            key_degraded,
            original_size,
            output_size,
        })
    }
}

/// Drop the alpha channel if `format` cannot carry it. Idempotent.
pub fn prepare_for_format(image: RasterImage, format: OutputFormat) -> RasterImage {
    if image.has_alpha() && !format.supports_transparency() {
        image.flatten()
    } else {
        image
    }
}
