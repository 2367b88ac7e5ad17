//! Image codec and resampling primitives
//!
//! Provides the building blocks the pipeline chains together:
//! - Decoding of JPEG, PNG, WebP and GIF into an 8-bit [`RasterImage`]
//! - Aspect-preserving Lanczos3 downscale
//! - Alpha flattening onto white
//! - Format-specific encoders (JPEG, PNG, WebP)

pub mod encoder;
pub mod error;
pub mod params;
pub mod raster;
pub mod resize;

pub use encoder::{encode, EncodedImage, EncoderFactory, EncoderQuality, ImageEncoder};
pub use error::ImageError;
pub use params::{OutputFormat, ProcessingParameters, MAX_DIMENSION};
pub use raster::{decode, ColorMode, RasterImage};
pub use resize::{fit_dimensions, resize};
