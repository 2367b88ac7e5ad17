//! Image processing error types
//!
//! Decoding, resampling and encoding failures share one enum so the pipeline
//! can classify them without caring which codec raised them.

use std::fmt;

/// Errors that can occur while decoding, transforming or encoding an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    // === Decoding Errors ===
    /// Input bytes are not a recognizable raster format
    UnrecognizedInput { message: String },
    /// Input was recognized but is truncated or corrupt
    DecodeFailed { message: String },

    // === Processing Errors ===
    /// Resize operation failed
    ResizeFailed { message: String },

    // === Encoding Errors ===
    /// Requested output format has no encoder
    UnsupportedFormat { format: String },
    /// Encoding to output format failed
    EncodeFailed { format: String, message: String },

    // === Parameter Errors ===
    /// Invalid transformation parameter
    InvalidParameter { param: String, message: String },
    /// Quality value out of range
    InvalidQuality { quality: u8 },
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::UnrecognizedInput { message } => {
                write!(f, "Unrecognized image data: {}", message)
            }
            ImageError::DecodeFailed { message } => {
                write!(f, "Failed to decode image: {}", message)
            }
            ImageError::ResizeFailed { message } => {
                write!(f, "Resize failed: {}", message)
            }
            ImageError::UnsupportedFormat { format } => {
                write!(f, "Unsupported output format: {}", format)
            }
            ImageError::EncodeFailed { format, message } => {
                write!(f, "Failed to encode to {}: {}", format, message)
            }
            ImageError::InvalidParameter { param, message } => {
                write!(f, "Invalid parameter '{}': {}", param, message)
            }
            ImageError::InvalidQuality { quality } => {
                write!(f, "Invalid quality {}: must be 1-100", quality)
            }
        }
    }
}

impl std::error::Error for ImageError {}

impl ImageError {
    /// Maps image errors to HTTP status codes
    ///
    /// Anything that went wrong with the image itself is unprocessable (422).
    /// Bad parameters are the caller's fault (400).
    pub fn to_http_status(&self) -> u16 {
        match self {
            ImageError::UnrecognizedInput { .. }
            | ImageError::DecodeFailed { .. }
            | ImageError::ResizeFailed { .. }
            | ImageError::UnsupportedFormat { .. }
            | ImageError::EncodeFailed { .. } => 422,

            ImageError::InvalidParameter { .. } | ImageError::InvalidQuality { .. } => 400,
        }
    }

    /// True for failures raised while reading the input bytes.
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            ImageError::UnrecognizedInput { .. } | ImageError::DecodeFailed { .. }
        )
    }

    /// True for failures raised while producing the output bytes.
    pub fn is_encode(&self) -> bool {
        matches!(
            self,
            ImageError::UnsupportedFormat { .. } | ImageError::EncodeFailed { .. }
        )
    }

    pub fn unrecognized_input(message: impl Into<String>) -> Self {
        ImageError::UnrecognizedInput {
            message: message.into(),
        }
    }

    pub fn decode_failed(message: impl Into<String>) -> Self {
        ImageError::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn resize_failed(message: impl Into<String>) -> Self {
        ImageError::ResizeFailed {
            message: message.into(),
        }
    }

    pub fn unsupported_format(format: impl Into<String>) -> Self {
        ImageError::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn encode_failed(format: impl Into<String>, message: impl Into<String>) -> Self {
        ImageError::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn invalid_param(param: impl Into<String>, message: impl Into<String>) -> Self {
        ImageError::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }
}
