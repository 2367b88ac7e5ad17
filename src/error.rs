// Error types module

use thiserror::Error;

use crate::image_optimizer::ImageError;
use crate::storage::StoreError;
use crate::watermark::WatermarkError;

/// Terminal failure of a single pipeline run
///
/// Every variant means the source image cannot be turned into an artifact.
/// None of them is worth retrying with the same input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessingError {
    /// Input bytes are not a decodable image
    #[error("decode error: {0}")]
    Decode(ImageError),

    /// Output format unsupported or the codec failed
    #[error("encode error: {0}")]
    Encode(ImageError),

    /// Resize or watermark rendering failed
    #[error("transform error: {0}")]
    Transform(String),
}

impl ProcessingError {
    pub fn status(&self) -> u16 {
        422
    }
}

impl From<ImageError> for ProcessingError {
    fn from(err: ImageError) -> Self {
        if err.is_decode() {
            ProcessingError::Decode(err)
        } else if err.is_encode() {
            ProcessingError::Encode(err)
        } else {
            ProcessingError::Transform(err.to_string())
        }
    }
}

impl From<WatermarkError> for ProcessingError {
    fn from(err: WatermarkError) -> Self {
        ProcessingError::Transform(err.to_string())
    }
}

/// Failure of the object-created handler
///
/// Categorizes failures for the response status code:
/// - processing failures (bad image, bad output format) → 422
/// - blob store failures → 502
/// - malformed trigger events → 400
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("processing failed: {0}")]
    Processing(#[from] ProcessingError),

    #[error("storage failed: {0}")]
    Store(#[from] StoreError),

    #[error("invalid event: {0}")]
    InvalidEvent(String),
}

impl ServiceError {
    pub fn status(&self) -> u16 {
        match self {
            ServiceError::Processing(e) => e.status(),
            ServiceError::Store(_) => 502,
            ServiceError::InvalidEvent(_) => 400,
        }
    }

    /// Short machine-readable category used in responses and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Processing(_) => "processing_failed",
            ServiceError::Store(_) => "infrastructure_failed",
            ServiceError::InvalidEvent(_) => "invalid_event",
        }
    }
}
