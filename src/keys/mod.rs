//! Upload key codec
//!
//! Processing parameters travel inside the object key of the uploaded image:
//!
//! ```text
//! uploads/{timestamp}_{width}x{height}_{quality}_{format}_{watermark}_{filename}
//! ```
//!
//! The watermark field is `none` when no watermark was requested, otherwise the
//! percent-encoded text. Encoding guarantees the field never contains `_` or
//! `/`, so the key splits back into the same fields.
//!
//! Decoding is all-or-nothing: a key that does not carry a complete, in-range
//! parameter tuple falls back to the configured defaults. That fallback is a
//! [`KeyDecode::Defaulted`] outcome, not an error.
//!
//! "In range" is stricter than "parses": a width or height outside `1..=4000`
//! or a quality outside `1..=100` also defaults the whole tuple, so a decoded
//! key always satisfies the [`ProcessingParameters`] invariants.

use chrono::Utc;
use std::fmt;
use tracing::{debug, warn};

use crate::image_optimizer::{OutputFormat, ProcessingParameters, MAX_DIMENSION};

/// Namespace of keys issued for uploads
pub const UPLOAD_PREFIX: &str = "uploads/";

/// Namespace of derived images
pub const PROCESSED_PREFIX: &str = "processed/";

/// Watermark token meaning "no watermark"
pub const NO_WATERMARK: &str = "none";

/// Minimum number of `_` separated fields in a parameterized key name
const PARAM_FIELDS: usize = 5;

/// Why a key fell back to default parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyParseDegraded {
    /// Fewer than five `_` separated fields in the key name
    TooFewFields { found: usize },
    /// Dimension field is not `{width}x{height}`
    InvalidDimensions { field: String },
    /// Quality field is not an integer
    InvalidQuality { field: String },
    /// A numeric field parsed but is outside the accepted range
    OutOfRange { field: &'static str, value: u32 },
    /// Watermark field is not valid percent-encoded UTF-8
    InvalidWatermark { field: String },
}

impl fmt::Display for KeyParseDegraded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewFields { found } => write!(
                f,
                "expected at least {} '_' separated fields, found {}",
                PARAM_FIELDS, found
            ),
            Self::InvalidDimensions { field } => {
                write!(f, "invalid dimensions field '{}'", field)
            }
            Self::InvalidQuality { field } => write!(f, "invalid quality field '{}'", field),
            Self::OutOfRange { field, value } => {
                write!(f, "{} {} is out of range", field, value)
            }
            Self::InvalidWatermark { field } => {
                write!(f, "invalid watermark encoding '{}'", field)
            }
        }
    }
}

/// Outcome of decoding a storage key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyDecode {
    /// Every field parsed
    Parsed(ProcessingParameters),
    /// The key was malformed; defaults apply in their entirety
    Defaulted {
        params: ProcessingParameters,
        reason: KeyParseDegraded,
    },
    /// Numeric fields parsed but the format token names no encoder
    UnsupportedFormat { token: String },
}

impl KeyDecode {
    /// Parameters to process with, if the key names a supported format.
    pub fn parameters(&self) -> Option<&ProcessingParameters> {
        match self {
            KeyDecode::Parsed(params) | KeyDecode::Defaulted { params, .. } => Some(params),
            KeyDecode::UnsupportedFormat { .. } => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, KeyDecode::Defaulted { .. })
    }
}

/// Encodes parameter tuples into upload keys and decodes them back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCodec {
    defaults: ProcessingParameters,
}

impl Default for KeyCodec {
    fn default() -> Self {
        Self::new(ProcessingParameters::default())
    }
}

impl KeyCodec {
    /// Create a codec that falls back to `defaults` for malformed keys.
    ///
    /// The default watermark is always absent.
    pub fn new(defaults: ProcessingParameters) -> Self {
        Self {
            defaults: ProcessingParameters {
                watermark: None,
                ..defaults
            },
        }
    }

    pub fn defaults(&self) -> &ProcessingParameters {
        &self.defaults
    }

    /// Build an upload key stamped with the current time.
    pub fn encode(&self, filename: &str, params: &ProcessingParameters) -> String {
        self.encode_at(filename, params, Utc::now().timestamp())
    }

    /// Build an upload key with an explicit unix timestamp.
    pub fn encode_at(&self, filename: &str, params: &ProcessingParameters, timestamp: i64) -> String {
        format!(
            "{}{}_{}x{}_{}_{}_{}_{}",
            UPLOAD_PREFIX,
            timestamp,
            params.width,
            params.height,
            params.quality,
            params.format.as_str(),
            encode_watermark_token(params.watermark.as_deref()),
            sanitize_filename(filename)
        )
    }

    /// Recover processing parameters from a key.
    pub fn decode(&self, key: &str) -> KeyDecode {
        let outcome = self.decode_fields(key_name(key));
        match &outcome {
            KeyDecode::Parsed(params) => {
                debug!(key = %key, width = params.width, height = params.height,
                    quality = params.quality, format = %params.format, "Decoded upload key");
            }
            KeyDecode::Defaulted { reason, .. } => {
                warn!(key = %key, reason = %reason, "Malformed upload key, using default parameters");
            }
            KeyDecode::UnsupportedFormat { token } => {
                warn!(key = %key, format = %token, "Upload key names an unsupported output format");
            }
        }
        outcome
    }

    fn decode_fields(&self, name: &str) -> KeyDecode {
        let fields: Vec<&str> = name.split('_').collect();
        if fields.len() < PARAM_FIELDS {
            return self.degraded(KeyParseDegraded::TooFewFields {
                found: fields.len(),
            });
        }

        let (width, height) = match parse_dimensions(fields[1]) {
            Some(dims) => dims,
            None => {
                return self.degraded(KeyParseDegraded::InvalidDimensions {
                    field: fields[1].to_string(),
                })
            }
        };
        let quality = match fields[2].parse::<u32>() {
            Ok(quality) => quality,
            Err(_) => {
                return self.degraded(KeyParseDegraded::InvalidQuality {
                    field: fields[2].to_string(),
                })
            }
        };

        for (field, value, max) in [
            ("width", width, MAX_DIMENSION),
            ("height", height, MAX_DIMENSION),
            ("quality", quality, 100),
        ] {
            if !(1..=max).contains(&value) {
                return self.degraded(KeyParseDegraded::OutOfRange { field, value });
            }
        }

        let watermark = match decode_watermark_token(fields[4]) {
            Some(watermark) => watermark,
            None => {
                return self.degraded(KeyParseDegraded::InvalidWatermark {
                    field: fields[4].to_string(),
                })
            }
        };

        let format = match fields[3].parse::<OutputFormat>() {
            Ok(format) => format,
            Err(_) => {
                return KeyDecode::UnsupportedFormat {
                    token: fields[3].to_string(),
                }
            }
        };

        KeyDecode::Parsed(ProcessingParameters {
            width,
            height,
            quality: quality as u8,
            format,
            watermark,
        })
    }

    fn degraded(&self, reason: KeyParseDegraded) -> KeyDecode {
        KeyDecode::Defaulted {
            params: self.defaults.clone(),
            reason,
        }
    }
}

/// Key for the processed derivative of `source_key`.
///
/// Drops the five parameter fields (when the name has at least six fields),
/// strips the last extension and re-homes the result under `processed/`.
pub fn derive_output_key(source_key: &str, format: OutputFormat) -> String {
    let name = key_name(source_key);
    let fields: Vec<&str> = name.split('_').collect();
    let original = if fields.len() > PARAM_FIELDS {
        fields[PARAM_FIELDS..].join("_")
    } else {
        name.to_string()
    };

    let stem = match original.rsplit_once('.') {
        Some((stem, _ext)) => stem,
        None => original.as_str(),
    };

    format!("{}{}.{}", PROCESSED_PREFIX, stem, format.extension())
}

/// Replace spaces with underscores. Nothing else is touched.
pub fn sanitize_filename(filename: &str) -> String {
    filename.replace(' ', "_")
}

/// Last `/` separated segment of a key.
fn key_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

fn parse_dimensions(field: &str) -> Option<(u32, u32)> {
    let (width, height) = field.split_once('x')?;
    Some((width.parse().ok()?, height.parse().ok()?))
}

fn encode_watermark_token(watermark: Option<&str>) -> String {
    match watermark {
        None => NO_WATERMARK.to_string(),
        // keep literal text "none" distinct from the absent marker
        Some(NO_WATERMARK) => "%6Eone".to_string(),
        Some(text) => urlencoding::encode(text).replace('_', "%5F"),
    }
}

/// `Some(None)` for the absent marker, `Some(Some(text))` for text, `None` when
/// the token does not decode to UTF-8.
fn decode_watermark_token(token: &str) -> Option<Option<String>> {
    if token == NO_WATERMARK {
        return Some(None);
    }
    let spaced = token.replace('+', " ");
    urlencoding::decode(&spaced)
        .ok()
        .map(|text| Some(text.into_owned()))
}
