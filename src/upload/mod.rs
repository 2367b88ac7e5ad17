//! Upload request validation and key issuance
//!
//! Checks an upload request, fills in default parameters, and issues the
//! storage key the client uploads to. Every problem with a request is
//! reported at once.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::image_optimizer::{OutputFormat, ProcessingParameters, MAX_DIMENSION};
use crate::keys::KeyCodec;

/// Content types accepted for upload
pub const ALLOWED_CONTENT_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// Output formats a client may request
pub const ALLOWED_FORMATS: [&str; 3] = ["jpeg", "png", "webp"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub width: Option<i64>,
    #[serde(default)]
    pub height: Option<i64>,
    #[serde(default)]
    pub quality: Option<i64>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub watermark: Option<String>,
}

/// Everything wrong with an upload request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<String>);

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// A validated request with its issued storage key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTicket {
    pub key: String,
    pub content_type: String,
    pub params: ProcessingParameters,
}

impl UploadRequest {
    /// Validate the request and resolve defaults.
    pub fn validate(&self, defaults: &ProcessingParameters) -> Result<ProcessingParameters, ValidationErrors> {
        let mut errors = Vec::new();

        if self.filename.as_deref().map_or(true, |f| f.trim().is_empty()) {
            errors.push("filename is required".to_string());
        }

        // A missing content type also fails the allow-list check
        let content_type = self.content_type.as_deref().unwrap_or_default();
        if content_type.is_empty() {
            errors.push("contentType is required".to_string());
        }
        if !ALLOWED_CONTENT_TYPES.contains(&content_type) {
            errors.push(format!(
                "contentType must be one of: {}",
                ALLOWED_CONTENT_TYPES.join(", ")
            ));
        }

        let width = check_range(&mut errors, "width", self.width, defaults.width, MAX_DIMENSION);
        let height = check_range(&mut errors, "height", self.height, defaults.height, MAX_DIMENSION);
        let quality = check_range(&mut errors, "quality", self.quality, defaults.quality as u32, 100);

        let format = match self.format.as_deref() {
            None => Some(defaults.format),
            Some(token) if ALLOWED_FORMATS.contains(&token) => token.parse::<OutputFormat>().ok(),
            Some(_) => None,
        };
        if format.is_none() {
            errors.push(format!("format must be one of: {}", ALLOWED_FORMATS.join(", ")));
        }

        if !errors.is_empty() {
            return Err(ValidationErrors(errors));
        }

        Ok(ProcessingParameters {
            width,
            height,
            quality: quality as u8,
            format: format.unwrap_or(defaults.format),
            watermark: self.watermark.clone().filter(|text| !text.is_empty()),
        })
    }

    /// Validate and issue a storage key stamped with the current time.
    pub fn issue(&self, codec: &KeyCodec) -> Result<UploadTicket, ValidationErrors> {
        self.issue_at(codec, chrono::Utc::now().timestamp())
    }

    /// Validate and issue a storage key with an explicit timestamp.
    pub fn issue_at(&self, codec: &KeyCodec, timestamp: i64) -> Result<UploadTicket, ValidationErrors> {
        let params = self.validate(codec.defaults())?;
        let filename = self.filename.as_deref().unwrap_or_default();

        Ok(UploadTicket {
            key: codec.encode_at(filename, &params, timestamp),
            content_type: self.content_type.clone().unwrap_or_default(),
            params,
        })
    }
}

fn check_range(errors: &mut Vec<String>, name: &str, value: Option<i64>, default: u32, max: u32) -> u32 {
    let value = value.unwrap_or(i64::from(default));
    if (1..=i64::from(max)).contains(&value) {
        value as u32
    } else {
        errors.push(format!("{} must be between 1 and {}", name, max));
        default
    }
}
