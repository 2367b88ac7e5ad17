//! Processing history
//!
//! One record per processed image, appended by the caller after the artifact
//! is stored. Records carry an expiry hint (`expiresAt`, unix seconds) for
//! stores that age entries out; nothing here deletes anything.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::image_optimizer::ProcessingParameters;

/// Default number of days a record is kept
pub const DEFAULT_RETENTION_DAYS: u32 = 90;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("History I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub original_key: String,
    pub processed_key: String,
    pub metadata: ProcessingParameters,
    /// Unix seconds after which the record may be discarded
    pub expires_at: i64,
}

impl HistoryRecord {
    /// Build a record, rejecting a blank user id or processed key.
    pub fn new(
        user_id: &str,
        original_key: Option<&str>,
        processed_key: &str,
        metadata: ProcessingParameters,
        now: DateTime<Utc>,
        retention: Duration,
    ) -> Result<Self, HistoryError> {
        if user_id.trim().is_empty() {
            return Err(HistoryError::MissingField("userId"));
        }
        if processed_key.trim().is_empty() {
            return Err(HistoryError::MissingField("processedKey"));
        }

        Ok(Self {
            user_id: user_id.to_string(),
            timestamp: now,
            original_key: original_key.unwrap_or_default().to_string(),
            processed_key: processed_key.to_string(),
            metadata,
            expires_at: (now + retention).timestamp(),
        })
    }
}

/// Retention window for `days` days.
pub fn retention_days(days: u32) -> Duration {
    Duration::days(i64::from(days))
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, record: HistoryRecord) -> Result<(), HistoryError>;
}

/// In-memory history, for tests
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    records: Mutex<Vec<HistoryRecord>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<HistoryRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, record: HistoryRecord) -> Result<(), HistoryError> {
        self.records.lock().await.push(record);
        Ok(())
    }
}

/// Appends one JSON object per line to a file
#[derive(Debug)]
pub struct JsonlHistoryStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl HistoryStore for JsonlHistoryStore {
    async fn append(&self, record: HistoryRecord) -> Result<(), HistoryError> {
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;

        tracing::debug!(
            user_id = %record.user_id,
            processed_key = %record.processed_key,
            path = %self.path.display(),
            "Appended history record"
        );
        Ok(())
    }
}
