//! Object-created handler
//!
//! [`ProcessingService`] owns the collaborators a run needs (blob store,
//! pipeline, output settings). For each uploaded object it fetches the source
//! bytes, runs the pipeline off the async runtime, stores the artifact in the
//! processed bucket and reports the outcome.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{ProcessingError, ServiceError};
use crate::history::{HistoryError, HistoryRecord, HistoryStore};
use crate::image_optimizer::ProcessingParameters;
use crate::pipeline::Pipeline;
use crate::storage::BlobStore;

/// Object-created notification, `{"Records":[{"s3":{...}}]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectCreatedEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<EventRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Entity {
    pub bucket: BucketEntity,
    pub object: ObjectEntity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketEntity {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntity {
    pub key: String,
}

impl ObjectCreatedEvent {
    /// Build a single-record event, URL-encoding the key the way S3 does.
    pub fn for_object(bucket: &str, key: &str) -> Self {
        let encoded = urlencoding::encode(key).replace("%20", "+").replace("%2F", "/");
        Self {
            records: vec![EventRecord {
                s3: S3Entity {
                    bucket: BucketEntity {
                        name: bucket.to_string(),
                    },
                    object: ObjectEntity { key: encoded },
                },
            }],
        }
    }

    /// Bucket and decoded key of the first record. Further records are ignored.
    pub fn first_object(&self) -> Result<(String, String), ServiceError> {
        let record = self
            .records
            .first()
            .ok_or_else(|| ServiceError::InvalidEvent("event has no records".to_string()))?;

        if record.s3.bucket.name.is_empty() {
            return Err(ServiceError::InvalidEvent("bucket name is empty".to_string()));
        }

        let key = decode_object_key(&record.s3.object.key)?;
        if key.is_empty() {
            return Err(ServiceError::InvalidEvent("object key is empty".to_string()));
        }

        Ok((record.s3.bucket.name.clone(), key))
    }
}

/// Undo the form encoding S3 applies to keys in notifications.
pub fn decode_object_key(raw: &str) -> Result<String, ServiceError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|key| key.into_owned())
        .map_err(|e| ServiceError::InvalidEvent(format!("object key is not valid UTF-8: {}", e)))
}

/// Outcome of one successful run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingReport {
    pub run_id: String,
    pub source_bucket: String,
    pub source_key: String,
    pub processed_bucket: String,
    pub output_key: String,
    pub processed_url: String,
    pub content_type: String,
    pub metadata: ProcessingParameters,
    pub key_degraded: bool,
    pub original_size: (u32, u32),
    pub output_size: (u32, u32),
    pub bytes: usize,
}

/// `{statusCode, body}` where body is a JSON document rendered as a string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerResponse {
    pub status_code: u16,
    pub body: String,
}

impl HandlerResponse {
    pub fn success(report: &ProcessingReport) -> Self {
        Self {
            status_code: 200,
            body: json!({
                "message": "Image processed successfully",
                "processed_url": report.processed_url,
                "output_key": report.output_key,
                "metadata": report.metadata,
            })
            .to_string(),
        }
    }

    pub fn failure(err: &ServiceError) -> Self {
        Self {
            status_code: err.status(),
            body: json!({
                "message": "Error processing image",
                "error": err.to_string(),
                "status": err.kind(),
            })
            .to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }

    /// Parsed body; `Value::Null` if it is not JSON.
    pub fn body_json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

pub struct ProcessingService {
    store: Arc<dyn BlobStore>,
    pipeline: Pipeline,
    processed_bucket: String,
    cache_control: Option<String>,
}

impl ProcessingService {
    pub fn new(
        store: Arc<dyn BlobStore>,
        pipeline: Pipeline,
        processed_bucket: impl Into<String>,
        cache_control: Option<String>,
    ) -> Self {
        Self {
            store,
            pipeline,
            processed_bucket: processed_bucket.into(),
            cache_control,
        }
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn processed_bucket(&self) -> &str {
        &self.processed_bucket
    }

    /// Public URL of a processed object.
    pub fn processed_url(&self, output_key: &str) -> String {
        format!(
            "https://{}.s3.amazonaws.com/{}",
            self.processed_bucket, output_key
        )
    }

    /// Fetch, process and store one uploaded object.
    pub async fn process_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<ProcessingReport, ServiceError> {
        let run_id = Uuid::new_v4().to_string();
        let started = Instant::now();
        info!(
            run_id = %run_id,
            bucket = %bucket,
            key = %key,
            backend = self.store.backend_name(),
            "Processing image"
        );

        let source = self.store.fetch(bucket, key).await?;

        let pipeline = self.pipeline.clone();
        let source_key = key.to_string();
        let artifact = tokio::task::spawn_blocking(move || pipeline.run(&source_key, &source))
            .await
            .map_err(|e| ProcessingError::Transform(format!("pipeline task failed: {}", e)))??;

        if artifact.key_degraded {
            warn!(run_id = %run_id, key = %key, "Processed with default parameters");
        }

        let size = artifact.bytes.len();
        self.store
            .store(
                &self.processed_bucket,
                &artifact.output_key,
                Bytes::from(artifact.bytes),
                artifact.content_type,
                self.cache_control.as_deref(),
            )
            .await?;

        let report = ProcessingReport {
            processed_url: self.processed_url(&artifact.output_key),
            run_id,
            source_bucket: bucket.to_string(),
            source_key: key.to_string(),
            processed_bucket: self.processed_bucket.clone(),
            output_key: artifact.output_key,
            content_type: artifact.content_type.to_string(),
            metadata: artifact.params,
            key_degraded: artifact.key_degraded,
            original_size: artifact.original_size,
            output_size: artifact.output_size,
            bytes: size,
        };

        info!(
            run_id = %report.run_id,
            output_key = %report.output_key,
            width = report.output_size.0,
            height = report.output_size.1,
            bytes = report.bytes,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Image processed"
        );
        Ok(report)
    }

    /// Handle a parsed object-created event.
    pub async fn handle(&self, event: &ObjectCreatedEvent) -> HandlerResponse {
        let result = match event.first_object() {
            Ok((bucket, key)) => self.process_object(&bucket, &key).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(report) => HandlerResponse::success(&report),
            Err(err) => {
                error!(error = %err, kind = err.kind(), "Error processing image");
                HandlerResponse::failure(&err)
            }
        }
    }

    /// Handle a raw JSON event.
    pub async fn handle_event(&self, event: &serde_json::Value) -> HandlerResponse {
        match ObjectCreatedEvent::deserialize(event) {
            Ok(parsed) => self.handle(&parsed).await,
            Err(e) => {
                let err = ServiceError::InvalidEvent(e.to_string());
                error!(error = %err, kind = err.kind(), "Rejected event");
                HandlerResponse::failure(&err)
            }
        }
    }
}

/// Append a history record for a finished run.
pub async fn record_history(
    history: &dyn HistoryStore,
    user_id: &str,
    report: &ProcessingReport,
    retention: chrono::Duration,
) -> Result<HistoryRecord, HistoryError> {
    let record = HistoryRecord::new(
        user_id,
        Some(&report.source_key),
        &report.output_key,
        report.metadata.clone(),
        chrono::Utc::now(),
        retention,
    )?;
    history.append(record.clone()).await?;
    Ok(record)
}
