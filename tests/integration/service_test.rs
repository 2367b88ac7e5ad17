// Object-created handler end to end over the filesystem store

use std::sync::Arc;
use tempfile::TempDir;

use imagehub::handler::{record_history, ObjectCreatedEvent, ProcessingService};
use imagehub::history::{retention_days, HistoryRecord, JsonlHistoryStore};
use imagehub::image_optimizer::{decode, ColorMode};
use imagehub::pipeline::Pipeline;
use imagehub::storage::{BlobStore, FsBlobStore, MemoryBlobStore};
use imagehub::upload::UploadRequest;

use super::test_images;

const SOURCE: &str = "imagehub-source-images";
const PROCESSED: &str = "imagehub-processed-images";

fn service(store: Arc<dyn BlobStore>) -> ProcessingService {
    ProcessingService::new(
        store,
        Pipeline::default(),
        PROCESSED,
        Some("max-age=31536000".to_string()),
    )
}

// Test: issue a key, upload to it, handle the event, read the derivative back
#[tokio::test]
async fn test_upload_to_processed_on_filesystem() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(dir.path()));
    let service = service(store.clone());

    let ticket = UploadRequest {
        filename: Some("beach day.png".to_string()),
        content_type: Some("image/png".to_string()),
        width: Some(400),
        height: Some(400),
        format: Some("jpeg".to_string()),
        watermark: Some("Image Hub".to_string()),
        ..UploadRequest::default()
    }
    .issue(service.pipeline().codec())
    .unwrap();

    store
        .store(
            SOURCE,
            &ticket.key,
            test_images::opaque_png(1600, 900).into(),
            "image/png",
            None,
        )
        .await
        .unwrap();

    let event = serde_json::to_value(ObjectCreatedEvent::for_object(SOURCE, &ticket.key)).unwrap();
    let response = service.handle_event(&event).await;
    assert_eq!(response.status_code, 200, "{}", response.body);

    let body = response.body_json();
    assert_eq!(body["output_key"], "processed/beach_day.jpeg");
    assert_eq!(
        body["processed_url"],
        "https://imagehub-processed-images.s3.amazonaws.com/processed/beach_day.jpeg"
    );
    assert_eq!(body["metadata"]["watermark"], "Image Hub");

    let on_disk = std::fs::read(
        dir.path()
            .join(PROCESSED)
            .join("processed")
            .join("beach_day.jpeg"),
    )
    .unwrap();
    let decoded = decode(&on_disk).unwrap();
    assert_eq!(decoded.dimensions(), (400, 225));
    assert_eq!(decoded.mode(), ColorMode::Rgb);
}

#[tokio::test]
async fn test_history_is_appended_as_jsonl() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryBlobStore::new());
    let key = "uploads/1699889234_64x64_85_png_none_icon.png";
    store
        .store(SOURCE, key, test_images::opaque_png(128, 128).into(), "image/png", None)
        .await
        .unwrap();

    let service = service(store.clone());
    let report = service.process_object(SOURCE, key).await.unwrap();

    let history = JsonlHistoryStore::new(dir.path().join("history.jsonl"));
    record_history(&history, "user-42", &report, retention_days(90))
        .await
        .unwrap();
    record_history(&history, "user-42", &report, retention_days(90))
        .await
        .unwrap();

    let contents = std::fs::read_to_string(history.path()).unwrap();
    let records: Vec<HistoryRecord> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].original_key, key);
    assert_eq!(records[0].processed_key, "processed/icon.png");
    assert_eq!(records[0].metadata.width, 64);
    assert_eq!(
        records[0].expires_at - records[0].timestamp.timestamp(),
        90 * 86_400
    );
}

#[tokio::test]
async fn test_only_first_record_is_processed() {
    let store = Arc::new(MemoryBlobStore::new());
    for name in ["a", "b"] {
        let key = format!("uploads/1_32x32_85_jpeg_none_{}.png", name);
        store
            .store(SOURCE, &key, test_images::opaque_png(64, 64).into(), "image/png", None)
            .await
            .unwrap();
    }

    let mut event = ObjectCreatedEvent::for_object(SOURCE, "uploads/1_32x32_85_jpeg_none_a.png");
    event
        .records
        .extend(ObjectCreatedEvent::for_object(SOURCE, "uploads/1_32x32_85_jpeg_none_b.png").records);

    let response = service(store.clone()).handle(&event).await;
    assert!(response.is_success());
    assert!(store.object(PROCESSED, "processed/a.jpeg").await.is_some());
    assert!(store.object(PROCESSED, "processed/b.jpeg").await.is_none());
}

#[tokio::test]
async fn test_concurrent_runs_share_one_service() {
    let store = Arc::new(MemoryBlobStore::new());
    let mut keys = Vec::new();
    for i in 0..8 {
        let key = format!("uploads/{}_50x50_70_webp_none_img{}.png", i, i);
        store
            .store(SOURCE, &key, test_images::opaque_png(200, 100).into(), "image/png", None)
            .await
            .unwrap();
        keys.push(key);
    }

    let service = Arc::new(service(store.clone()));
    let mut handles = Vec::new();
    for key in keys {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service.process_object(SOURCE, &key).await
        }));
    }

    for handle in handles {
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.output_size, (50, 25));
    }
    // 8 sources + 8 derivatives
    assert_eq!(store.len().await, 16);
}

async fn assert_reprocessing_is_stable(store: Arc<dyn BlobStore>) {
    let key = "uploads/1699889234_120x120_80_jpeg_Hi_repeat.png";
    store
        .store(SOURCE, key, test_images::opaque_png(300, 200).into(), "image/png", None)
        .await
        .unwrap();
    let service = service(store.clone());

    let first = service.process_object(SOURCE, key).await.unwrap();
    let first_bytes = store.fetch(PROCESSED, &first.output_key).await.unwrap();

    let second = service.process_object(SOURCE, key).await.unwrap();
    let second_bytes = store.fetch(PROCESSED, &second.output_key).await.unwrap();

    assert_eq!(first.output_key, "processed/repeat.jpeg");
    assert_eq!(second.output_key, first.output_key);
    assert_eq!(second_bytes, first_bytes);
}

// Test: handling the same upload twice overwrites with identical bytes
#[tokio::test]
async fn test_reprocessing_same_key_on_filesystem() {
    let dir = TempDir::new().unwrap();
    assert_reprocessing_is_stable(Arc::new(FsBlobStore::new(dir.path()))).await;
}

#[tokio::test]
async fn test_reprocessing_same_key_in_memory() {
    assert_reprocessing_is_stable(Arc::new(MemoryBlobStore::new())).await;
}
