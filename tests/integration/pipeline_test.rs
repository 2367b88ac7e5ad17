// Pipeline runs on real encoded inputs

use imagehub::error::ProcessingError;
use imagehub::image_optimizer::{decode, ColorMode, OutputFormat};
use imagehub::keys::KeyCodec;
use imagehub::pipeline::Pipeline;

use super::test_images;

// Test: a 2000x1000 PNG with default parameters becomes an 800x400 JPEG
#[test]
fn test_large_png_to_default_jpeg() {
    let source = test_images::opaque_png(2000, 1000);
    let artifact = Pipeline::default()
        .run("uploads/1699889234_800x600_85_jpeg_none_wide.png", &source)
        .unwrap();

    assert_eq!(artifact.content_type, "image/jpeg");
    assert_eq!(artifact.output_key, "processed/wide.jpeg");
    assert_eq!(artifact.original_size, (2000, 1000));
    assert_eq!(artifact.output_size, (800, 400));

    let decoded = decode(&artifact.bytes).unwrap();
    assert_eq!(decoded.dimensions(), (800, 400));
    assert_eq!(decoded.mode(), ColorMode::Rgb);
}

#[test]
fn test_output_key_for_documented_upload() {
    let artifact = Pipeline::default()
        .run(
            "uploads/1699889234_800x600_85_jpeg_none_test.jpg",
            &test_images::jpeg(64, 64),
        )
        .unwrap();
    assert_eq!(artifact.output_key, "processed/test.jpeg");
    assert_eq!(artifact.output_size, (64, 64));
}

#[test]
fn test_small_images_are_not_upscaled() {
    let artifact = Pipeline::default()
        .run(
            "uploads/1_4000x4000_85_png_none_tiny.png",
            &test_images::opaque_png(30, 20),
        )
        .unwrap();
    assert_eq!(artifact.output_size, (30, 20));
}

#[test]
fn test_transparent_png_to_jpeg_is_flattened_white() {
    let artifact = Pipeline::default()
        .run(
            "uploads/1_100x100_95_jpeg_none_logo.png",
            &test_images::transparent_png(100, 100),
        )
        .unwrap();

    let decoded = decode(&artifact.bytes).unwrap();
    assert_eq!(decoded.mode(), ColorMode::Rgb);

    // top-left pixel was transparent, so it reads as (near) white
    let px = &decoded.pixels()[0..3];
    assert!(px.iter().all(|&v| v > 240), "{:?}", px);
}

#[test]
fn test_transparent_png_to_png_keeps_alpha() {
    let artifact = Pipeline::default()
        .run(
            "uploads/1_100x100_85_png_none_logo.png",
            &test_images::transparent_png(100, 100),
        )
        .unwrap();
    let decoded = decode(&artifact.bytes).unwrap();
    assert_eq!(decoded.mode(), ColorMode::Rgba);
    assert_eq!(decoded.pixels()[3], 0);
}

#[test]
fn test_gif_input_to_webp() {
    let artifact = Pipeline::default()
        .run("uploads/1_50x50_80_webp_none_anim.gif", &test_images::gif(100, 40))
        .unwrap();
    assert_eq!(artifact.content_type, "image/webp");
    assert_eq!(artifact.output_key, "processed/anim.webp");
    assert_eq!(artifact.output_size, (50, 20));
}

#[test]
fn test_watermarked_output_differs() {
    let source = test_images::opaque_png(600, 400);
    let pipeline = Pipeline::default();

    let plain = pipeline
        .run("uploads/1_600x400_85_png_none_a.png", &source)
        .unwrap();
    let marked = pipeline
        .run("uploads/1_600x400_85_png_Image%20Hub_a.png", &source)
        .unwrap();

    assert_eq!(marked.params.watermark.as_deref(), Some("Image Hub"));
    assert_eq!(plain.output_size, marked.output_size);

    let plain = decode(&plain.bytes).unwrap();
    let marked = decode(&marked.bytes).unwrap();
    assert_ne!(plain.pixels(), marked.pixels());

    // top-left corner is untouched by a bottom-right caption
    assert_eq!(plain.pixels()[0..3], marked.pixels()[0..3]);
}

#[test]
fn test_malformed_key_uses_codec_defaults() {
    let codec = KeyCodec::new(imagehub::image_optimizer::ProcessingParameters::new(
        100,
        100,
        80,
        OutputFormat::Png,
    ));
    let artifact = Pipeline::new(codec)
        .run("invalid_key.jpg", &test_images::jpeg(300, 200))
        .unwrap();

    assert!(artifact.key_degraded);
    assert_eq!(artifact.content_type, "image/png");
    assert_eq!(artifact.output_key, "processed/invalid_key.png");
    assert_eq!(artifact.output_size, (100, 67));
}

#[test]
fn test_unsupported_format_is_encode_error() {
    let err = Pipeline::default()
        .run("uploads/1_800x600_85_bmp_none_a.jpg", &test_images::jpeg(10, 10))
        .unwrap_err();
    assert!(matches!(err, ProcessingError::Encode(_)));
    assert_eq!(err.status(), 422);
}

#[test]
fn test_garbage_input_is_decode_error() {
    let err = Pipeline::default()
        .run("uploads/1_800x600_85_jpeg_none_a.jpg", b"\x89PNG\r\n\x1a\ntruncated")
        .unwrap_err();
    assert!(matches!(err, ProcessingError::Decode(_)));
}

// Test: output always fits the requested box
#[test]
fn test_output_fits_box_for_many_shapes() {
    let pipeline = Pipeline::default();
    for (w, h) in [(1, 500), (500, 1), (333, 777), (1024, 1024), (999, 10)] {
        let source = test_images::opaque_png(w, h);
        let artifact = pipeline
            .run("uploads/1_120x90_85_png_none_s.png", &source)
            .unwrap();
        let (ow, oh) = artifact.output_size;
        assert!(ow >= 1 && ow <= 120 && oh >= 1 && oh <= 90, "{}x{} -> {}x{}", w, h, ow, oh);
    }
}

// Test: the same key and bytes always produce the same artifact
#[test]
fn test_rerun_is_byte_identical_for_every_format() {
    let source = test_images::transparent_png(240, 160);
    let pipeline = Pipeline::default();
    for format in ["jpeg", "png", "webp"] {
        let key = format!("uploads/1_200x200_75_{}_Hi_again.png", format);
        let first = pipeline.run(&key, &source).unwrap();
        let second = pipeline.run(&key, &source).unwrap();
        assert_eq!(first, second, "{} output changed between runs", format);
    }
}
