// Storage key codec: the documented scenarios and the round-trip property

use imagehub::image_optimizer::{OutputFormat, ProcessingParameters};
use imagehub::keys::{derive_output_key, KeyCodec, KeyDecode, KeyParseDegraded};
use rstest::rstest;

fn parsed(decode: KeyDecode) -> ProcessingParameters {
    match decode {
        KeyDecode::Parsed(params) => params,
        other => panic!("expected Parsed, got {:?}", other),
    }
}

// Test: watermark text survives the key untouched
#[test]
fn test_key_with_watermark_decodes_all_fields() {
    let params = parsed(
        KeyCodec::default().decode("uploads/1699889234_800x600_85_jpeg_ImageHub_photo.jpg"),
    );
    assert_eq!(
        params,
        ProcessingParameters::new(800, 600, 85, OutputFormat::Jpeg).with_watermark("ImageHub")
    );
}

// Test: a key without parameters processes with the defaults
#[test]
fn test_unparameterized_key_uses_defaults() {
    let decode = KeyCodec::default().decode("invalid_key.jpg");
    assert!(decode.is_degraded());
    assert_eq!(decode.parameters(), Some(&ProcessingParameters::default()));
    assert!(matches!(
        decode,
        KeyDecode::Defaulted {
            reason: KeyParseDegraded::TooFewFields { found: 2 },
            ..
        }
    ));
}

#[test]
fn test_output_key_strips_parameters() {
    assert_eq!(
        derive_output_key(
            "uploads/1699889234_800x600_85_jpeg_none_test.jpg",
            OutputFormat::Jpeg
        ),
        "processed/test.jpeg"
    );
}

#[rstest]
#[case("uploads/1_800x600_85_webp_none_a_b_c.png", OutputFormat::WebP, "processed/a_b_c.webp")]
#[case("uploads/1_800x600_85_png_none_archive.tar.gz", OutputFormat::Png, "processed/archive.tar.png")]
#[case("uploads/1_800x600_85_png_none_noext", OutputFormat::Png, "processed/noext.png")]
#[case("invalid_key.jpg", OutputFormat::Jpeg, "processed/invalid_key.jpeg")]
fn test_output_key_variants(
    #[case] key: &str,
    #[case] format: OutputFormat,
    #[case] expected: &str,
) {
    assert_eq!(derive_output_key(key, format), expected);
}

#[rstest]
#[case("uploads/1_800y600_85_jpeg_none_a.jpg")]
#[case("uploads/1_800x600_high_jpeg_none_a.jpg")]
#[case("uploads/1_0x600_85_jpeg_none_a.jpg")]
#[case("uploads/1_800x4001_85_jpeg_none_a.jpg")]
#[case("uploads/1_800x600_101_jpeg_none_a.jpg")]
#[case("uploads/1_800x600_85_jpeg_%FF_a.jpg")]
fn test_malformed_keys_degrade_to_defaults(#[case] key: &str) {
    let decode = KeyCodec::default().decode(key);
    assert!(decode.is_degraded(), "{} should degrade", key);
    assert_eq!(decode.parameters(), Some(&ProcessingParameters::default()));
}

#[test]
fn test_unknown_format_is_not_degraded() {
    let decode = KeyCodec::default().decode("uploads/1_800x600_85_tiff_none_a.jpg");
    assert_eq!(
        decode,
        KeyDecode::UnsupportedFormat {
            token: "tiff".to_string()
        }
    );
    assert_eq!(decode.parameters(), None);
}

#[test]
fn test_custom_defaults_apply_to_degraded_keys() {
    let defaults = ProcessingParameters::new(320, 240, 60, OutputFormat::WebP).with_watermark("x");
    let codec = KeyCodec::new(defaults);

    let decode = codec.decode("photo.jpg");
    let params = decode.parameters().unwrap();
    assert_eq!((params.width, params.height, params.quality), (320, 240, 60));
    assert_eq!(params.watermark, None);
}

// Test: encode then decode yields the same parameters for awkward watermarks
#[rstest]
#[case(None)]
#[case(Some(""))]
#[case(Some("none"))]
#[case(Some("a_b_c"))]
#[case(Some("50% off / today"))]
#[case(Some("plus+sign"))]
#[case(Some("日本語 ✓"))]
fn test_round_trip(#[case] watermark: Option<&str>) {
    let codec = KeyCodec::default();
    let mut params = ProcessingParameters::new(1920, 1080, 92, OutputFormat::WebP);
    params.watermark = watermark.map(str::to_string);

    let key = codec.encode_at("My Photo.png", &params, 1700000000);
    assert!(key.starts_with("uploads/1700000000_1920x1080_92_webp_"));
    assert!(key.ends_with("_My_Photo.png"));
    assert_eq!(parsed(codec.decode(&key)), params);
}

#[test]
fn test_degraded_reason_is_readable() {
    let reason = KeyParseDegraded::OutOfRange {
        field: "quality",
        value: 101,
    };
    assert_eq!(reason.to_string(), "quality 101 is out of range");
}
