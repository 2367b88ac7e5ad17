// Upload request validation and key issuance

use imagehub::image_optimizer::{OutputFormat, ProcessingParameters};
use imagehub::keys::{KeyCodec, KeyDecode};
use imagehub::upload::UploadRequest;
use rstest::rstest;

fn request(filename: &str, content_type: &str) -> UploadRequest {
    UploadRequest {
        filename: Some(filename.to_string()),
        content_type: Some(content_type.to_string()),
        ..UploadRequest::default()
    }
}

#[rstest]
#[case("image/jpeg")]
#[case("image/jpg")]
#[case("image/png")]
#[case("image/webp")]
fn test_accepted_content_types(#[case] content_type: &str) {
    assert!(request("a.jpg", content_type)
        .validate(&ProcessingParameters::default())
        .is_ok());
}

#[rstest]
#[case("image/gif")]
#[case("application/pdf")]
#[case("IMAGE/JPEG")]
fn test_rejected_content_types(#[case] content_type: &str) {
    let errors = request("a.jpg", content_type)
        .validate(&ProcessingParameters::default())
        .unwrap_err();
    assert_eq!(
        errors.0,
        vec!["contentType must be one of: image/jpeg, image/jpg, image/png, image/webp"]
    );
}

#[rstest]
#[case(Some(1), true)]
#[case(Some(4000), true)]
#[case(Some(0), false)]
#[case(Some(-5), false)]
#[case(Some(4001), false)]
#[case(None, true)]
fn test_width_bounds(#[case] width: Option<i64>, #[case] ok: bool) {
    let req = UploadRequest {
        width,
        ..request("a.png", "image/png")
    };
    assert_eq!(req.validate(&ProcessingParameters::default()).is_ok(), ok);
}

#[test]
fn test_defaults_come_from_codec() {
    let codec = KeyCodec::new(ProcessingParameters::new(640, 480, 70, OutputFormat::Png));
    let ticket = request("shot.png", "image/png").issue_at(&codec, 42).unwrap();

    assert_eq!(ticket.key, "uploads/42_640x480_70_png_none_shot.png");
    assert_eq!(ticket.params.format, OutputFormat::Png);
}

// Test: an issued key decodes back to the validated parameters
#[test]
fn test_issued_key_decodes_to_same_parameters() {
    let codec = KeyCodec::default();
    let req = UploadRequest {
        width: Some(1200),
        height: Some(900),
        quality: Some(77),
        format: Some("png".to_string()),
        watermark: Some("© Studio_42 / 2024".to_string()),
        ..request("holiday pic.jpeg", "image/jpeg")
    };
    let ticket = req.issue(&codec).unwrap();

    match codec.decode(&ticket.key) {
        KeyDecode::Parsed(params) => assert_eq!(params, ticket.params),
        other => panic!("expected Parsed, got {:?}", other),
    }
}

#[test]
fn test_ticket_serializes_camel_case() {
    let ticket = request("a.jpg", "image/jpeg").issue_at(&KeyCodec::default(), 1).unwrap();
    let json = serde_json::to_value(&ticket).unwrap();
    assert_eq!(json["key"], "uploads/1_800x600_85_jpeg_none_a.jpg");
    assert_eq!(json["contentType"], "image/jpeg");
    assert_eq!(json["params"]["quality"], 85);
}
