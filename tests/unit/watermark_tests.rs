// Text watermark: identity for absent text, bounded bottom-right footprint

use imagehub::image_optimizer::{ColorMode, RasterImage};
use imagehub::watermark::{
    apply_text_watermark, bottom_right_position, font_size_for_width, measure_text,
    ImageDimensions, WatermarkDimensions, EDGE_PADDING, FONT_SIZE_RATIO,
};

fn solid(width: u32, height: u32, value: u8) -> RasterImage {
    RasterImage::new(
        width,
        height,
        ColorMode::Rgb,
        vec![value; (width * height * 3) as usize],
    )
    .unwrap()
}

fn changed_pixels(before: &RasterImage, after: &RasterImage) -> Vec<(u32, u32)> {
    let width = before.width();
    before
        .pixels()
        .chunks(3)
        .zip(after.pixels().chunks(3))
        .enumerate()
        .filter(|(_, (a, b))| a != b)
        .map(|(i, _)| (i as u32 % width, i as u32 / width))
        .collect()
}

#[test]
fn test_absent_and_empty_text_are_identity() {
    let image = solid(200, 100, 40);
    assert_eq!(apply_text_watermark(image.clone(), None).unwrap(), image);
    assert_eq!(apply_text_watermark(image.clone(), Some("")).unwrap(), image);
    assert_eq!(apply_text_watermark(image.clone(), Some("   ")).unwrap(), image);
}

// Test: "X" lands inside the padded bottom-right box and only partly covers it
#[test]
fn test_watermark_stays_in_bottom_right_box() {
    let before = solid(400, 300, 0);
    let after = apply_text_watermark(before.clone(), Some("X")).unwrap();
    assert_eq!(after.mode(), ColorMode::Rgb);

    let changed = changed_pixels(&before, &after);
    assert!(!changed.is_empty());

    let font_size = font_size_for_width(400, FONT_SIZE_RATIO);
    let metrics = measure_text("X", font_size).unwrap();
    let pos = bottom_right_position(
        &ImageDimensions {
            width: 400,
            height: 300,
        },
        &WatermarkDimensions {
            width: metrics.width,
            height: metrics.height,
        },
        EDGE_PADDING,
    );

    for (x, y) in &changed {
        assert!(*x as i32 >= pos.x && *x < 400 - EDGE_PADDING, "x={} out of box", x);
        assert!(*y as i32 >= pos.y && *y < 300 - EDGE_PADDING, "y={} out of box", y);
    }

    let box_area = (metrics.width * metrics.height) as usize;
    assert!(changed.len() < box_area);

    // half-opacity white over black never reaches full white
    assert!(after.pixels().iter().all(|&v| v < 200));
}

#[test]
fn test_larger_images_get_larger_text() {
    let small = measure_text("Image Hub", font_size_for_width(400, FONT_SIZE_RATIO)).unwrap();
    let large = measure_text("Image Hub", font_size_for_width(1600, FONT_SIZE_RATIO)).unwrap();
    assert!(large.width > small.width * 3);
    assert!(large.height > small.height * 3);
}

#[test]
fn test_tiny_image_does_not_panic() {
    let image = solid(4, 4, 10);
    let out = apply_text_watermark(image, Some("A long caption that cannot fit")).unwrap();
    assert_eq!(out.dimensions(), (4, 4));
}
