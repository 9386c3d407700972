// End-to-end raster watermarking through the service and builder

use image::Rgba;
use markit::codec::{FormatTag, ImageCodec};
use markit::watermark::{WatermarkPosition, WatermarkingMethod};
use markit::{WatermarkError, WatermarkService};
use rstest::rstest;

use super::fixtures::{blank_canvas, decode_rgba, solid_image};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[test]
fn test_later_watermark_paints_over_earlier() {
    let mut builder = WatermarkService::new()
        .watermark_image(blank_canvas(100, 100, FormatTag::Png), FormatTag::Png)
        .unwrap();
    builder
        .with_image(solid_image(40, 40, [255, 0, 0, 255]))
        .unwrap()
        .opacity(100)
        .position(WatermarkPosition::TopLeft)
        .end()
        .and()
        .unwrap()
        .with_image(solid_image(40, 40, [0, 0, 255, 255]))
        .unwrap()
        .opacity(100)
        .position_at(20, 20)
        .end();

    let image = decode_rgba(&builder.apply().unwrap());
    // Only A
    assert_eq!(*image.get_pixel(5, 5), Rgba([255, 0, 0, 255]));
    // A and B intersect; B wins
    assert_eq!(*image.get_pixel(30, 30), Rgba([0, 0, 255, 255]));
    // Only B
    assert_eq!(*image.get_pixel(55, 55), Rgba([0, 0, 255, 255]));
    assert_eq!(*image.get_pixel(90, 90), WHITE);
}

#[test]
fn test_disabled_watermark_matches_output_without_it() {
    let canvas = blank_canvas(64, 64, FormatTag::Png);
    let service = WatermarkService::new();

    let mut with_disabled = service.watermark_image(canvas.clone(), FormatTag::Png).unwrap();
    with_disabled
        .with_image(solid_image(16, 16, [0, 255, 0, 255]))
        .unwrap()
        .position(WatermarkPosition::TopLeft)
        .end()
        .and()
        .unwrap()
        .with_image(solid_image(64, 64, [0, 0, 0, 255]))
        .unwrap()
        .enable_if(false);

    let mut without = service.watermark_image(canvas, FormatTag::Png).unwrap();
    without
        .with_image(solid_image(16, 16, [0, 255, 0, 255]))
        .unwrap()
        .position(WatermarkPosition::TopLeft)
        .end();

    assert_eq!(with_disabled.apply().unwrap(), without.apply().unwrap());
}

#[test]
fn test_half_opacity_blends_with_canvas() {
    let mut builder = WatermarkService::new()
        .watermark_image(blank_canvas(20, 20, FormatTag::Png), FormatTag::Png)
        .unwrap();
    builder
        .with_image(solid_image(20, 20, [0, 0, 0, 255]))
        .unwrap()
        .opacity(50);

    let pixel = *decode_rgba(&builder.apply().unwrap()).get_pixel(10, 10);
    assert!((126..=129).contains(&pixel[0]), "unexpected pixel {:?}", pixel);
    assert_eq!(pixel[3], 255);
}

#[rstest]
#[case(FormatTag::Png)]
#[case(FormatTag::Jpeg)]
#[case(FormatTag::Tiff)]
#[case(FormatTag::Bmp)]
fn test_output_format_matches_target(#[case] format: FormatTag) {
    let mut builder = WatermarkService::new()
        .watermark_image(blank_canvas(32, 32, format), format)
        .unwrap();
    builder
        .with_image(solid_image(8, 8, [10, 20, 30, 255]))
        .unwrap()
        .position(WatermarkPosition::BottomCenter)
        .end();

    let output = builder.apply().unwrap();
    assert_eq!(ImageCodec::new().detect_format(&output).unwrap(), format);
}

#[test]
fn test_quarter_rotation_swaps_box() {
    let mut builder = WatermarkService::new()
        .watermark_image(blank_canvas(50, 50, FormatTag::Png), FormatTag::Png)
        .unwrap();
    builder
        .with_image(solid_image(30, 10, [0, 0, 0, 255]))
        .unwrap()
        .opacity(100)
        .rotation(90)
        .position(WatermarkPosition::TopLeft)
        .end();

    let image = decode_rgba(&builder.apply().unwrap());
    assert_eq!(*image.get_pixel(5, 25), Rgba([0, 0, 0, 255]));
    assert_eq!(*image.get_pixel(25, 5), WHITE);
}

#[test]
fn test_overlay_rejected_for_raster() {
    let mut builder = WatermarkService::new()
        .watermark_image(blank_canvas(10, 10, FormatTag::Jpeg), FormatTag::Jpeg)
        .unwrap();
    builder
        .with_text("NOPE")
        .unwrap()
        .method(WatermarkingMethod::Overlay);

    assert!(matches!(
        builder.apply(),
        Err(WatermarkError::UnsupportedMethod { .. })
    ));
}

#[test]
fn test_text_watermark_changes_pixels() {
    let canvas = blank_canvas(300, 100, FormatTag::Png);
    let mut builder = WatermarkService::new()
        .watermark_image(canvas, FormatTag::Png)
        .unwrap();
    builder
        .with_text("SAMPLE")
        .unwrap()
        .color_hex("#000000")
        .unwrap()
        .opacity(100)
        .size(40);

    let image = decode_rgba(&builder.apply().unwrap());
    assert!(image.pixels().any(|p| *p != WHITE));
}

#[test]
fn test_oversized_image_watermark_fails_as_render_error() {
    let mut builder = WatermarkService::new()
        .watermark_image(blank_canvas(32, 32, FormatTag::Png), FormatTag::Png)
        .unwrap();
    builder
        .with_image(solid_image(8, 8, [255, 0, 0, 255]))
        .unwrap()
        .size(i32::MAX);

    assert!(matches!(builder.apply(), Err(WatermarkError::Render { .. })));
}

#[test]
fn test_tiled_watermark_with_far_offset_still_covers_image() {
    let mut builder = WatermarkService::new()
        .watermark_image(blank_canvas(50, 50, FormatTag::Png), FormatTag::Png)
        .unwrap();
    builder
        .with_image(solid_image(10, 10, [0, 0, 0, 255]))
        .unwrap()
        .opacity(100)
        .position(WatermarkPosition::Tiled)
        .adjust(i32::MIN, i32::MIN)
        .vertical_spacing(0)
        .horizontal_spacing(0)
        .end();

    let image = decode_rgba(&builder.apply().unwrap());
    assert!(image.pixels().all(|p| *p == Rgba([0, 0, 0, 255])));
}
