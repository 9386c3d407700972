// Builder unit tests: commit semantics and setter preconditions

use markit::codec::FormatTag;
use markit::watermark::{Adjustment, WatermarkKind, WatermarkPosition, WatermarkingMethod};
use markit::{WatermarkBuilder, WatermarkError, WatermarkService};
use rstest::rstest;

use super::helpers::png_canvas;

fn png_builder() -> WatermarkBuilder {
    WatermarkService::new()
        .watermark_image(png_canvas(10, 10), FormatTag::Png)
        .unwrap()
}

#[test]
fn test_valid_and_grows_batch_by_one() {
    let mut builder = png_builder();
    for expected in 1..=3 {
        builder.with_text(format!("mark {}", expected)).unwrap().and().unwrap();
        assert_eq!(builder.batch().len(), expected);
    }
}

#[test]
fn test_and_resets_current_to_defaults() {
    let mut builder = png_builder();
    builder
        .with_text("styled")
        .unwrap()
        .opacity(10)
        .rotation(33)
        .size(12)
        .dpi(96.0)
        .add_trademark()
        .position(WatermarkPosition::Tiled)
        .adjust(3, 4)
        .vertical_spacing(7)
        .horizontal_spacing(8)
        .end()
        .and()
        .unwrap();

    let current = builder.current();
    assert_eq!(current.kind, WatermarkKind::Text);
    assert!(current.text.is_none());
    assert_eq!(current.opacity, 50);
    assert_eq!(current.rotation, 0);
    assert_eq!(current.size, None);
    assert_eq!(current.dpi, 300.0);
    assert!(!current.trademark);
    assert_eq!(current.position, WatermarkPosition::Center);
    assert_eq!(current.adjustment, Adjustment::default());
    assert_eq!(current.vertical_spacing, 50);
    assert_eq!(current.horizontal_spacing, 50);
    assert!(current.enabled);
    assert_eq!(current.method, WatermarkingMethod::Draw);
}

#[test]
fn test_empty_text_commit_leaves_batch_unchanged() {
    let mut builder = png_builder();
    builder.with_text("kept").unwrap().and().unwrap();

    assert!(matches!(builder.and(), Err(WatermarkError::EmptyText)));
    assert_eq!(builder.batch().len(), 1);
}

#[rstest]
#[case(150)]
#[case(-1)]
#[case(101)]
fn test_opacity_out_of_range(#[case] opacity: i32) {
    let mut builder = png_builder();
    builder.with_text("x").unwrap().opacity(opacity);
    assert!(matches!(
        builder.and(),
        Err(WatermarkError::OutOfRange { field: "opacity", .. })
    ));
    assert!(builder.batch().is_empty());
}

#[rstest]
#[case(0)]
#[case(100)]
fn test_opacity_bounds_accepted(#[case] opacity: i32) {
    let mut builder = png_builder();
    builder.with_text("x").unwrap().opacity(opacity).and().unwrap();
    assert_eq!(builder.batch()[0].opacity, opacity);
}

#[rstest]
#[case(0)]
#[case(-5)]
fn test_non_positive_size_rejected(#[case] size: i32) {
    let mut builder = png_builder();
    builder.with_text("x").unwrap().size(size);
    assert!(matches!(
        builder.and(),
        Err(WatermarkError::OutOfRange { field: "size", .. })
    ));
}

#[test]
fn test_negative_tile_spacing_rejected_only_when_tiled() {
    let mut builder = png_builder();
    builder
        .with_text("x")
        .unwrap()
        .position(WatermarkPosition::Tiled)
        .vertical_spacing(-1)
        .end();
    assert!(matches!(
        builder.and(),
        Err(WatermarkError::OutOfRange { field: "vertical_spacing", .. })
    ));

    builder
        .with_text("x")
        .unwrap()
        .position(WatermarkPosition::Center)
        .vertical_spacing(-1)
        .end();
    assert!(builder.and().is_ok());
}

#[test]
fn test_disabled_records_are_still_validated() {
    let mut builder = png_builder();
    builder.with_text("x").unwrap().opacity(500).enable_if(false);
    assert!(builder.and().is_err());
}

#[test]
fn test_bad_hex_color_is_invalid_input() {
    let mut builder = png_builder();
    builder.with_text("x").unwrap();
    assert!(matches!(
        builder.color_hex("#12"),
        Err(WatermarkError::InvalidInput(_))
    ));
}
