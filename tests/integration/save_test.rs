// Writing results to disk

use markit::codec::{detect_format_file, FormatTag};
use markit::watermark::WatermarkPosition;
use markit::{WatermarkError, WatermarkService};
use tempfile::tempdir;

use super::fixtures::{blank_canvas, make_pdf, solid_image};

#[test]
fn test_apply_to_path_writes_output() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("marked.pdf");

    let mut builder = WatermarkService::new().watermark_pdf(make_pdf(1)).unwrap();
    builder
        .with_text("SAVED")
        .unwrap()
        .position(WatermarkPosition::TopCenter)
        .end();

    let written = builder.apply_to_path(&output).unwrap();
    assert_eq!(written, output);
    assert_eq!(detect_format_file(&output).unwrap(), FormatTag::Pdf);
}

#[test]
fn test_apply_to_dir_creates_directory() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("out").join("images");

    let mut builder = WatermarkService::new()
        .watermark_image(blank_canvas(16, 16, FormatTag::Bmp), FormatTag::Bmp)
        .unwrap();
    builder.with_image(solid_image(4, 4, [1, 1, 1, 255])).unwrap();

    let written = builder.apply_to_dir(&nested, "marked.bmp").unwrap();
    assert_eq!(written, nested.join("marked.bmp"));
    assert_eq!(detect_format_file(&written).unwrap(), FormatTag::Bmp);
}

#[test]
fn test_unwritable_path_is_save_error() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("missing-dir").join("marked.png");

    let mut builder = WatermarkService::new()
        .watermark_image(blank_canvas(8, 8, FormatTag::Png), FormatTag::Png)
        .unwrap();
    builder.with_image(solid_image(2, 2, [0, 0, 0, 255])).unwrap();

    match builder.apply_to_path(&output) {
        Err(WatermarkError::Save { path, .. }) => assert_eq!(path, output),
        other => panic!("expected Save error, got {:?}", other),
    }
}

#[test]
fn test_watermark_file_round_trip_on_disk() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("input.png");
    std::fs::write(&input, blank_canvas(12, 12, FormatTag::Png)).unwrap();

    let mut builder = WatermarkService::new().watermark_image_file(&input).unwrap();
    builder.with_image(solid_image(3, 3, [0, 0, 0, 255])).unwrap();
    let output = builder.apply_to_path(dir.path().join("output.png")).unwrap();

    assert!(output.exists());
    assert_eq!(detect_format_file(&output).unwrap(), FormatTag::Png);
}
