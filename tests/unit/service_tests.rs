// Target selection unit tests

use markit::codec::FormatTag;
use markit::source::BytesSource;
use markit::{WatermarkError, WatermarkService};
use rstest::rstest;

use super::helpers::png_canvas;

#[rstest]
#[case("webp")]
#[case("svg")]
#[case("pdfx")]
fn test_unrecognized_tag_is_unsupported_format(#[case] tag: &str) {
    let result = WatermarkService::new()
        .select_target_format(Box::new(BytesSource::new(png_canvas(4, 4))), tag);
    assert!(matches!(result, Err(WatermarkError::UnsupportedFormat(_))));
}

#[rstest]
#[case("jpg", FormatTag::Jpeg)]
#[case("tif", FormatTag::Tiff)]
#[case("bmp", FormatTag::Bmp)]
fn test_tag_aliases(#[case] tag: &str, #[case] expected: FormatTag) {
    assert_eq!(tag.parse::<FormatTag>().unwrap(), expected);
}

#[test]
fn test_pdf_tag_on_image_is_decode_error() {
    let result = WatermarkService::new()
        .select_target_format(Box::new(BytesSource::new(png_canvas(4, 4))), "pdf");
    assert!(matches!(result, Err(WatermarkError::Decode { .. })));
}

#[test]
fn test_empty_source_is_rejected() {
    let result = WatermarkService::new().watermark_detected(Vec::new());
    assert!(matches!(result, Err(WatermarkError::UnsupportedFormat(_))));
}
