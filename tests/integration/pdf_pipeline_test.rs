// End-to-end PDF watermarking through the service and builder

use std::sync::Arc;

use lopdf::Document;
use markit::executor::build_thread_pool;
use markit::watermark::{WatermarkPosition, WatermarkingMethod};
use markit::{WatermarkError, WatermarkService};

use super::fixtures::{make_pdf, page_texts, png_of, solid_image};

#[test]
fn test_batch_of_text_and_image_on_every_page() {
    let service = WatermarkService::new();
    let mut builder = service.watermark_pdf(make_pdf(2)).unwrap();
    builder
        .with_text("CONFIDENTIAL")
        .unwrap()
        .opacity(30)
        .rotation(45)
        .position(WatermarkPosition::Center)
        .end()
        .and()
        .unwrap()
        .with_image(png_of(&solid_image(40, 20, [0, 0, 255, 255])))
        .unwrap()
        .position(WatermarkPosition::BottomRight)
        .adjust(-20, -20)
        .end();

    let output = builder.apply().unwrap();
    let texts = page_texts(&output);

    assert_eq!(texts.len(), 2);
    for text in &texts {
        assert!(text.contains("(CONFIDENTIAL) Tj"));
        assert!(text.contains("/MkIm1 Do"));
        // Later watermarks paint on top of earlier ones
        assert!(text.find("CONFIDENTIAL").unwrap() < text.find("/MkIm1 Do").unwrap());
    }
}

#[test]
fn test_page_filter_limits_pages() {
    let mut builder = WatermarkService::new().watermark_pdf(make_pdf(3)).unwrap();
    builder
        .with_text("FIRST PAGE")
        .unwrap()
        .page_filter(|index: usize| index == 0)
        .unwrap();

    let texts = page_texts(&builder.apply().unwrap());
    assert!(texts[0].contains("(FIRST PAGE) Tj"));
    assert!(!texts[1].contains("FIRST PAGE"));
    assert!(!texts[2].contains("FIRST PAGE"));
}

#[test]
fn test_document_filter_can_skip_whole_document() {
    let input = make_pdf(2);
    let mut builder = WatermarkService::new().watermark_pdf(input.clone()).unwrap();
    builder
        .with_text("ONLY BIG DOCUMENTS")
        .unwrap()
        .document_filter(|doc: &Document| doc.get_pages().len() > 10)
        .unwrap();

    assert_eq!(builder.apply().unwrap(), input);
}

#[test]
fn test_disabled_watermark_leaves_document_untouched() {
    let input = make_pdf(1);
    let mut builder = WatermarkService::new().watermark_pdf(input.clone()).unwrap();
    builder.with_text("HIDDEN").unwrap().enable_if(false);

    assert_eq!(builder.batch().len(), 0);
    assert_eq!(builder.apply().unwrap(), input);
}

#[test]
fn test_draw_method_paints_raster_image() {
    let mut builder = WatermarkService::new().watermark_pdf(make_pdf(1)).unwrap();
    builder
        .with_image(solid_image(72, 72, [255, 0, 0, 255]))
        .unwrap()
        .method(WatermarkingMethod::Draw)
        .dpi(72.0);

    let texts = page_texts(&builder.apply().unwrap());
    assert!(texts[0].contains("/MkIm0 Do"));
    assert!(texts[0].contains("(page 1) Tj"));
}

#[test]
fn test_thread_pool_output_matches_inline() {
    let input = make_pdf(6);
    let build = |service: WatermarkService| {
        let mut builder = service.watermark_pdf(input.clone()).unwrap();
        builder
            .with_text("DRAFT")
            .unwrap()
            .position(WatermarkPosition::Tiled)
            .vertical_spacing(100)
            .horizontal_spacing(100)
            .end();
        builder.apply().unwrap()
    };

    let inline = build(WatermarkService::new());
    let pool = Arc::new(build_thread_pool(3).unwrap());
    let pooled = build(WatermarkService::new().with_executor(pool));

    assert_eq!(inline, pooled);
}

#[test]
fn test_truncated_pdf_fails_at_render() {
    let mut input = make_pdf(1);
    input.truncate(20);
    let mut builder = WatermarkService::new().watermark_pdf(input).unwrap();
    builder.with_text("BROKEN").unwrap();

    assert!(matches!(builder.apply(), Err(WatermarkError::Render { .. })));
}

#[test]
fn test_overlay_is_default_for_pdf() {
    let builder = WatermarkService::new().watermark_pdf(make_pdf(1)).unwrap();
    assert_eq!(builder.current().method, WatermarkingMethod::Overlay);
}
