// Shared inputs for the integration tests

use image::{DynamicImage, Rgba, RgbaImage};
use lopdf::{dictionary, Document, Object, Stream};
use markit::codec::{FormatTag, ImageCodec};

/// A US Letter document with `page_count` pages of Courier text.
pub fn make_pdf(page_count: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut kids: Vec<Object> = Vec::new();
    for page in 0..page_count {
        let content = format!("BT /F1 18 Tf 72 720 Td (page {}) Tj ET", page + 1).into_bytes();
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Decoded content streams of every page, in page order.
pub fn page_texts(pdf: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(pdf).unwrap();
    doc.get_pages()
        .into_values()
        .map(|id| String::from_utf8_lossy(&doc.get_page_content(id).unwrap()).into_owned())
        .collect()
}

pub fn solid_image(width: u32, height: u32, color: [u8; 4]) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color)))
}

/// A white canvas encoded as `format`.
pub fn blank_canvas(width: u32, height: u32, format: FormatTag) -> Vec<u8> {
    ImageCodec::new()
        .encode(&solid_image(width, height, [255, 255, 255, 255]), format)
        .unwrap()
}

pub fn png_of(image: &DynamicImage) -> Vec<u8> {
    ImageCodec::new().encode(image, FormatTag::Png).unwrap()
}

pub fn decode_rgba(bytes: &[u8]) -> RgbaImage {
    ImageCodec::new().decode(bytes).unwrap().to_rgba8()
}
