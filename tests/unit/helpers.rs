// Shared inputs for the unit tests

use image::{DynamicImage, Rgba, RgbaImage};
use markit::codec::{FormatTag, ImageCodec};

pub fn png_canvas(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        width,
        height,
        Rgba([255, 255, 255, 255]),
    ));
    ImageCodec::new().encode(&image, FormatTag::Png).unwrap()
}
