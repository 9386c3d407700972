//! Image encoder abstraction
//!
//! Provides a trait-based encoder system so every raster target format is
//! written through the same interface. Decoding goes through the `image`
//! crate's format guessing; encoding picks an encoder by [`FormatTag`].

use std::io::Cursor;
use std::path::Path;

use image::DynamicImage;

use super::format::FormatTag;
use crate::error::WatermarkError;

/// Default JPEG quality used when re-encoding watermarked photos.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Trait for image encoders
///
/// Implementations handle encoding raw RGBA image data to a specific format.
/// The trait is object-safe to allow dynamic dispatch.
pub trait ImageEncoder: Send + Sync {
    /// The output format this encoder produces
    fn format(&self) -> FormatTag;

    /// Encode raw RGBA image data (4 bytes per pixel) to the target format
    fn encode(&self, data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, WatermarkError>;

    /// Check if this encoder keeps the alpha channel
    fn supports_transparency(&self) -> bool;
}

fn encode_failed(format: FormatTag, err: image::ImageError) -> WatermarkError {
    WatermarkError::render_with(format!("failed to encode {} output", format), err)
}

/// JPEG encoder using the image crate
pub struct JpegEncoder {
    quality: u8,
}

impl Default for JpegEncoder {
    fn default() -> Self {
        Self {
            quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl JpegEncoder {
    pub fn with_quality(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }
}

impl ImageEncoder for JpegEncoder {
    fn format(&self) -> FormatTag {
        FormatTag::Jpeg
    }

    fn encode(&self, data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, WatermarkError> {
        use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;
        use image::ImageEncoder as _;

        // JPEG has no alpha channel
        let rgb_data = rgba_to_rgb(data);

        let mut output = Cursor::new(Vec::new());
        let encoder = ImageJpegEncoder::new_with_quality(&mut output, self.quality);
        encoder
            .write_image(&rgb_data, width, height, image::ColorType::Rgb8)
            .map_err(|e| encode_failed(FormatTag::Jpeg, e))?;

        Ok(output.into_inner())
    }

    fn supports_transparency(&self) -> bool {
        false
    }
}

/// PNG encoder using the image crate
pub struct PngEncoder;

impl ImageEncoder for PngEncoder {
    fn format(&self) -> FormatTag {
        FormatTag::Png
    }

    fn encode(&self, data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, WatermarkError> {
        use image::codecs::png::PngEncoder as ImagePngEncoder;
        use image::ImageEncoder as _;

        let mut output = Cursor::new(Vec::new());
        let encoder = ImagePngEncoder::new(&mut output);
        encoder
            .write_image(data, width, height, image::ColorType::Rgba8)
            .map_err(|e| encode_failed(FormatTag::Png, e))?;

        Ok(output.into_inner())
    }

    fn supports_transparency(&self) -> bool {
        true
    }
}

/// TIFF encoder using the image crate
pub struct TiffEncoder;

impl ImageEncoder for TiffEncoder {
    fn format(&self) -> FormatTag {
        FormatTag::Tiff
    }

    fn encode(&self, data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, WatermarkError> {
        use image::codecs::tiff::TiffEncoder as ImageTiffEncoder;
        use image::ImageEncoder as _;

        let mut output = Cursor::new(Vec::new());
        let encoder = ImageTiffEncoder::new(&mut output);
        encoder
            .write_image(data, width, height, image::ColorType::Rgba8)
            .map_err(|e| encode_failed(FormatTag::Tiff, e))?;

        Ok(output.into_inner())
    }

    fn supports_transparency(&self) -> bool {
        true
    }
}

/// BMP encoder using the image crate
pub struct BmpEncoder;

impl ImageEncoder for BmpEncoder {
    fn format(&self) -> FormatTag {
        FormatTag::Bmp
    }

    fn encode(&self, data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, WatermarkError> {
        use image::codecs::bmp::BmpEncoder as ImageBmpEncoder;
        use image::ImageEncoder as _;

        // Opaque 24-bit output reads everywhere
        let rgb_data = rgba_to_rgb(data);

        let mut output = Vec::new();
        let encoder = ImageBmpEncoder::new(&mut output);
        encoder
            .write_image(&rgb_data, width, height, image::ColorType::Rgb8)
            .map_err(|e| encode_failed(FormatTag::Bmp, e))?;

        Ok(output)
    }

    fn supports_transparency(&self) -> bool {
        false
    }
}

/// Factory for creating encoders based on format
pub struct EncoderFactory;

impl EncoderFactory {
    /// Create an encoder for the specified format
    pub fn create(format: FormatTag) -> Result<Box<dyn ImageEncoder>, WatermarkError> {
        match format {
            FormatTag::Jpeg => Ok(Box::new(JpegEncoder::default())),
            FormatTag::Png => Ok(Box::new(PngEncoder)),
            FormatTag::Tiff => Ok(Box::new(TiffEncoder)),
            FormatTag::Bmp => Ok(Box::new(BmpEncoder)),
            FormatTag::Pdf => Err(WatermarkError::unsupported_format(
                "pdf is not a raster image format",
            )),
        }
    }
}

/// Flatten RGBA data onto a white background for formats without alpha
fn rgba_to_rgb(rgba: &[u8]) -> Vec<u8> {
    let pixel_count = rgba.len() / 4;
    let mut rgb = Vec::with_capacity(pixel_count * 3);
    for chunk in rgba.chunks_exact(4) {
        let alpha = u32::from(chunk[3]);
        for &channel in &chunk[..3] {
            let blended = (u32::from(channel) * alpha + 255 * (255 - alpha) + 127) / 255;
            rgb.push(blended as u8);
        }
    }
    rgb
}

/// Raster codec used for watermark images and raster targets.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCodec;

impl ImageCodec {
    pub fn new() -> Self {
        Self
    }

    /// Decode an image from memory, guessing its format.
    pub fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, WatermarkError> {
        if bytes.is_empty() {
            return Err(WatermarkError::invalid_input("image bytes are empty"));
        }
        image::load_from_memory(bytes).map_err(|e| WatermarkError::decode("image", e))
    }

    /// Decode an image from memory using a known format.
    pub fn decode_as(&self, bytes: &[u8], format: FormatTag) -> Result<DynamicImage, WatermarkError> {
        let image_format = format.image_format().ok_or_else(|| {
            WatermarkError::unsupported_format(format!("{} is not a raster image format", format))
        })?;
        image::load_from_memory_with_format(bytes, image_format)
            .map_err(|e| WatermarkError::decode(format!("{} image", format), e))
    }

    /// Decode an image stored on disk.
    pub fn decode_file(&self, path: &Path) -> Result<DynamicImage, WatermarkError> {
        let bytes = std::fs::read(path)
            .map_err(|e| WatermarkError::decode(format!("image file '{}'", path.display()), e))?;
        self.decode(&bytes)
    }

    /// Encode an image into the given raster format.
    pub fn encode(&self, image: &DynamicImage, format: FormatTag) -> Result<Vec<u8>, WatermarkError> {
        let encoder = EncoderFactory::create(format)?;
        let rgba = image.to_rgba8();
        encoder.encode(rgba.as_raw(), rgba.width(), rgba.height())
    }

    pub fn detect_format(&self, bytes: &[u8]) -> Result<FormatTag, WatermarkError> {
        super::format::detect_format(bytes)
    }

    pub fn detect_format_file(&self, path: &Path) -> Result<FormatTag, WatermarkError> {
        super::format::detect_format_file(path)
    }
}
