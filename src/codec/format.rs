//! Target format tags and magic-byte format detection.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WatermarkError;
use crate::watermark::WatermarkingMethod;

/// Formats a watermarking target can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatTag {
    Pdf,
    Png,
    Jpeg,
    Tiff,
    Bmp,
}

impl FormatTag {
    pub const ALL: [FormatTag; 5] = [
        FormatTag::Pdf,
        FormatTag::Png,
        FormatTag::Jpeg,
        FormatTag::Tiff,
        FormatTag::Bmp,
    ];

    /// True for paged document formats.
    pub fn is_document(self) -> bool {
        matches!(self, FormatTag::Pdf)
    }

    /// Method used when the caller does not pick one.
    ///
    /// Raster formats burn the watermark into the pixels; documents get a
    /// separate content layer.
    pub fn default_method(self) -> WatermarkingMethod {
        if self.is_document() {
            WatermarkingMethod::Overlay
        } else {
            WatermarkingMethod::Draw
        }
    }

    /// Matching `image` crate format, `None` for documents.
    pub fn image_format(self) -> Option<image::ImageFormat> {
        match self {
            FormatTag::Pdf => None,
            FormatTag::Png => Some(image::ImageFormat::Png),
            FormatTag::Jpeg => Some(image::ImageFormat::Jpeg),
            FormatTag::Tiff => Some(image::ImageFormat::Tiff),
            FormatTag::Bmp => Some(image::ImageFormat::Bmp),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            FormatTag::Pdf => "pdf",
            FormatTag::Png => "png",
            FormatTag::Jpeg => "jpg",
            FormatTag::Tiff => "tiff",
            FormatTag::Bmp => "bmp",
        }
    }

    /// Guess a tag from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, WatermarkError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| {
                WatermarkError::unsupported_format(format!(
                    "'{}' has no file extension",
                    path.display()
                ))
            })?;
        ext.parse()
    }

    fn from_image_format(format: image::ImageFormat) -> Result<Self, WatermarkError> {
        match format {
            image::ImageFormat::Png => Ok(FormatTag::Png),
            image::ImageFormat::Jpeg => Ok(FormatTag::Jpeg),
            image::ImageFormat::Tiff => Ok(FormatTag::Tiff),
            image::ImageFormat::Bmp => Ok(FormatTag::Bmp),
            other => Err(WatermarkError::unsupported_format(format!("{:?}", other))),
        }
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormatTag::Pdf => "pdf",
            FormatTag::Png => "png",
            FormatTag::Jpeg => "jpeg",
            FormatTag::Tiff => "tiff",
            FormatTag::Bmp => "bmp",
        };
        f.write_str(name)
    }
}

impl FromStr for FormatTag {
    type Err = WatermarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(FormatTag::Pdf),
            "png" => Ok(FormatTag::Png),
            "jpeg" | "jpg" => Ok(FormatTag::Jpeg),
            "tiff" | "tif" => Ok(FormatTag::Tiff),
            "bmp" => Ok(FormatTag::Bmp),
            other => Err(WatermarkError::unsupported_format(other)),
        }
    }
}

/// PDF files start with this header (possibly after a few junk bytes).
const PDF_MAGIC: &[u8] = b"%PDF-";

/// True when the bytes look like a PDF document.
pub fn is_pdf(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(1024)];
    window
        .windows(PDF_MAGIC.len())
        .any(|w| w == PDF_MAGIC)
}

/// Sniff the format of a byte buffer.
///
/// Fails with `UnsupportedFormat` when the bytes are neither a PDF nor an
/// image format this crate can both decode and encode.
pub fn detect_format(bytes: &[u8]) -> Result<FormatTag, WatermarkError> {
    if is_pdf(bytes) {
        return Ok(FormatTag::Pdf);
    }

    let format = image::guess_format(bytes)
        .map_err(|_| WatermarkError::unsupported_format("unrecognized file signature"))?;
    FormatTag::from_image_format(format)
}

/// Sniff the format of a file on disk.
pub fn detect_format_file(path: &Path) -> Result<FormatTag, WatermarkError> {
    let bytes = std::fs::read(path)
        .map_err(|e| WatermarkError::decode(format!("file '{}'", path.display()), e))?;
    detect_format(&bytes)
}
