//! Raster codec and target format handling
//!
//! - [`FormatTag`] names every supported target (PDF plus raster formats)
//! - [`detect_format`] sniffs magic bytes
//! - [`ImageCodec`] decodes watermark images and raster targets and encodes
//!   watermarked rasters through the [`ImageEncoder`] implementations

pub mod encoder;
pub mod format;

pub use encoder::{EncoderFactory, ImageCodec, ImageEncoder};
pub use format::{detect_format, detect_format_file, is_pdf, FormatTag};
