//! Format-specific render backends.
//!
//! The dispatcher hands a whole batch to one [`RenderBackend`] per target
//! format family:
//!
//! - [`RasterRenderBackend`] burns watermarks into PNG, JPEG, TIFF and BMP
//!   images
//! - [`PdfRenderBackend`] appends watermark content streams to PDF pages
//!
//! Backends must paint records in batch order and skip records whose
//! `enabled` flag is false.

pub mod helvetica;
pub mod pdf;
pub mod raster;

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use image::{imageops, RgbaImage};

use crate::codec::FormatTag;
use crate::error::WatermarkError;
use crate::executor::TaskExecutor;
use crate::watermark::text_renderer::{
    checked_raster_dimensions, rotate_image, TextRenderOptions, TextRenderer,
};
use crate::watermark::{WatermarkAttributes, WatermarkKind};

pub use pdf::PdfRenderBackend;
pub use raster::RasterRenderBackend;

/// The document or image being watermarked.
#[derive(Debug, Clone)]
pub struct RenderTarget {
    pub bytes: Vec<u8>,
    pub format: FormatTag,
}

impl RenderTarget {
    pub fn new(bytes: Vec<u8>, format: FormatTag) -> Self {
        Self { bytes, format }
    }
}

/// Renders a batch of watermarks onto a target.
pub trait RenderBackend: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Whether this backend can render the given format.
    fn supports(&self, format: FormatTag) -> bool;

    /// Paint every enabled record of `batch`, in order, and return the
    /// encoded result.
    fn render(
        &self,
        batch: &[Arc<WatermarkAttributes>],
        target: &RenderTarget,
        executor: &Arc<dyn TaskExecutor>,
    ) -> Result<Vec<u8>, WatermarkError>;
}

/// Pick the default backend for a target format.
pub fn default_backend(format: FormatTag, font_path: Option<PathBuf>) -> Box<dyn RenderBackend> {
    if format.is_document() {
        Box::new(PdfRenderBackend::new().with_font_path(font_path))
    } else {
        Box::new(RasterRenderBackend::new().with_font_path(font_path))
    }
}

/// Lazily loads the font used for raster text.
#[derive(Debug, Default)]
pub struct FontProvider {
    path: Option<PathBuf>,
    loaded: OnceLock<Arc<TextRenderer>>,
}

impl FontProvider {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            loaded: OnceLock::new(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn renderer(&self) -> Result<Arc<TextRenderer>, WatermarkError> {
        if let Some(renderer) = self.loaded.get() {
            return Ok(Arc::clone(renderer));
        }

        let renderer = match &self.path {
            Some(path) => Arc::new(TextRenderer::load(path)?),
            None => TextRenderer::shared_default()?,
        };
        Ok(Arc::clone(self.loaded.get_or_init(|| renderer)))
    }
}

/// Rasterize one record.
///
/// `pixels_per_unit` converts the record's size into pixels: 1.0 for raster
/// targets, `dpi / 72` when a document page is drawn at the record's dpi.
/// When `apply_rotation` is false the caller rotates the result itself.
pub(crate) fn rasterize_record(
    record: &WatermarkAttributes,
    pixels_per_unit: f32,
    fonts: &FontProvider,
    apply_rotation: bool,
) -> Result<RgbaImage, WatermarkError> {
    let rotation = if apply_rotation && record.normalized_rotation() != 0 {
        Some(record.normalized_rotation() as f32)
    } else {
        None
    };

    match record.kind {
        WatermarkKind::Text => {
            let text = record.display_text().ok_or(WatermarkError::EmptyText)?;
            let renderer = fonts.renderer()?;
            renderer.render(&TextRenderOptions {
                text,
                font_size: record.effective_size() as f32 * pixels_per_unit,
                color: record.color,
                rotation_degrees: rotation,
            })
        }
        WatermarkKind::Image => {
            let source = record
                .image
                .as_ref()
                .ok_or_else(|| WatermarkError::InvalidImage("no image was provided".to_string()))?;
            let scale = f64::from(record.effective_size()) / 100.0 * f64::from(pixels_per_unit);
            let rgba = source.to_rgba8();

            let scaled = if (scale - 1.0).abs() < f64::from(f32::EPSILON) {
                rgba
            } else {
                let (width, height) = checked_raster_dimensions(
                    (f64::from(rgba.width()) * scale).round(),
                    (f64::from(rgba.height()) * scale).round(),
                )?;
                imageops::resize(&rgba, width, height, imageops::FilterType::Triangle)
            };

            Ok(match rotation {
                Some(degrees) => rotate_image(&scaled, degrees),
                None => scaled,
            })
        }
    }
}
