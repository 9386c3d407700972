//! Raster render backend.
//!
//! Decodes the target image, rasterizes every enabled record, resolves its
//! placements and composites the layers in batch order before re-encoding
//! in the target's own format.

use std::path::PathBuf;
use std::sync::Arc;

use image::DynamicImage;

use super::{rasterize_record, FontProvider, RenderBackend, RenderTarget};
use crate::codec::{FormatTag, ImageCodec};
use crate::error::WatermarkError;
use crate::executor::TaskExecutor;
use crate::watermark::compositor::Compositor;
use crate::watermark::position::{CanvasDimensions, PositionResolver, WatermarkDimensions};
use crate::watermark::WatermarkAttributes;

/// Burns watermarks into PNG, JPEG, TIFF and BMP images.
#[derive(Debug, Default)]
pub struct RasterRenderBackend {
    codec: ImageCodec,
    fonts: FontProvider,
}

impl RasterRenderBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific font file for text watermarks.
    pub fn with_font_path(mut self, path: Option<PathBuf>) -> Self {
        self.fonts = FontProvider::new(path);
        self
    }
}

impl RenderBackend for RasterRenderBackend {
    fn name(&self) -> &'static str {
        "raster"
    }

    fn supports(&self, format: FormatTag) -> bool {
        !format.is_document()
    }

    fn render(
        &self,
        batch: &[Arc<WatermarkAttributes>],
        target: &RenderTarget,
        _executor: &Arc<dyn TaskExecutor>,
    ) -> Result<Vec<u8>, WatermarkError> {
        if !self.supports(target.format) {
            return Err(WatermarkError::unsupported_format(format!(
                "raster backend cannot render {} targets",
                target.format
            )));
        }

        let decoded = self.codec.decode_as(&target.bytes, target.format)?;
        let mut canvas = decoded.to_rgba8();
        let resolver = PositionResolver::new(CanvasDimensions::new(
            canvas.width() as f32,
            canvas.height() as f32,
        ));

        let mut compositor = Compositor::new();
        for (index, record) in batch.iter().enumerate() {
            if !record.enabled {
                tracing::debug!(index, "Skipping disabled watermark");
                continue;
            }

            let artwork = rasterize_record(record, 1.0, &self.fonts, true)?;
            let dimensions =
                WatermarkDimensions::new(artwork.width() as f32, artwork.height() as f32);
            let placements = resolver.resolve(
                record.position,
                record.adjustment,
                record.horizontal_spacing,
                record.vertical_spacing,
                &dimensions,
            );

            compositor.add_placements(&artwork, placements, record.opacity_fraction());
        }

        tracing::debug!(
            layers = compositor.layer_count(),
            width = canvas.width(),
            height = canvas.height(),
            "Compositing raster watermarks"
        );
        compositor.apply(&mut canvas);

        self.codec
            .encode(&DynamicImage::ImageRgba8(canvas), target.format)
    }
}
