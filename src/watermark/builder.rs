//! Staged fluent construction of watermark batches.
//!
//! A [`WatermarkBuilder`] is bound to one target. It keeps a mutable draft
//! record plus the batch of committed records:
//!
//! ```text
//! setters ──▶ draft ──and()──▶ validate ──▶ batch.push(Arc<record>)
//!                                   │
//!                                   └─ error: draft discarded, batch unchanged
//! apply() = final and() + dispatch + release source
//! ```
//!
//! # Example
//!
//! ```no_run
//! use markit::service::WatermarkService;
//! use markit::watermark::WatermarkPosition;
//!
//! # fn main() -> Result<(), markit::WatermarkError> {
//! let service = WatermarkService::new();
//! let mut builder = service.watermark_pdf_file("contract.pdf")?;
//! builder
//!     .with_text("CONFIDENTIAL")?
//!     .opacity(30)
//!     .rotation(45)
//!     .position(WatermarkPosition::Center)
//!     .end()
//!     .and()?
//!     .with_text("ACME")?
//!     .add_trademark()
//!     .position(WatermarkPosition::BottomRight)
//!     .adjust(-20, -20)
//!     .end();
//! builder.apply_to_path("contract-marked.pdf")?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;

use super::attributes::{DocumentFilter, PageFilter, WatermarkAttributes, WatermarkKind, WatermarkingMethod};
use super::dispatcher::RenderDispatcher;
use super::position::{Adjustment, WatermarkPosition};
use super::text_renderer::{parse_hex_color, Color};
use super::validator;
use crate::backend::RenderTarget;
use crate::codec::{FormatTag, ImageCodec};
use crate::error::WatermarkError;
use crate::source::SourceHandle;

/// Where the pixels of an image watermark come from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Encoded image bytes (PNG, JPEG, TIFF or BMP)
    Bytes(Vec<u8>),
    /// An already decoded image
    Decoded(DynamicImage),
    /// An image file on disk
    Path(PathBuf),
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        ImageSource::Bytes(bytes)
    }
}

impl From<&[u8]> for ImageSource {
    fn from(bytes: &[u8]) -> Self {
        ImageSource::Bytes(bytes.to_vec())
    }
}

impl From<DynamicImage> for ImageSource {
    fn from(image: DynamicImage) -> Self {
        ImageSource::Decoded(image)
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        ImageSource::Path(path.to_path_buf())
    }
}

/// Fluent builder for a batch of watermarks on one target.
pub struct WatermarkBuilder {
    format: FormatTag,
    source: Option<Box<dyn SourceHandle>>,
    bytes: Vec<u8>,
    dispatcher: RenderDispatcher,
    codec: ImageCodec,
    current: WatermarkAttributes,
    touched: bool,
    batch: Vec<Arc<WatermarkAttributes>>,
}

impl fmt::Debug for WatermarkBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatermarkBuilder")
            .field("format", &self.format)
            .field("dispatcher", &self.dispatcher)
            .field("current", &self.current)
            .field("batch_len", &self.batch.len())
            .finish()
    }
}

impl WatermarkBuilder {
    /// Bind a builder to a source.
    ///
    /// The source is read immediately. If reading fails, or the dispatcher
    /// cannot render `format`, the source is released before returning.
    pub fn new(
        mut source: Box<dyn SourceHandle>,
        format: FormatTag,
        dispatcher: RenderDispatcher,
    ) -> Result<Self, WatermarkError> {
        let setup = if dispatcher.supports(format) {
            source
                .read()
                .map_err(|e| WatermarkError::decode(format!("source {}", source.describe()), e))
        } else {
            Err(WatermarkError::unsupported_format(format!(
                "{} backend cannot render {} targets",
                dispatcher.backend_name(),
                format
            )))
        };

        let bytes = match setup {
            Ok(bytes) => bytes,
            Err(err) => {
                if let Err(close_err) = source.close() {
                    tracing::warn!(error = %close_err, "Failed to release source after setup error");
                }
                return Err(err);
            }
        };

        tracing::debug!(
            format = %format,
            backend = dispatcher.backend_name(),
            source = %source.describe(),
            "Watermark target selected"
        );

        Ok(Self {
            format,
            source: Some(source),
            bytes,
            dispatcher,
            codec: ImageCodec::new(),
            current: WatermarkAttributes::new(format.default_method()),
            touched: false,
            batch: Vec::new(),
        })
    }

    pub fn format(&self) -> FormatTag {
        self.format
    }

    /// Contents read from the source.
    pub fn target_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Records committed so far, in application order.
    pub fn batch(&self) -> &[Arc<WatermarkAttributes>] {
        &self.batch
    }

    /// The record currently being configured.
    pub fn current(&self) -> &WatermarkAttributes {
        &self.current
    }

    fn touch(&mut self) -> &mut WatermarkAttributes {
        self.touched = true;
        &mut self.current
    }

    fn ensure_no_content(&self) -> Result<(), WatermarkError> {
        if self.current.text.is_some() || self.current.image.is_some() {
            return Err(WatermarkError::invalid_input(
                "this watermark already has content; call and() to start a new one",
            ));
        }
        Ok(())
    }

    fn ensure_document_target(&self, what: &str) -> Result<(), WatermarkError> {
        if !self.format.is_document() {
            return Err(WatermarkError::invalid_input(format!(
                "{} is only available for document targets, not {}",
                what, self.format
            )));
        }
        Ok(())
    }

    /// Make the current watermark a text watermark.
    ///
    /// Fails with `InvalidInput` for empty text or when the current
    /// watermark already has content. Whitespace-only text is accepted here
    /// and rejected when the watermark is committed.
    pub fn with_text(&mut self, text: impl Into<String>) -> Result<&mut Self, WatermarkError> {
        let text = text.into();
        if text.is_empty() {
            return Err(WatermarkError::invalid_input("watermark text is empty"));
        }
        self.ensure_no_content()?;

        let record = self.touch();
        record.kind = WatermarkKind::Text;
        record.text = Some(text);
        Ok(self)
    }

    /// Make the current watermark an image watermark.
    ///
    /// Bytes and files are decoded right away.
    pub fn with_image(&mut self, image: impl Into<ImageSource>) -> Result<&mut Self, WatermarkError> {
        self.ensure_no_content()?;

        let decoded = match image.into() {
            ImageSource::Bytes(bytes) if bytes.is_empty() => {
                return Err(WatermarkError::invalid_input("watermark image bytes are empty"));
            }
            ImageSource::Bytes(bytes) => self.codec.decode(&bytes)?,
            ImageSource::Decoded(image) => image,
            ImageSource::Path(path) => self.codec.decode_file(&path)?,
        };

        let record = self.touch();
        record.kind = WatermarkKind::Image;
        record.image = Some(Arc::new(decoded));
        Ok(self)
    }

    pub fn color(&mut self, color: Color) -> &mut Self {
        self.touch().color = color;
        self
    }

    /// Set the color from `#RGB` or `#RRGGBB`.
    pub fn color_hex(&mut self, hex: &str) -> Result<&mut Self, WatermarkError> {
        let color = parse_hex_color(hex)?;
        Ok(self.color(color))
    }

    /// Font point size for text, scale percent for images.
    pub fn size(&mut self, size: i32) -> &mut Self {
        self.touch().size = Some(size);
        self
    }

    /// Opacity in percent, 0 to 100.
    pub fn opacity(&mut self, opacity: i32) -> &mut Self {
        self.touch().opacity = opacity;
        self
    }

    /// Counter-clockwise rotation in degrees.
    pub fn rotation(&mut self, degrees: i32) -> &mut Self {
        self.touch().rotation = degrees;
        self
    }

    /// Resolution used when the watermark is rasterized for a document.
    pub fn dpi(&mut self, dpi: f32) -> &mut Self {
        self.touch().dpi = dpi;
        self
    }

    pub fn add_trademark(&mut self) -> &mut Self {
        self.touch().trademark = true;
        self
    }

    /// Keep the watermark in the batch but only paint it when `condition`
    /// holds.
    pub fn enable_if(&mut self, condition: bool) -> &mut Self {
        self.touch().enabled = condition;
        self
    }

    pub fn method(&mut self, method: WatermarkingMethod) -> &mut Self {
        self.touch().method = method;
        self
    }

    /// Restrict the watermark to documents accepted by `filter`.
    pub fn document_filter<F>(&mut self, filter: F) -> Result<&mut Self, WatermarkError>
    where
        F: DocumentFilter + 'static,
    {
        self.ensure_document_target("document_filter")?;
        self.touch().document_filter = Some(Arc::new(filter));
        Ok(self)
    }

    /// Restrict the watermark to pages (zero-based) accepted by `filter`.
    pub fn page_filter<F>(&mut self, filter: F) -> Result<&mut Self, WatermarkError>
    where
        F: PageFilter + 'static,
    {
        self.ensure_document_target("page_filter")?;
        self.touch().page_filter = Some(Arc::new(filter));
        Ok(self)
    }

    /// Anchor the watermark and open the position refinement stage.
    pub fn position(&mut self, position: WatermarkPosition) -> PositionStage<'_> {
        self.touch().position = position;
        PositionStage { builder: self }
    }

    /// Place the watermark's top-left corner at absolute coordinates.
    pub fn position_at(&mut self, x: i32, y: i32) -> PositionStage<'_> {
        self.position(WatermarkPosition::Custom { x, y })
    }

    /// Validate the current watermark and append it to the batch.
    ///
    /// On failure the current watermark is discarded and the batch is left
    /// unchanged. Either way a fresh watermark is started.
    pub fn and(&mut self) -> Result<&mut Self, WatermarkError> {
        self.commit()?;
        Ok(self)
    }

    fn fresh_record(&self) -> WatermarkAttributes {
        WatermarkAttributes::new(self.format.default_method())
    }

    fn commit(&mut self) -> Result<(), WatermarkError> {
        let fresh = self.fresh_record();
        let record = std::mem::replace(&mut self.current, fresh);
        self.touched = false;

        if let Err(err) = validator::validate(&record, self.format) {
            tracing::warn!(
                kind = ?record.kind,
                batch_len = self.batch.len(),
                format = %self.format,
                error = %err,
                "Watermark rejected"
            );
            return Err(err);
        }

        self.batch.push(Arc::new(record));
        tracing::debug!(
            batch_len = self.batch.len(),
            format = %self.format,
            "Watermark committed"
        );
        Ok(())
    }

    fn release_source(&mut self) -> std::io::Result<()> {
        match self.source.take() {
            Some(mut source) => source.close(),
            None => Ok(()),
        }
    }

    fn render(&mut self) -> Result<Vec<u8>, WatermarkError> {
        if self.touched || self.batch.is_empty() {
            self.commit()?;
        }

        let batch = std::mem::take(&mut self.batch);
        let target = RenderTarget::new(std::mem::take(&mut self.bytes), self.format);
        self.dispatcher.render_all(batch, &target)
    }

    /// Commit the current watermark if needed, render the batch and
    /// release the source.
    ///
    /// If rendering succeeds but the source cannot be released, the error is
    /// `ResourceClose` and still carries the rendered output.
    pub fn apply(mut self) -> Result<Vec<u8>, WatermarkError> {
        let rendered = self.render();

        match (rendered, self.release_source()) {
            (Ok(bytes), Ok(())) => Ok(bytes),
            (Ok(bytes), Err(source)) => {
                tracing::error!(error = %source, "Failed to release watermark source");
                Err(WatermarkError::ResourceClose {
                    rendered: bytes,
                    source,
                })
            }
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(close_err)) => {
                tracing::error!(error = %close_err, "Failed to release watermark source");
                Err(err)
            }
        }
    }

    /// Render and write the result to `path`.
    pub fn apply_to_path(self, path: impl AsRef<Path>) -> Result<PathBuf, WatermarkError> {
        let path = path.as_ref().to_path_buf();
        match self.apply() {
            Ok(bytes) => {
                write_output(&path, &bytes)?;
                Ok(path)
            }
            Err(WatermarkError::ResourceClose { rendered, source }) => {
                write_output(&path, &rendered)?;
                Err(WatermarkError::ResourceClose { rendered, source })
            }
            Err(err) => Err(err),
        }
    }

    /// Render and write the result to `dir/file_name`, creating `dir` if
    /// needed.
    pub fn apply_to_dir(
        self,
        dir: impl AsRef<Path>,
        file_name: &str,
    ) -> Result<PathBuf, WatermarkError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|source| WatermarkError::Save {
            path: dir.to_path_buf(),
            source,
        })?;
        self.apply_to_path(dir.join(file_name))
    }
}

impl Drop for WatermarkBuilder {
    fn drop(&mut self) {
        if let Err(err) = self.release_source() {
            tracing::warn!(error = %err, "Failed to release watermark source on drop");
        }
    }
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<(), WatermarkError> {
    std::fs::write(path, bytes).map_err(|source| WatermarkError::Save {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "Watermarked output saved");
    Ok(())
}

/// Position refinements for the current watermark.
///
/// Every refinement is optional; [`PositionStage::end`] returns to the
/// builder.
pub struct PositionStage<'a> {
    builder: &'a mut WatermarkBuilder,
}

impl<'a> PositionStage<'a> {
    /// Offset the anchored position by `(dx, dy)` pixels.
    pub fn adjust(self, dx: i32, dy: i32) -> Self {
        self.builder.touch().adjustment = Adjustment::new(dx, dy);
        self
    }

    /// Gap between tile rows.
    pub fn vertical_spacing(self, spacing: i32) -> Self {
        self.builder.touch().vertical_spacing = spacing;
        self
    }

    /// Gap between tile columns.
    pub fn horizontal_spacing(self, spacing: i32) -> Self {
        self.builder.touch().horizontal_spacing = spacing;
        self
    }

    pub fn end(self) -> &'a mut WatermarkBuilder {
        self.builder
    }
}
