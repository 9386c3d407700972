//! Target selection.
//!
//! [`WatermarkService`] is the entry point: it names the target format,
//! checks the source looks like that format, and returns a
//! [`WatermarkBuilder`] bound to the matching render backend.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::backend::default_backend;
use crate::codec::{detect_format, is_pdf, FormatTag};
use crate::config::Config;
use crate::error::WatermarkError;
use crate::executor::{build_thread_pool, InlineExecutor, TaskExecutor};
use crate::source::{BytesSource, FileSource, SourceHandle};
use crate::watermark::{RenderDispatcher, WatermarkBuilder};

/// Creates builders for PDF and raster targets.
#[derive(Clone)]
pub struct WatermarkService {
    font_path: Option<PathBuf>,
    executor: Arc<dyn TaskExecutor>,
}

impl fmt::Debug for WatermarkService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatermarkService")
            .field("font_path", &self.font_path)
            .finish()
    }
}

impl Default for WatermarkService {
    fn default() -> Self {
        Self::new()
    }
}

impl WatermarkService {
    /// Service rendering on the calling thread with the discovered font.
    pub fn new() -> Self {
        Self {
            font_path: None,
            executor: Arc::new(InlineExecutor),
        }
    }

    /// Build a service from loaded configuration.
    ///
    /// `worker_threads` creates a dedicated render pool owned by the
    /// service.
    pub fn from_config(config: &Config) -> Result<Self, WatermarkError> {
        let mut service = Self::new().with_font_path(config.font_path.clone());
        if let Some(threads) = config.worker_threads {
            let pool = build_thread_pool(threads)?;
            tracing::info!(threads, "Render thread pool created");
            service = service.with_executor(Arc::new(pool));
        }
        Ok(service)
    }

    /// Font file used for raster text.
    pub fn with_font_path(mut self, path: Option<PathBuf>) -> Self {
        self.font_path = path;
        self
    }

    /// Executor for per-page document work.
    pub fn with_executor(mut self, executor: Arc<dyn TaskExecutor>) -> Self {
        self.executor = executor;
        self
    }

    fn dispatcher(&self, format: FormatTag) -> RenderDispatcher {
        RenderDispatcher::new(default_backend(format, self.font_path.clone()))
            .with_executor(Arc::clone(&self.executor))
    }

    /// Bind `source` to the format named by `tag`.
    ///
    /// Accepted tags are `pdf`, `png`, `jpeg`/`jpg`, `tiff`/`tif` and `bmp`.
    /// Any other tag fails with `UnsupportedFormat` before the source is
    /// read. The source is released on every error path.
    pub fn select_target_format(
        &self,
        mut source: Box<dyn SourceHandle>,
        tag: &str,
    ) -> Result<WatermarkBuilder, WatermarkError> {
        let format = match tag.parse::<FormatTag>() {
            Ok(format) => format,
            Err(err) => {
                tracing::warn!(tag, "Unsupported target format requested");
                if let Err(close_err) = source.close() {
                    tracing::warn!(error = %close_err, "Failed to release source");
                }
                return Err(err);
            }
        };
        self.select(source, format)
    }

    /// Bind `source` to `format`.
    pub fn select(
        &self,
        source: Box<dyn SourceHandle>,
        format: FormatTag,
    ) -> Result<WatermarkBuilder, WatermarkError> {
        let builder = WatermarkBuilder::new(source, format, self.dispatcher(format))?;
        // On error the builder is dropped here, which releases the source.
        check_content(format, builder.target_bytes())?;
        Ok(builder)
    }

    pub fn watermark_pdf(&self, bytes: impl Into<Vec<u8>>) -> Result<WatermarkBuilder, WatermarkError> {
        self.select(Box::new(BytesSource::new(bytes)), FormatTag::Pdf)
    }

    pub fn watermark_pdf_file(&self, path: impl AsRef<Path>) -> Result<WatermarkBuilder, WatermarkError> {
        self.select(open_file(path.as_ref())?, FormatTag::Pdf)
    }

    /// Bind an in-memory raster image.
    pub fn watermark_image(
        &self,
        bytes: impl Into<Vec<u8>>,
        format: FormatTag,
    ) -> Result<WatermarkBuilder, WatermarkError> {
        if format.is_document() {
            return Err(WatermarkError::unsupported_format(format!(
                "{} is not a raster image format",
                format
            )));
        }
        self.select(Box::new(BytesSource::new(bytes)), format)
    }

    /// Bind a raster image file; the format comes from its extension.
    pub fn watermark_image_file(&self, path: impl AsRef<Path>) -> Result<WatermarkBuilder, WatermarkError> {
        let path = path.as_ref();
        let format = FormatTag::from_path(path)?;
        if format.is_document() {
            return Err(WatermarkError::unsupported_format(format!(
                "'{}' is not a raster image",
                path.display()
            )));
        }
        self.select(open_file(path)?, format)
    }

    /// Bind a buffer whose format is sniffed from its magic bytes.
    pub fn watermark_detected(&self, bytes: impl Into<Vec<u8>>) -> Result<WatermarkBuilder, WatermarkError> {
        let bytes = bytes.into();
        let format = detect_format(&bytes)?;
        tracing::debug!(format = %format, "Detected target format");
        self.select(Box::new(BytesSource::new(bytes)), format)
    }

    /// Bind a file whose format is sniffed from its contents.
    pub fn watermark_detected_file(&self, path: impl AsRef<Path>) -> Result<WatermarkBuilder, WatermarkError> {
        let mut source = open_file(path.as_ref())?;
        let sniffed = source
            .read()
            .map_err(|e| WatermarkError::decode(format!("file '{}'", path.as_ref().display()), e))
            .and_then(|bytes| detect_format(&bytes));

        match sniffed {
            Ok(format) => self.select(source, format),
            Err(err) => {
                if let Err(close_err) = source.close() {
                    tracing::warn!(error = %close_err, "Failed to release source");
                }
                Err(err)
            }
        }
    }
}

fn open_file(path: &Path) -> Result<Box<dyn SourceHandle>, WatermarkError> {
    let source = FileSource::open(path)
        .map_err(|e| WatermarkError::decode(format!("file '{}'", path.display()), e))?;
    Ok(Box::new(source))
}

/// Cheap signature check so obviously wrong content fails at selection
/// rather than at render time.
fn check_content(format: FormatTag, bytes: &[u8]) -> Result<(), WatermarkError> {
    if format.is_document() {
        if !is_pdf(bytes) {
            return Err(WatermarkError::decode("pdf document", "missing %PDF- header"));
        }
        return Ok(());
    }

    let sniffed = detect_format(bytes).map_err(|e| WatermarkError::decode(format!("{} image", format), e))?;
    if sniffed != format {
        return Err(WatermarkError::decode(
            format!("{} image", format),
            format!("content is {}", sniffed),
        ));
    }
    Ok(())
}
