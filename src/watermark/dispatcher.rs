//! Hands a committed batch to a render backend.

use std::fmt;
use std::sync::Arc;

use crate::backend::{RenderBackend, RenderTarget};
use crate::codec::FormatTag;
use crate::error::WatermarkError;
use crate::executor::{InlineExecutor, TaskExecutor};
use crate::watermark::WatermarkAttributes;

/// Sends a whole batch to one backend in a single call.
///
/// The dispatcher never touches the source handle; releasing it is the
/// builder's job.
pub struct RenderDispatcher {
    backend: Box<dyn RenderBackend>,
    executor: Arc<dyn TaskExecutor>,
}

impl fmt::Debug for RenderDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderDispatcher")
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl RenderDispatcher {
    /// Dispatcher running backend work inline on the calling thread.
    pub fn new(backend: Box<dyn RenderBackend>) -> Self {
        Self {
            backend,
            executor: Arc::new(InlineExecutor),
        }
    }

    /// Run per-page backend work on `executor`.
    pub fn with_executor(mut self, executor: Arc<dyn TaskExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn supports(&self, format: FormatTag) -> bool {
        self.backend.supports(format)
    }

    /// Render `batch` onto `target`.
    ///
    /// Any failure coming out of the backend is reported as `Render`, with
    /// the backend's own error kept as the source.
    pub fn render_all(
        &self,
        batch: Vec<Arc<WatermarkAttributes>>,
        target: &RenderTarget,
    ) -> Result<Vec<u8>, WatermarkError> {
        let span = tracing::info_span!(
            "render",
            backend = self.backend.name(),
            format = %target.format,
            batch_len = batch.len()
        );
        let _enter = span.enter();

        match self.backend.render(&batch, target, &self.executor) {
            Ok(bytes) => {
                tracing::info!(output_bytes = bytes.len(), "Watermarks rendered");
                Ok(bytes)
            }
            Err(err @ WatermarkError::Render { .. }) => {
                tracing::error!(error = %err, "Render backend failed");
                Err(err)
            }
            Err(err) => {
                tracing::error!(error = %err, "Render backend failed");
                Err(WatermarkError::render_with(
                    format!("{} backend failed", self.backend.name()),
                    err,
                ))
            }
        }
    }
}
