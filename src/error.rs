//! Error types for the watermarking pipeline.
//!
//! Every fallible operation in the crate returns [`WatermarkError`]. The
//! variants fall into four groups:
//!
//! - **Input errors** raised immediately by a builder setter (`InvalidInput`)
//! - **Validation errors** raised when a watermark is committed (`EmptyText`,
//!   `InvalidImage`, `OutOfRange`, `UnsupportedMethod`); the batch is left
//!   untouched
//! - **Selection errors** raised when a target is bound (`UnsupportedFormat`,
//!   `Decode`)
//! - **Pipeline errors** raised by the terminal `apply` family (`Render`,
//!   `Save`, `ResourceClose`), always wrapping the root cause

use std::path::PathBuf;

use thiserror::Error;

use crate::codec::FormatTag;
use crate::watermark::WatermarkingMethod;

/// Boxed error used to carry backend and codec causes.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while building, validating or rendering watermarks.
#[derive(Debug, Error)]
pub enum WatermarkError {
    /// A setter received an empty or otherwise unusable argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A text watermark was committed without visible text
    #[error("Watermark text cannot be empty")]
    EmptyText,

    /// An image watermark was committed without usable image data
    #[error("Invalid watermark image: {0}")]
    InvalidImage(String),

    /// A numeric attribute is outside its accepted range
    #[error("Value out of range for '{field}': {message}")]
    OutOfRange {
        field: &'static str,
        message: String,
    },

    /// The watermarking method cannot be used with the target format
    #[error("Watermarking method '{method}' is not supported for {format} targets")]
    UnsupportedMethod {
        method: WatermarkingMethod,
        format: FormatTag,
    },

    /// The target or image format is unknown or has no codec
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Source bytes could not be read or decoded
    #[error("Failed to decode {what}: {source}")]
    Decode {
        what: String,
        #[source]
        source: BoxError,
    },

    /// The render backend failed
    #[error("Failed to render watermarks: {message}")]
    Render {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Writing the rendered output to its destination failed
    #[error("Failed to save watermarked output to '{}'", .path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Releasing the source failed after a successful render.
    ///
    /// The rendered output is kept so the caller can still use it.
    #[error("Failed to release the watermarking source: {source}")]
    ResourceClose {
        rendered: Vec<u8>,
        #[source]
        source: std::io::Error,
    },
}

impl WatermarkError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        WatermarkError::InvalidInput(message.into())
    }

    pub fn out_of_range(field: &'static str, message: impl Into<String>) -> Self {
        WatermarkError::OutOfRange {
            field,
            message: message.into(),
        }
    }

    pub fn unsupported_format(format: impl Into<String>) -> Self {
        WatermarkError::UnsupportedFormat(format.into())
    }

    pub fn decode(what: impl Into<String>, source: impl Into<BoxError>) -> Self {
        WatermarkError::Decode {
            what: what.into(),
            source: source.into(),
        }
    }

    pub fn render(message: impl Into<String>) -> Self {
        WatermarkError::Render {
            message: message.into(),
            source: None,
        }
    }

    pub fn render_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        WatermarkError::Render {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// True for errors raised when committing a watermark.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            WatermarkError::EmptyText
                | WatermarkError::InvalidImage(_)
                | WatermarkError::OutOfRange { .. }
                | WatermarkError::UnsupportedMethod { .. }
        )
    }

    /// Recover the rendered output carried by a [`WatermarkError::ResourceClose`].
    pub fn into_rendered(self) -> Option<Vec<u8>> {
        match self {
            WatermarkError::ResourceClose { rendered, .. } => Some(rendered),
            _ => None,
        }
    }
}
