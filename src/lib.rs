// Markit watermarking library

pub mod backend;
pub mod codec;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod service;
pub mod source;
pub mod watermark;

pub use codec::FormatTag;
pub use error::WatermarkError;
pub use service::WatermarkService;
pub use watermark::{WatermarkBuilder, WatermarkPosition};
