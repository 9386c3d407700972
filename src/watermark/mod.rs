//! Watermark construction and placement.
//!
//! Callers describe one or more watermarks through a [`WatermarkBuilder`],
//! each one validated and frozen into the batch on `and()`. `apply()` hands
//! the whole batch to a [`RenderDispatcher`], which runs the format's render
//! backend once.
//!
//! # Features
//!
//! - **Text watermarks** with color, size, trademark sign and rotation
//! - **Image watermarks** from bytes, files or decoded images
//! - **11 positioning modes**: 9-grid, tiled and absolute coordinates
//! - **Filters** restricting document watermarks to some documents or pages
//! - **Config replay** of YAML definitions onto a builder
//!
//! # Configuration Example
//!
//! ```yaml
//! watermarks:
//!   - type: text
//!     text: "DRAFT"
//!     opacity: 25
//!     position: tiled
//!   - type: image
//!     path: "logo.png"
//!     position: top-left
//! ```

pub mod attributes;
pub mod builder;
pub mod compositor;
pub mod config;
pub mod dispatcher;
pub mod position;
pub mod text_renderer;
pub mod validator;

// Re-export main types for convenience
pub use attributes::{
    DocumentFilter, PageFilter, WatermarkAttributes, WatermarkKind, WatermarkingMethod,
};
pub use builder::{ImageSource, PositionStage, WatermarkBuilder};
pub use compositor::{Compositor, WatermarkLayer};
pub use config::{
    apply_definitions, ImageWatermarkConfig, LayoutConfig, TextWatermarkConfig,
    WatermarkDefinition,
};
pub use dispatcher::RenderDispatcher;
pub use position::{
    calculate_position, calculate_tiled_positions, clamp_to_canvas, Adjustment,
    CanvasDimensions, PlacementPosition, PositionResolver, WatermarkDimensions,
    WatermarkPosition,
};
pub use text_renderer::{parse_hex_color, Color, TextRenderOptions, TextRenderer};
pub use validator::validate;
