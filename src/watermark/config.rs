//! Watermark definitions loaded from configuration.
//!
//! A definition mirrors the builder setters so a YAML list can be replayed
//! onto a [`WatermarkBuilder`]:
//!
//! ```yaml
//! watermarks:
//!   - type: text
//!     text: "CONFIDENTIAL"
//!     color: "#FF0000"
//!     opacity: 30
//!     rotation: 45
//!     position: tiled
//!   - type: image
//!     path: "assets/logo.png"
//!     size: 50
//!     position: bottom-right
//!     adjust: { dx: -20, dy: -20 }
//!     pages: [0]
//! ```

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::attributes::{
    WatermarkingMethod, DEFAULT_DPI, DEFAULT_OPACITY, DEFAULT_SPACING,
};
use super::builder::WatermarkBuilder;
use super::position::{Adjustment, WatermarkPosition};
use super::text_renderer::parse_hex_color;
use crate::error::WatermarkError;

fn default_color() -> String {
    "#000000".to_string()
}

fn default_opacity() -> i32 {
    DEFAULT_OPACITY
}

fn default_dpi() -> f32 {
    DEFAULT_DPI
}

fn default_spacing() -> i32 {
    DEFAULT_SPACING
}

fn default_enabled() -> bool {
    true
}

/// Watermark definition - either text or image.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WatermarkDefinition {
    Text(TextWatermarkConfig),
    Image(ImageWatermarkConfig),
}

/// Text watermark configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextWatermarkConfig {
    pub text: String,

    /// Text color as hex string (default: "#000000")
    #[serde(default = "default_color")]
    pub color: String,

    /// Append the trademark sign
    #[serde(default)]
    pub trademark: bool,

    #[serde(flatten)]
    pub layout: LayoutConfig,
}

/// Image watermark configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageWatermarkConfig {
    /// Image file (PNG, JPEG, TIFF or BMP)
    pub path: PathBuf,

    #[serde(flatten)]
    pub layout: LayoutConfig,
}

/// Settings shared by text and image watermarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Font size in points for text, scale percent for images
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i32>,

    /// Opacity percent, 0 to 100 (default: 50)
    #[serde(default = "default_opacity")]
    pub opacity: i32,

    /// Counter-clockwise rotation in degrees
    #[serde(default)]
    pub rotation: i32,

    #[serde(default = "default_dpi")]
    pub dpi: f32,

    /// `draw` or `overlay`; the target format decides when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<WatermarkingMethod>,

    /// Anchor name, `tiled`, or `{ custom: { x, y } }`
    #[serde(default, with = "serde_yaml::with::singleton_map")]
    pub position: WatermarkPosition,

    #[serde(default)]
    pub adjust: Adjustment,

    /// Gap between tile rows (tiled position only)
    #[serde(default = "default_spacing")]
    pub vertical_spacing: i32,

    /// Gap between tile columns (tiled position only)
    #[serde(default = "default_spacing")]
    pub horizontal_spacing: i32,

    /// Zero-based page indexes to watermark; all pages when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<usize>>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            size: None,
            opacity: DEFAULT_OPACITY,
            rotation: 0,
            dpi: DEFAULT_DPI,
            method: None,
            position: WatermarkPosition::default(),
            adjust: Adjustment::default(),
            vertical_spacing: DEFAULT_SPACING,
            horizontal_spacing: DEFAULT_SPACING,
            pages: None,
            enabled: true,
        }
    }
}

impl LayoutConfig {
    fn validate(&self) -> Result<(), String> {
        if let Some(size) = self.size {
            if size <= 0 {
                return Err(format!("size must be greater than 0, got {}", size));
            }
        }

        if !(0..=100).contains(&self.opacity) {
            return Err(format!(
                "opacity must be between 0 and 100, got {}",
                self.opacity
            ));
        }

        if !self.dpi.is_finite() || self.dpi <= 0.0 {
            return Err(format!("dpi must be a positive number, got {}", self.dpi));
        }

        if self.position.is_tiled() && (self.vertical_spacing < 0 || self.horizontal_spacing < 0) {
            return Err(format!(
                "tile spacing cannot be negative, got vertical {} and horizontal {}",
                self.vertical_spacing, self.horizontal_spacing
            ));
        }

        if let Some(pages) = &self.pages {
            if pages.is_empty() {
                return Err("pages list cannot be empty; omit it to mark every page".to_string());
            }
        }

        Ok(())
    }

    fn apply_to(&self, builder: &mut WatermarkBuilder) -> Result<(), WatermarkError> {
        if let Some(size) = self.size {
            builder.size(size);
        }
        if let Some(method) = self.method {
            builder.method(method);
        }
        builder
            .opacity(self.opacity)
            .rotation(self.rotation)
            .dpi(self.dpi)
            .enable_if(self.enabled)
            .position(self.position)
            .adjust(self.adjust.dx, self.adjust.dy)
            .vertical_spacing(self.vertical_spacing)
            .horizontal_spacing(self.horizontal_spacing)
            .end();

        if let Some(pages) = &self.pages {
            let pages: BTreeSet<usize> = pages.iter().copied().collect();
            builder.page_filter(move |index: usize| pages.contains(&index))?;
        }

        Ok(())
    }
}

impl TextWatermarkConfig {
    /// Validate the text watermark configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.text.trim().is_empty() {
            return Err("Text watermark 'text' field cannot be empty".to_string());
        }

        parse_hex_color(&self.color).map_err(|_| {
            format!(
                "Text watermark color must be in #RGB or #RRGGBB format, got '{}'",
                self.color
            )
        })?;

        self.layout
            .validate()
            .map_err(|e| format!("Text watermark {}", e))
    }
}

impl ImageWatermarkConfig {
    /// Validate the image watermark configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.path.as_os_str().is_empty() {
            return Err("Image watermark 'path' field cannot be empty".to_string());
        }

        self.layout
            .validate()
            .map_err(|e| format!("Image watermark {}", e))
    }
}

impl WatermarkDefinition {
    /// Validate the watermark definition.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Text(config) => config.validate(),
            Self::Image(config) => config.validate(),
        }
    }

    pub fn layout(&self) -> &LayoutConfig {
        match self {
            Self::Text(config) => &config.layout,
            Self::Image(config) => &config.layout,
        }
    }

    /// Configure the builder's current watermark from this definition.
    ///
    /// The watermark is not committed; call `and()` or `apply()` afterwards.
    pub fn apply_to(&self, builder: &mut WatermarkBuilder) -> Result<(), WatermarkError> {
        match self {
            Self::Text(config) => {
                builder.with_text(config.text.as_str())?.color_hex(&config.color)?;
                if config.trademark {
                    builder.add_trademark();
                }
            }
            Self::Image(config) => {
                builder.with_image(config.path.as_path())?;
            }
        }
        self.layout().apply_to(builder)
    }
}

/// Replay `definitions` onto `builder`, committing each one.
pub fn apply_definitions(
    definitions: &[WatermarkDefinition],
    builder: &mut WatermarkBuilder,
) -> Result<(), WatermarkError> {
    for (index, definition) in definitions.iter().enumerate() {
        definition.apply_to(builder)?;
        builder.and()?;
        tracing::debug!(index, "Configured watermark added to batch");
    }
    Ok(())
}
