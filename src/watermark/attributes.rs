//! The per-watermark attribute record.
//!
//! A [`WatermarkAttributes`] value is the draft the builder mutates. Once it
//! passes validation it is frozen behind an `Arc` and appended to the batch,
//! so backends and worker tasks share it without copying.

use std::fmt;
use std::sync::Arc;

use image::DynamicImage;
use lopdf::Document;
use serde::{Deserialize, Serialize};

use super::position::{Adjustment, WatermarkPosition};
use super::text_renderer::Color;

/// Font point size used for text watermarks when none is set.
pub const DEFAULT_TEXT_SIZE: i32 = 30;
/// Scale percent used for image watermarks when none is set.
pub const DEFAULT_IMAGE_SCALE: i32 = 100;
pub const DEFAULT_OPACITY: i32 = 50;
pub const DEFAULT_DPI: f32 = 300.0;
pub const DEFAULT_SPACING: i32 = 50;

/// Trademark sign appended by [`WatermarkAttributes::trademark`].
pub const TRADEMARK_SIGN: char = '\u{2122}';

/// What a watermark paints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkKind {
    #[default]
    Text,
    Image,
}

/// How a watermark is applied to its target.
///
/// `Draw` burns the watermark into pixels (for documents: a rasterized image
/// at the record's dpi). `Overlay` adds a separate vector layer and only
/// exists for paged documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkingMethod {
    Draw,
    Overlay,
}

impl fmt::Display for WatermarkingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatermarkingMethod::Draw => f.write_str("draw"),
            WatermarkingMethod::Overlay => f.write_str("overlay"),
        }
    }
}

/// Decides whether a whole document receives a watermark.
pub trait DocumentFilter: Send + Sync {
    fn evaluate(&self, document: &Document) -> bool;
}

impl<F> DocumentFilter for F
where
    F: Fn(&Document) -> bool + Send + Sync,
{
    fn evaluate(&self, document: &Document) -> bool {
        self(document)
    }
}

/// Decides whether a page receives a watermark.
///
/// Pages are numbered from zero in document order.
pub trait PageFilter: Send + Sync {
    fn evaluate(&self, page_index: usize) -> bool;
}

impl<F> PageFilter for F
where
    F: Fn(usize) -> bool + Send + Sync,
{
    fn evaluate(&self, page_index: usize) -> bool {
        self(page_index)
    }
}

/// Full configuration of one watermark.
#[derive(Clone)]
pub struct WatermarkAttributes {
    pub kind: WatermarkKind,
    pub text: Option<String>,
    pub image: Option<Arc<DynamicImage>>,
    pub color: Color,
    /// Point size for text, scale percent for images. `None` means default.
    pub size: Option<i32>,
    pub opacity: i32,
    /// Signed degrees, counter-clockwise. Normalized when rendering.
    pub rotation: i32,
    pub dpi: f32,
    pub method: WatermarkingMethod,
    pub position: WatermarkPosition,
    pub adjustment: Adjustment,
    pub vertical_spacing: i32,
    pub horizontal_spacing: i32,
    pub trademark: bool,
    pub enabled: bool,
    pub document_filter: Option<Arc<dyn DocumentFilter>>,
    pub page_filter: Option<Arc<dyn PageFilter>>,
}

impl WatermarkAttributes {
    /// A fresh record seeded with defaults and the given method.
    pub fn new(method: WatermarkingMethod) -> Self {
        Self {
            kind: WatermarkKind::Text,
            text: None,
            image: None,
            color: Color::black(),
            size: None,
            opacity: DEFAULT_OPACITY,
            rotation: 0,
            dpi: DEFAULT_DPI,
            method,
            position: WatermarkPosition::Center,
            adjustment: Adjustment::default(),
            vertical_spacing: DEFAULT_SPACING,
            horizontal_spacing: DEFAULT_SPACING,
            trademark: false,
            enabled: true,
            document_filter: None,
            page_filter: None,
        }
    }

    pub fn effective_size(&self) -> i32 {
        self.size.unwrap_or(match self.kind {
            WatermarkKind::Text => DEFAULT_TEXT_SIZE,
            WatermarkKind::Image => DEFAULT_IMAGE_SCALE,
        })
    }

    /// Rotation folded into `[0, 360)`.
    pub fn normalized_rotation(&self) -> i32 {
        self.rotation.rem_euclid(360)
    }

    /// Opacity as a `0.0..=1.0` factor.
    pub fn opacity_fraction(&self) -> f32 {
        self.opacity.clamp(0, 100) as f32 / 100.0
    }

    /// Text as painted, with the trademark sign when requested.
    pub fn display_text(&self) -> Option<String> {
        self.text.as_ref().map(|text| {
            if self.trademark {
                format!("{}{}", text, TRADEMARK_SIGN)
            } else {
                text.clone()
            }
        })
    }

    pub fn applies_to_document(&self, document: &Document) -> bool {
        self.document_filter
            .as_ref()
            .map_or(true, |filter| filter.evaluate(document))
    }

    pub fn applies_to_page(&self, page_index: usize) -> bool {
        self.page_filter
            .as_ref()
            .map_or(true, |filter| filter.evaluate(page_index))
    }
}

impl fmt::Debug for WatermarkAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatermarkAttributes")
            .field("kind", &self.kind)
            .field("text", &self.text)
            .field(
                "image",
                &self.image.as_ref().map(|img| (img.width(), img.height())),
            )
            .field("color", &self.color)
            .field("size", &self.effective_size())
            .field("opacity", &self.opacity)
            .field("rotation", &self.rotation)
            .field("dpi", &self.dpi)
            .field("method", &self.method)
            .field("position", &self.position)
            .field("adjustment", &self.adjustment)
            .field("vertical_spacing", &self.vertical_spacing)
            .field("horizontal_spacing", &self.horizontal_spacing)
            .field("trademark", &self.trademark)
            .field("enabled", &self.enabled)
            .field("document_filter", &self.document_filter.is_some())
            .field("page_filter", &self.page_filter.is_some())
            .finish()
    }
}
