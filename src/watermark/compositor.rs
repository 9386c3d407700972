//! Watermark compositor for blending watermarks onto raster images.
//!
//! This module handles alpha blending of rendered watermark images onto
//! target images at resolved positions.
//!
//! # Features
//!
//! - Porter-Duff "over" blending with an extra opacity factor
//! - Layers applied strictly in insertion order (later layers paint on top)
//! - Placements that hang over the canvas edge are clipped
//!
//! # Example
//!
//! ```
//! use image::{Rgba, RgbaImage};
//! use markit::watermark::compositor::{Compositor, WatermarkLayer};
//! use markit::watermark::position::PlacementPosition;
//!
//! let mut target = RgbaImage::from_pixel(100, 100, Rgba([255, 255, 255, 255]));
//! let mut compositor = Compositor::new();
//! compositor.add_layer(WatermarkLayer {
//!     image: RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])),
//!     position: PlacementPosition::new(10.0, 10.0),
//!     opacity: 0.5,
//! });
//!
//! compositor.apply(&mut target);
//! ```

use image::{Rgba, RgbaImage};

use super::position::PlacementPosition;

/// A watermark layer to be composited onto an image.
#[derive(Clone)]
pub struct WatermarkLayer {
    /// The watermark image (RGBA).
    pub image: RgbaImage,
    /// Top-left corner of the watermark on the target.
    pub position: PlacementPosition,
    /// Opacity to apply (0.0 to 1.0). Applied on top of image's alpha channel.
    pub opacity: f32,
}

impl std::fmt::Debug for WatermarkLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatermarkLayer")
            .field("dimensions", &(self.image.width(), self.image.height()))
            .field("position", &self.position)
            .field("opacity", &self.opacity)
            .finish()
    }
}

/// Compositor for applying watermarks to images.
#[derive(Debug, Default)]
pub struct Compositor {
    layers: Vec<WatermarkLayer>,
}

impl Compositor {
    /// Create a new compositor with no layers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a watermark layer to the compositor.
    pub fn add_layer(&mut self, layer: WatermarkLayer) {
        self.layers.push(layer);
    }

    /// Add one layer per placement, all sharing the same watermark image.
    pub fn add_placements<I>(&mut self, image: &RgbaImage, placements: I, opacity: f32)
    where
        I: IntoIterator<Item = PlacementPosition>,
    {
        for position in placements {
            self.add_layer(WatermarkLayer {
                image: image.clone(),
                position,
                opacity,
            });
        }
    }

    /// Apply all watermark layers to the target image.
    ///
    /// Layers are applied in the order they were added.
    pub fn apply(&self, target: &mut RgbaImage) {
        for layer in &self.layers {
            blend_layer(target, layer);
        }
    }

    /// Get the number of layers.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Clear all layers.
    pub fn clear(&mut self) {
        self.layers.clear();
    }
}

/// Blend a single watermark layer onto the target image.
pub fn blend_layer(target: &mut RgbaImage, layer: &WatermarkLayer) {
    let target_width = target.width() as i64;
    let target_height = target.height() as i64;

    let origin_x = layer.position.x.round() as i64;
    let origin_y = layer.position.y.round() as i64;

    // Visible region, clamped to target bounds
    let x_start = origin_x.max(0);
    let y_start = origin_y.max(0);
    let x_end = (origin_x + layer.image.width() as i64).min(target_width);
    let y_end = (origin_y + layer.image.height() as i64).min(target_height);

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let wx = (tx - origin_x) as u32;
            let wy = (ty - origin_y) as u32;

            let wm_pixel = layer.image.get_pixel(wx, wy);
            let target_pixel = target.get_pixel(tx as u32, ty as u32);

            let blended = blend_pixels(*target_pixel, *wm_pixel, layer.opacity);
            target.put_pixel(tx as u32, ty as u32, blended);
        }
    }
}

/// Blend two pixels using alpha compositing with additional opacity.
///
/// Uses the "over" operator: result = foreground + background * (1 - foreground.alpha)
fn blend_pixels(background: Rgba<u8>, foreground: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let fg_alpha = (foreground[3] as f32 / 255.0) * opacity.clamp(0.0, 1.0);
    let bg_alpha = background[3] as f32 / 255.0;

    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);

    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend_channel = |fg: u8, bg: u8| -> u8 {
        let fg_f = fg as f32 / 255.0;
        let bg_f = bg as f32 / 255.0;
        let result = (fg_f * fg_alpha + bg_f * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        (result * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend_channel(foreground[0], background[0]),
        blend_channel(foreground[1], background[1]),
        blend_channel(foreground[2], background[2]),
        (out_alpha * 255.0).round() as u8,
    ])
}
