//! Text watermark rendering.
//!
//! This module renders text watermarks to RGBA images that can be
//! composited onto raster targets or embedded into PDF pages as images.
//!
//! # Features
//!
//! - Hex color parsing (#RGB and #RRGGBB formats)
//! - Font discovery (configured path, `MARKIT_FONT`, common system fonts,
//!   then an embedded DejaVu Sans Mono)
//! - Kerning-aware text measurement
//! - Counter-clockwise rotation with bilinear sampling
//!
//! # Example
//!
//! ```no_run
//! use markit::watermark::text_renderer::{parse_hex_color, TextRenderOptions, TextRenderer};
//!
//! let renderer = TextRenderer::discover(None).unwrap();
//! let options = TextRenderOptions {
//!     text: "Copyright 2025".to_string(),
//!     font_size: 24.0,
//!     color: parse_hex_color("#FFFFFF").unwrap(),
//!     rotation_degrees: None,
//! };
//!
//! let image = renderer.render(&options).unwrap();
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::{imageops, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::WatermarkError;

/// Environment variable naming a font file for raster text.
pub const FONT_ENV_VAR: &str = "MARKIT_FONT";

/// Fonts tried, in order, when no font is configured.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Embedded fallback font (DejaVu Sans Mono, Bitstream Vera license).
const EMBEDDED_FONT_DATA: &[u8] = include_bytes!("fonts/DejaVuSansMono.ttf");

/// Largest watermark raster, in pixels, that rendering will allocate.
pub const MAX_RASTER_PIXELS: u64 = 64 * 1024 * 1024;

/// Lazily discovered fallback renderer, shared across backends.
static DEFAULT_RENDERER: OnceLock<Option<Arc<TextRenderer>>> = OnceLock::new();

/// RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// White color.
    pub fn white() -> Self {
        Self::new(255, 255, 255)
    }

    /// Black color.
    pub fn black() -> Self {
        Self::new(0, 0, 0)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

/// Options for text rendering.
#[derive(Debug, Clone)]
pub struct TextRenderOptions {
    /// The text to render.
    pub text: String,
    /// Font size in pixels.
    pub font_size: f32,
    /// Text color (RGB).
    pub color: Color,
    /// Rotation in degrees (counter-clockwise). None means no rotation.
    pub rotation_degrees: Option<f32>,
}

impl Default for TextRenderOptions {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_size: 30.0,
            color: Color::black(),
            rotation_degrees: None,
        }
    }
}

/// Parse a hex color string into RGB components.
///
/// Supports both #RGB and #RRGGBB formats.
///
/// # Examples
///
/// ```
/// use markit::watermark::text_renderer::{parse_hex_color, Color};
///
/// let white = parse_hex_color("#FFF").unwrap();
/// assert_eq!(white, Color::new(255, 255, 255));
///
/// let red = parse_hex_color("#FF0000").unwrap();
/// assert_eq!(red, Color::new(255, 0, 0));
/// ```
pub fn parse_hex_color(hex: &str) -> Result<Color, WatermarkError> {
    let digits = hex
        .strip_prefix('#')
        .ok_or_else(|| WatermarkError::invalid_input(format!("color '{}' must start with '#'", hex)))?;

    let component = |s: &str| {
        u8::from_str_radix(s, 16)
            .map_err(|_| WatermarkError::invalid_input(format!("invalid hex digit in color '{}'", hex)))
    };

    if !digits.is_ascii() {
        return Err(WatermarkError::invalid_input(format!(
            "invalid hex digit in color '{}'",
            hex
        )));
    }

    match digits.len() {
        3 => {
            // #RGB: each digit is doubled, 0xF -> 0xFF
            let r = component(&digits[0..1])?;
            let g = component(&digits[1..2])?;
            let b = component(&digits[2..3])?;
            Ok(Color::new(r * 17, g * 17, b * 17))
        }
        6 => Ok(Color::new(
            component(&digits[0..2])?,
            component(&digits[2..4])?,
            component(&digits[4..6])?,
        )),
        n => Err(WatermarkError::invalid_input(format!(
            "color must be #RGB or #RRGGBB, got {} digits",
            n
        ))),
    }
}

/// Round a raster extent up to whole pixels, refusing anything past
/// [`MAX_RASTER_PIXELS`].
///
/// Used before every watermark allocation so an oversized `size` or dpi
/// turns into an error instead of an allocation failure.
pub fn checked_raster_dimensions(width: f64, height: f64) -> Result<(u32, u32), WatermarkError> {
    let too_large = || {
        WatermarkError::out_of_range(
            "size",
            format!(
                "watermark raster of {:.0}x{:.0} pixels exceeds the {} pixel limit",
                width, height, MAX_RASTER_PIXELS
            ),
        )
    };

    if !width.is_finite() || !height.is_finite() {
        return Err(too_large());
    }

    let w = width.ceil().max(1.0);
    let h = height.ceil().max(1.0);
    if w > f64::from(u32::MAX) || h > f64::from(u32::MAX) || w * h > MAX_RASTER_PIXELS as f64 {
        return Err(too_large());
    }

    Ok((w as u32, h as u32))
}

/// Renders text with one loaded font.
pub struct TextRenderer {
    font: FontVec,
    source: Option<PathBuf>,
}

impl std::fmt::Debug for TextRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRenderer")
            .field("source", &self.source)
            .finish()
    }
}

impl TextRenderer {
    /// Build a renderer from raw TrueType/OpenType data.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, WatermarkError> {
        let font = FontVec::try_from_vec(data)
            .map_err(|e| WatermarkError::decode("font data", e.to_string()))?;
        Ok(Self { font, source: None })
    }

    /// Load a font file.
    pub fn load(path: &Path) -> Result<Self, WatermarkError> {
        let data = std::fs::read(path)
            .map_err(|e| WatermarkError::decode(format!("font file '{}'", path.display()), e))?;
        let mut renderer = Self::from_bytes(data)?;
        renderer.source = Some(path.to_path_buf());
        Ok(renderer)
    }

    /// Find a usable font.
    ///
    /// Tries `configured`, then `MARKIT_FONT`, then well-known system font
    /// locations, and falls back to the embedded font.
    pub fn discover(configured: Option<&Path>) -> Result<Self, WatermarkError> {
        if let Some(path) = configured {
            return Self::load(path);
        }

        if let Some(path) = std::env::var_os(FONT_ENV_VAR) {
            return Self::load(Path::new(&path));
        }

        for candidate in SYSTEM_FONT_CANDIDATES {
            let path = Path::new(candidate);
            if path.is_file() {
                if let Ok(renderer) = Self::load(path) {
                    tracing::debug!(font = %path.display(), "Using system font for text watermarks");
                    return Ok(renderer);
                }
            }
        }

        tracing::debug!("No system font found, using embedded font for text watermarks");
        Self::embedded()
    }

    /// Renderer backed by the font compiled into the crate.
    pub fn embedded() -> Result<Self, WatermarkError> {
        Self::from_bytes(EMBEDDED_FONT_DATA.to_vec())
    }

    /// Shared renderer found by [`TextRenderer::discover`] without a
    /// configured path. Discovery runs once per process.
    pub fn shared_default() -> Result<Arc<TextRenderer>, WatermarkError> {
        DEFAULT_RENDERER
            .get_or_init(|| Self::discover(None).ok().map(Arc::new))
            .clone()
            .ok_or_else(|| {
                WatermarkError::render(format!(
                    "font named by {} could not be loaded",
                    FONT_ENV_VAR
                ))
            })
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Calculate the dimensions of rendered text.
    ///
    /// Returns (width, height) in pixels, saturating at `u32::MAX`.
    pub fn measure(&self, text: &str, font_size: f32) -> (u32, u32) {
        let (width, height) = self.extent(text, font_size);
        (
            width.ceil().min(f64::from(u32::MAX)) as u32,
            height.ceil().min(f64::from(u32::MAX)) as u32,
        )
    }

    /// Unrounded text extent including the antialiasing padding.
    fn extent(&self, text: &str, font_size: f32) -> (f64, f64) {
        let scaled_font = self.font.as_scaled(PxScale::from(font_size));

        let mut width = 0.0f64;
        let mut prev_glyph: Option<ab_glyph::GlyphId> = None;

        for c in text.chars() {
            let glyph_id = scaled_font.glyph_id(c);
            if let Some(prev) = prev_glyph {
                width += f64::from(scaled_font.kern(prev, glyph_id));
            }
            width += f64::from(scaled_font.h_advance(glyph_id));
            prev_glyph = Some(glyph_id);
        }

        // Small padding so antialiased edges are not cut
        let padding = 2.0;
        (
            width.ceil() + padding,
            f64::from(scaled_font.height()).ceil() + padding,
        )
    }

    /// Render text to an RGBA image with a transparent background.
    pub fn render(&self, options: &TextRenderOptions) -> Result<RgbaImage, WatermarkError> {
        if options.text.trim().is_empty() {
            return Err(WatermarkError::EmptyText);
        }
        if !options.font_size.is_finite() || options.font_size <= 0.0 {
            return Err(WatermarkError::out_of_range(
                "size",
                format!("font size must be positive, got {}", options.font_size),
            ));
        }

        let scale = PxScale::from(options.font_size);
        let scaled_font = self.font.as_scaled(scale);

        let (width, height) = self.extent(&options.text, options.font_size);
        let (width, height) = checked_raster_dimensions(width, height)?;
        let mut image = RgbaImage::new(width, height);

        let baseline_y = 1.0 + scaled_font.ascent();
        let mut cursor_x = 1.0f32;
        let mut prev_glyph: Option<ab_glyph::GlyphId> = None;

        for c in options.text.chars() {
            let glyph_id = scaled_font.glyph_id(c);
            if let Some(prev) = prev_glyph {
                cursor_x += scaled_font.kern(prev, glyph_id);
            }

            let glyph =
                glyph_id.with_scale_and_position(scale, ab_glyph::point(cursor_x, baseline_y));

            if let Some(outlined) = self.font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                let (canvas_w, canvas_h) = (image.width() as i32, image.height() as i32);

                outlined.draw(|px, py, coverage| {
                    let x = px as i32 + bounds.min.x as i32;
                    let y = py as i32 + bounds.min.y as i32;

                    if x >= 0 && y >= 0 && x < canvas_w && y < canvas_h {
                        let pixel = Rgba([
                            options.color.r,
                            options.color.g,
                            options.color.b,
                            (coverage.clamp(0.0, 1.0) * 255.0) as u8,
                        ]);
                        let existing = *image.get_pixel(x as u32, y as u32);
                        image.put_pixel(x as u32, y as u32, blend_pixels(existing, pixel));
                    }
                });
            }

            cursor_x += scaled_font.h_advance(glyph_id);
            prev_glyph = Some(glyph_id);
        }

        if let Some(degrees) = options.rotation_degrees {
            image = rotate_image(&image, degrees);
        }

        Ok(image)
    }
}

/// Blend two RGBA pixels using alpha compositing.
fn blend_pixels(bottom: Rgba<u8>, top: Rgba<u8>) -> Rgba<u8> {
    let top_alpha = top[3] as f32 / 255.0;
    let bottom_alpha = bottom[3] as f32 / 255.0;

    let out_alpha = top_alpha + bottom_alpha * (1.0 - top_alpha);

    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend = |t: u8, b: u8| -> u8 {
        let t = t as f32 / 255.0;
        let b = b as f32 / 255.0;
        let result = (t * top_alpha + b * bottom_alpha * (1.0 - top_alpha)) / out_alpha;
        (result * 255.0) as u8
    };

    Rgba([
        blend(top[0], bottom[0]),
        blend(top[1], bottom[1]),
        blend(top[2], bottom[2]),
        (out_alpha * 255.0) as u8,
    ])
}

/// Rotate an image counter-clockwise by `degrees`.
///
/// The output is the axis-aligned box enclosing the rotated image. Quarter
/// turns are exact pixel permutations.
pub fn rotate_image(image: &RgbaImage, degrees: f32) -> RgbaImage {
    let normalized = degrees.rem_euclid(360.0);
    if normalized == 0.0 {
        return image.clone();
    }
    if normalized == 90.0 {
        return imageops::rotate270(image);
    }
    if normalized == 180.0 {
        return imageops::rotate180(image);
    }
    if normalized == 270.0 {
        return imageops::rotate90(image);
    }

    let radians = normalized.to_radians();
    let cos = radians.cos();
    let sin = radians.sin();

    let src_w = image.width() as f32;
    let src_h = image.height() as f32;
    let cx = src_w / 2.0;
    let cy = src_h / 2.0;

    let dst_w = (src_w * cos.abs() + src_h * sin.abs()).ceil() as u32;
    let dst_h = (src_w * sin.abs() + src_h * cos.abs()).ceil() as u32;

    let mut rotated = RgbaImage::new(dst_w.max(1), dst_h.max(1));

    let dst_cx = dst_w as f32 / 2.0;
    let dst_cy = dst_h as f32 / 2.0;

    for dy in 0..dst_h {
        for dx in 0..dst_w {
            // Transform destination pixel back to source coordinates
            let rx = dx as f32 - dst_cx;
            let ry = dy as f32 - dst_cy;

            let sx = rx * cos - ry * sin + cx;
            let sy = rx * sin + ry * cos + cy;

            // Bilinear interpolation
            if sx >= 0.0 && sx < src_w - 1.0 && sy >= 0.0 && sy < src_h - 1.0 {
                let x0 = sx.floor() as u32;
                let y0 = sy.floor() as u32;
                let x1 = x0 + 1;
                let y1 = y0 + 1;

                let fx = sx - x0 as f32;
                let fy = sy - y0 as f32;

                let p00 = image.get_pixel(x0, y0);
                let p10 = image.get_pixel(x1, y0);
                let p01 = image.get_pixel(x0, y1);
                let p11 = image.get_pixel(x1, y1);

                let interpolate = |c: usize| -> u8 {
                    let v = p00[c] as f32 * (1.0 - fx) * (1.0 - fy)
                        + p10[c] as f32 * fx * (1.0 - fy)
                        + p01[c] as f32 * (1.0 - fx) * fy
                        + p11[c] as f32 * fx * fy;
                    v.clamp(0.0, 255.0) as u8
                };

                rotated.put_pixel(
                    dx,
                    dy,
                    Rgba([
                        interpolate(0),
                        interpolate(1),
                        interpolate(2),
                        interpolate(3),
                    ]),
                );
            }
        }
    }

    rotated
}
