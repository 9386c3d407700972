//! Position calculation for watermark placement.
//!
//! This module turns a symbolic [`WatermarkPosition`] plus an [`Adjustment`]
//! and tile spacing into concrete top-left coordinates on a canvas. Canvases
//! and boxes are measured in the target's native unit (pixels for rasters,
//! points for PDF pages) with the origin at the top-left corner and y growing
//! downwards.
//!
//! # Position Modes
//!
//! - **9-grid positions**: TopLeft, TopCenter, TopRight, CenterLeft, Center,
//!   CenterRight, BottomLeft, BottomCenter, BottomRight
//! - **Tiled**: Repeating grid pattern across the entire canvas
//! - **Custom**: Absolute top-left coordinates
//!
//! # Example
//!
//! ```
//! use markit::watermark::position::{
//!     calculate_position, Adjustment, CanvasDimensions, PlacementPosition, WatermarkDimensions,
//! };
//! use markit::watermark::WatermarkPosition;
//!
//! let canvas = CanvasDimensions::new(1000.0, 1000.0);
//! let watermark = WatermarkDimensions::new(100.0, 50.0);
//!
//! let pos = calculate_position(
//!     WatermarkPosition::TopRight,
//!     &canvas,
//!     &watermark,
//!     Adjustment::new(-10, 5),
//! );
//! assert_eq!(pos, PlacementPosition::new(890.0, 5.0));
//! ```

use serde::{Deserialize, Serialize};

/// Watermark position on the canvas.
///
/// Supports 9 fixed positions (grid), a tiled mode and absolute coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatermarkPosition {
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    #[default]
    Center,
    CenterRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
    /// Repeating tile pattern across the entire canvas
    Tiled,
    /// Absolute top-left corner
    Custom { x: i32, y: i32 },
}

impl WatermarkPosition {
    pub fn is_tiled(&self) -> bool {
        matches!(self, WatermarkPosition::Tiled)
    }

    /// Fractions of the watermark box that form its reference point.
    ///
    /// (0, 0) is the box's top-left corner, (1, 1) its bottom-right corner.
    fn anchor_fractions(&self) -> (f32, f32) {
        match self {
            WatermarkPosition::TopLeft => (0.0, 0.0),
            WatermarkPosition::TopCenter => (0.5, 0.0),
            WatermarkPosition::TopRight => (1.0, 0.0),
            WatermarkPosition::CenterLeft => (0.0, 0.5),
            WatermarkPosition::Center => (0.5, 0.5),
            WatermarkPosition::CenterRight => (1.0, 0.5),
            WatermarkPosition::BottomLeft => (0.0, 1.0),
            WatermarkPosition::BottomCenter => (0.5, 1.0),
            WatermarkPosition::BottomRight => (1.0, 1.0),
            WatermarkPosition::Tiled | WatermarkPosition::Custom { .. } => (0.0, 0.0),
        }
    }
}

impl std::str::FromStr for WatermarkPosition {
    type Err = serde_yaml::Error;

    /// Parse `center`, `tiled`, `custom: {x: 10, y: 20}` and the other
    /// kebab-case names. The YAML tag form `!custom {x: 10, y: 20}` is
    /// accepted too.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        serde_yaml::with::singleton_map::deserialize(serde_yaml::Deserializer::from_str(value))
            .or_else(|_| serde_yaml::from_str(value))
    }
}

/// Pixel offset added to the anchored position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Adjustment {
    pub dx: i32,
    pub dy: i32,
}

impl Adjustment {
    pub fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }
}

/// Dimensions of the target canvas (page or image).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasDimensions {
    pub width: f32,
    pub height: f32,
}

impl CanvasDimensions {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Dimensions of the watermark to be placed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatermarkDimensions {
    pub width: f32,
    pub height: f32,
}

impl WatermarkDimensions {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Axis-aligned box enclosing this box rotated by `degrees`.
    ///
    /// Quarter turns are handled exactly so right-angle rotations do not
    /// pick up floating point noise.
    pub fn rotated(&self, degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            0 | 180 => *self,
            90 | 270 => Self::new(self.height, self.width),
            normalized => {
                let radians = (normalized as f32).to_radians();
                let cos = radians.cos().abs();
                let sin = radians.sin().abs();
                Self::new(
                    self.width * cos + self.height * sin,
                    self.width * sin + self.height * cos,
                )
            }
        }
    }
}

/// A single position where a watermark should be placed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementPosition {
    pub x: f32,
    pub y: f32,
}

impl PlacementPosition {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Calculate the position for a single watermark placement.
///
/// The watermark's reference corner, edge midpoint or centre is pinned to
/// the matching canvas point, then `adjustment` is added. The result is
/// clamped with [`clamp_to_canvas`] so placement never fails. For `Tiled`
/// use [`calculate_tiled_positions`]; here it resolves like `TopLeft`.
pub fn calculate_position(
    position: WatermarkPosition,
    canvas: &CanvasDimensions,
    watermark: &WatermarkDimensions,
    adjustment: Adjustment,
) -> PlacementPosition {
    let (fx, fy) = position.anchor_fractions();

    let base = match position {
        WatermarkPosition::Custom { x, y } => PlacementPosition::new(x as f32, y as f32),
        _ => PlacementPosition::new(
            (canvas.width - watermark.width) * fx,
            (canvas.height - watermark.height) * fy,
        ),
    };

    let adjusted = PlacementPosition::new(
        base.x + adjustment.dx as f32,
        base.y + adjustment.dy as f32,
    );

    clamp_to_canvas(adjusted, position, canvas, watermark)
}

/// Clamp a position so the watermark's anchor point stays on the canvas.
///
/// Only the reference point is kept inside `[0, width] x [0, height]`; the
/// rest of the box may hang over the edge.
pub fn clamp_to_canvas(
    pos: PlacementPosition,
    position: WatermarkPosition,
    canvas: &CanvasDimensions,
    watermark: &WatermarkDimensions,
) -> PlacementPosition {
    let (fx, fy) = position.anchor_fractions();
    let ref_x = pos.x + watermark.width * fx;
    let ref_y = pos.y + watermark.height * fy;

    let clamped_x = ref_x.clamp(0.0, canvas.width.max(0.0));
    let clamped_y = ref_y.clamp(0.0, canvas.height.max(0.0));

    PlacementPosition::new(
        clamped_x - watermark.width * fx,
        clamped_y - watermark.height * fy,
    )
}

/// Lazy grid of tile positions covering a canvas.
///
/// Tiles sit on a lattice anchored at the adjustment offset and only the
/// cells whose box meets the canvas are yielded. The iterator is a plain
/// value: cloning it or calling [`calculate_tiled_positions`] again restarts
/// the sequence, so each page or image gets its own cursor.
#[derive(Debug, Clone)]
pub struct TiledPositions {
    columns: TileAxis,
    rows: TileAxis,
    column: i64,
    row: i64,
}

/// Lattice indices along one axis, `first..end`.
#[derive(Debug, Clone, Copy)]
struct TileAxis {
    origin: f64,
    step: f64,
    first: i64,
    end: i64,
}

impl TileAxis {
    fn new(origin: f64, extent: f64, step: f64, limit: f64) -> Self {
        // Smallest index whose box reaches past 0 (a zero-sized box may sit on 0)
        let first = if extent > 0.0 {
            ((-extent - origin) / step).floor() + 1.0
        } else {
            (-origin / step).ceil()
        };
        // Smallest index whose box starts at or beyond the far edge
        let end = ((limit - origin) / step).ceil();

        Self {
            origin,
            step,
            first: first as i64,
            end: (end as i64).max(first as i64),
        }
    }

    fn coordinate(&self, index: i64) -> f32 {
        (self.origin + index as f64 * self.step) as f32
    }
}

impl Iterator for TiledPositions {
    type Item = PlacementPosition;

    fn next(&mut self) -> Option<Self::Item> {
        if self.column >= self.columns.end {
            self.column = self.columns.first;
            self.row += 1;
        }
        if self.row >= self.rows.end || self.columns.first >= self.columns.end {
            return None;
        }

        let pos = PlacementPosition::new(
            self.columns.coordinate(self.column),
            self.rows.coordinate(self.row),
        );
        self.column += 1;
        Some(pos)
    }
}

/// Calculate positions for tiled watermark placement.
///
/// The lattice steps by the watermark size plus the horizontal/vertical
/// spacing from the adjustment offset in both directions until the canvas is
/// covered. Negative spacing is treated as zero.
pub fn calculate_tiled_positions(
    canvas: &CanvasDimensions,
    watermark: &WatermarkDimensions,
    adjustment: Adjustment,
    horizontal_spacing: i32,
    vertical_spacing: i32,
) -> TiledPositions {
    let width = f64::from(watermark.width.max(0.0));
    let height = f64::from(watermark.height.max(0.0));
    let step_x = (width + f64::from(horizontal_spacing.max(0))).max(1.0);
    let step_y = (height + f64::from(vertical_spacing.max(0))).max(1.0);

    let columns = TileAxis::new(f64::from(adjustment.dx), width, step_x, f64::from(canvas.width));
    let rows = TileAxis::new(f64::from(adjustment.dy), height, step_y, f64::from(canvas.height));

    TiledPositions {
        columns,
        rows,
        column: columns.first,
        row: rows.first,
    }
}

/// Placements produced for one watermark on one canvas.
#[derive(Debug, Clone)]
pub enum Placements {
    Single(std::iter::Once<PlacementPosition>),
    Tiled(TiledPositions),
}

impl Iterator for Placements {
    type Item = PlacementPosition;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Placements::Single(once) => once.next(),
            Placements::Tiled(tiles) => tiles.next(),
        }
    }
}

/// Resolves symbolic placements against one canvas.
#[derive(Debug, Clone, Copy)]
pub struct PositionResolver {
    canvas: CanvasDimensions,
}

impl PositionResolver {
    pub fn new(canvas: CanvasDimensions) -> Self {
        Self { canvas }
    }

    pub fn canvas(&self) -> CanvasDimensions {
        self.canvas
    }

    /// All top-left coordinates where a watermark of size `watermark` goes.
    pub fn resolve(
        &self,
        position: WatermarkPosition,
        adjustment: Adjustment,
        horizontal_spacing: i32,
        vertical_spacing: i32,
        watermark: &WatermarkDimensions,
    ) -> Placements {
        match position {
            WatermarkPosition::Tiled => Placements::Tiled(calculate_tiled_positions(
                &self.canvas,
                watermark,
                adjustment,
                horizontal_spacing,
                vertical_spacing,
            )),
            _ => Placements::Single(std::iter::once(calculate_position(
                position,
                &self.canvas,
                watermark,
                adjustment,
            ))),
        }
    }
}

/// Check if a position is at least partially visible within the canvas.
pub fn is_visible(
    pos: &PlacementPosition,
    canvas: &CanvasDimensions,
    watermark: &WatermarkDimensions,
) -> bool {
    let wm_right = pos.x + watermark.width;
    let wm_bottom = pos.y + watermark.height;

    pos.x < canvas.width && pos.y < canvas.height && wm_right > 0.0 && wm_bottom > 0.0
}
