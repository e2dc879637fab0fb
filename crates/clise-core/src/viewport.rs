//! Viewport transform and culling.
//!
//! World space is mapped to screen space by translating by `pan` (screen
//! pixels) and then scaling by `zoom`. Culling inverts that mapping for the
//! screen rectangle and pads the result so panning doesn't pop elements in.

use crate::elements::Element;
use crate::geometry::{rect_is_finite, rects_intersect};
use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Default fraction of the visible world size added on each side.
pub const DEFAULT_VIEWPORT_BUFFER: f64 = 0.2;

/// Pan/zoom state as seen by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Translation in screen pixels.
    pub pan: Vec2,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    pub fn new(pan: Vec2, zoom: f64) -> Self {
        Self { pan, zoom }
    }

    /// World-to-screen transform (before device pixel ratio).
    pub fn transform(&self) -> Affine {
        Affine::translate(self.pan) * Affine::scale(self.zoom)
    }

    /// Convert a screen point to world coordinates.
    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        Point::new(
            (screen_point.x - self.pan.x) / self.zoom,
            (screen_point.y - self.pan.y) / self.zoom,
        )
    }

    /// Convert a world point to screen coordinates.
    pub fn world_to_screen(&self, world_point: Point) -> Point {
        self.transform() * world_point
    }

    /// Padded world-space rectangle visible on a screen of `screen` size.
    pub fn bounds(&self, screen: Size, buffer: f64) -> ViewportBounds {
        calculate_viewport_bounds(self.pan, self.zoom, screen, buffer)
    }
}

/// World-space rectangle considered visible for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportBounds {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl ViewportBounds {
    pub fn to_rect(self) -> Rect {
        Rect::new(self.left, self.top, self.right, self.bottom)
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

impl From<ViewportBounds> for Rect {
    fn from(bounds: ViewportBounds) -> Self {
        bounds.to_rect()
    }
}

/// Compute the padded world rectangle visible through the screen.
pub fn calculate_viewport_bounds(pan: Vec2, zoom: f64, screen: Size, buffer: f64) -> ViewportBounds {
    let zoom = if zoom.is_finite() && zoom > 0.0 { zoom } else { 1.0 };
    let left = -pan.x / zoom;
    let top = -pan.y / zoom;
    let right = (screen.width - pan.x) / zoom;
    let bottom = (screen.height - pan.y) / zoom;
    let pad_x = (right - left) * buffer;
    let pad_y = (bottom - top) * buffer;
    ViewportBounds {
        left: left - pad_x,
        top: top - pad_y,
        right: right + pad_x,
        bottom: bottom + pad_y,
    }
}

/// Whether the element's bounds overlap the viewport. Touching counts.
///
/// Elements with non-finite geometry are never visible.
pub fn is_visible(element: &Element, bounds: &ViewportBounds) -> bool {
    let rect = element.bounds();
    rect_is_finite(rect) && rects_intersect(rect, bounds.to_rect())
}

/// Output of [`cull_elements`].
#[derive(Debug, Clone)]
pub struct CullResult<'a> {
    pub visible: Vec<&'a Element>,
    pub culled_count: usize,
    pub total_count: usize,
}

/// Filter `elements` down to those overlapping the viewport, preserving order.
pub fn cull_elements<'a>(
    elements: &'a [Element],
    viewport: &Viewport,
    screen: Size,
    buffer: f64,
    enabled: bool,
) -> CullResult<'a> {
    let total_count = elements.len();
    if !enabled {
        return CullResult {
            visible: elements.iter().collect(),
            culled_count: 0,
            total_count,
        };
    }
    let bounds = viewport.bounds(screen, buffer);
    let visible: Vec<&Element> = elements.iter().filter(|e| is_visible(e, &bounds)).collect();
    CullResult {
        culled_count: total_count - visible.len(),
        visible,
        total_count,
    }
}
