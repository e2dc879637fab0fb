//! Shared geometry helpers.
//!
//! Element sizes may be negative (a mirrored shape), so everything that
//! reasons about extents goes through [`normalize_rect`] first.

use crate::elements::StrokePosition;
use kurbo::{Point, Rect, Vec2};

/// Build a canonical rectangle from a possibly mirrored `x, y, w, h`.
pub fn normalize_rect(x: f64, y: f64, w: f64, h: f64) -> Rect {
    let left = x.min(x + w);
    let top = y.min(y + h);
    Rect::new(left, top, left + w.abs(), top + h.abs())
}

/// Inclusive AABB overlap test. Touching edges count as intersecting.
pub fn rects_intersect(a: Rect, b: Rect) -> bool {
    !(a.x1 < b.x0 || a.x0 > b.x1 || a.y1 < b.y0 || a.y0 > b.y1)
}

/// Inclusive point containment (kurbo's `contains` excludes the far edges).
pub fn rect_contains(rect: Rect, point: Point) -> bool {
    point.x >= rect.x0 && point.x <= rect.x1 && point.y >= rect.y0 && point.y <= rect.y1
}

/// Whether every coordinate of the rectangle is finite.
pub fn rect_is_finite(rect: Rect) -> bool {
    rect.x0.is_finite() && rect.y0.is_finite() && rect.x1.is_finite() && rect.y1.is_finite()
}

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = Vec2::new(b.x - a.x, b.y - a.y);
    let pv = Vec2::new(point.x - a.x, point.y - a.y);
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(a.x + t * seg.x, a.y + t * seg.y);
    ((point.x - proj.x).powi(2) + (point.y - proj.y).powi(2)).sqrt()
}

/// Minimum distance from a point to a polyline (sequence of connected segments).
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|w| point_to_segment_dist(point, w[0], w[1]))
        .fold(f64::INFINITY, f64::min)
}

/// Even-odd ray casting against a closed polygon.
pub fn point_in_polygon(point: Point, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (pi, pj) = (polygon[i], polygon[j]);
        if (pi.y > point.y) != (pj.y > point.y) {
            let x_cross = (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// The rectangle a stroke should be drawn on so that it lands centered on,
/// inside, or outside the shape's boundary.
pub fn stroke_rect(rect: Rect, stroke_width: f64, position: StrokePosition) -> Rect {
    let half = stroke_width / 2.0;
    match position {
        StrokePosition::Center => rect,
        StrokePosition::Inside => {
            let inset = half.min(rect.width() / 2.0).min(rect.height() / 2.0);
            rect.inflate(-inset, -inset)
        }
        StrokePosition::Outside => rect.inflate(half, half),
    }
}

/// Signed amount a corner radius changes when the stroke rectangle moves.
pub fn stroke_radius_delta(stroke_width: f64, position: StrokePosition) -> f64 {
    match position {
        StrokePosition::Center => 0.0,
        StrokePosition::Inside => -stroke_width / 2.0,
        StrokePosition::Outside => stroke_width / 2.0,
    }
}

/// Union of an iterator of rectangles, `None` when empty.
pub fn union_rects(rects: impl IntoIterator<Item = Rect>) -> Option<Rect> {
    rects.into_iter().reduce(|acc, r| acc.union(r))
}
