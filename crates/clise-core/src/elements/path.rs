//! Path element points and their conversion to drawable / hit-testable geometry.
//!
//! Every curve kind is rendered as a quadratic segment through its first
//! control handle. Hit-testing flattens those same quadratics so the
//! clickable outline matches what is drawn.

use kurbo::{BezPath, Point, Rect};
use serde::{Deserialize, Serialize};

/// Number of line segments a curve is flattened into for hit-testing.
pub const CURVE_FLATTEN_SEGMENTS: usize = 12;

/// Curve flavor of the segment leaving a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveKind {
    #[default]
    Quadratic,
    Cubic,
    Smooth,
}

/// A control handle in path-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlPoint {
    pub x: f64,
    pub y: f64,
}

/// Curve descriptor of the segment starting at a point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathCurve {
    #[serde(rename = "type", default)]
    pub kind: CurveKind,
    pub cp1: ControlPoint,
    #[serde(default)]
    pub cp2: Option<ControlPoint>,
}

/// One anchor of a path, in coordinates local to the element origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub curve: Option<PathCurve>,
    #[serde(default)]
    pub selected: bool,
}

impl PathPoint {
    /// A corner point with no outgoing curve.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            curve: None,
            selected: false,
        }
    }

    /// Attach a quadratic curve to the segment leaving this point.
    pub fn with_curve(mut self, kind: CurveKind, cx: f64, cy: f64) -> Self {
        self.curve = Some(PathCurve {
            kind,
            cp1: ControlPoint { x: cx, y: cy },
            cp2: None,
        });
        self
    }
}

/// Path-specific attributes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PathProps {
    #[serde(default)]
    pub points: Vec<PathPoint>,
    #[serde(default)]
    pub closed: bool,
}

impl PathProps {
    fn world(origin: Point, x: f64, y: f64) -> Point {
        Point::new(origin.x + x, origin.y + y)
    }

    /// Segments as `(from, control, to)` in world space; `control` is `None`
    /// for straight segments. Includes the closing segment when `closed`.
    pub fn segments(&self, origin: Point) -> Vec<(Point, Option<Point>, Point)> {
        let n = self.points.len();
        if n < 2 {
            return Vec::new();
        }
        let count = if self.closed { n } else { n - 1 };
        (0..count)
            .map(|i| {
                let from = self.points[i];
                let to = self.points[(i + 1) % n];
                let control = from.curve.map(|c| Self::world(origin, c.cp1.x, c.cp1.y));
                (
                    Self::world(origin, from.x, from.y),
                    control,
                    Self::world(origin, to.x, to.y),
                )
            })
            .collect()
    }

    /// Build the drawable path in world space.
    pub fn to_bez_path(&self, origin: Point) -> BezPath {
        let mut path = BezPath::new();
        let Some(first) = self.points.first() else {
            return path;
        };
        path.move_to(Self::world(origin, first.x, first.y));
        for (_, control, to) in self.segments(origin) {
            match control {
                Some(ctrl) => path.quad_to(ctrl, to),
                None => path.line_to(to),
            }
        }
        if self.closed {
            path.close_path();
        }
        path
    }

    /// Flatten into a polyline (world space) using [`CURVE_FLATTEN_SEGMENTS`] per curve.
    pub fn flatten(&self, origin: Point) -> Vec<Point> {
        let mut out = Vec::new();
        let Some(first) = self.points.first() else {
            return out;
        };
        out.push(Self::world(origin, first.x, first.y));
        for (from, control, to) in self.segments(origin) {
            match control {
                Some(ctrl) => {
                    for step in 1..=CURVE_FLATTEN_SEGMENTS {
                        let t = step as f64 / CURVE_FLATTEN_SEGMENTS as f64;
                        let mt = 1.0 - t;
                        out.push(Point::new(
                            mt * mt * from.x + 2.0 * mt * t * ctrl.x + t * t * to.x,
                            mt * mt * from.y + 2.0 * mt * t * ctrl.y + t * t * to.y,
                        ));
                    }
                }
                None => out.push(to),
            }
        }
        out
    }

    /// Bounds of anchors and control handles in world space.
    pub fn control_bounds(&self, origin: Point) -> Option<Rect> {
        let mut pts = self.points.iter().flat_map(|p| {
            let anchor = Self::world(origin, p.x, p.y);
            let controls = p.curve.into_iter().flat_map(move |c| {
                std::iter::once(Self::world(origin, c.cp1.x, c.cp1.y))
                    .chain(c.cp2.map(|cp| Self::world(origin, cp.x, cp.y)))
            });
            std::iter::once(anchor).chain(controls)
        });
        let first = pts.next()?;
        Some(pts.fold(Rect::from_points(first, first), |acc, p| acc.union_pt(p)))
    }
}
