//! Smart alignment guides for dragging elements.
//!
//! While a selection is dragged, its left/center/right and top/middle/bottom
//! lines snap to the same lines of nearby elements. Each axis snaps
//! independently to its closest candidate, and every candidate line that
//! ends up aligned is reported so the renderer can draw it.

use kurbo::{Rect, Vec2};

/// Snap distance in screen pixels.
pub const GUIDE_SNAP_THRESHOLD: f64 = 5.0;

const ALIGN_EPSILON: f64 = 1e-6;

/// Orientation of a guide line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuideAxis {
    /// A vertical line at a constant x.
    Vertical,
    /// A horizontal line at a constant y.
    Horizontal,
}

/// A guide line in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentGuide {
    pub axis: GuideAxis,
    /// x for vertical guides, y for horizontal ones.
    pub position: f64,
    /// Extent along the line.
    pub start: f64,
    pub end: f64,
}

/// Snap offset to apply to the moving box, plus the guides to show.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuideResult {
    pub offset: Vec2,
    pub guides: Vec<AlignmentGuide>,
}

impl GuideResult {
    pub fn is_snapped(&self) -> bool {
        self.offset != Vec2::ZERO || !self.guides.is_empty()
    }
}

fn x_stops(r: &Rect) -> [f64; 3] {
    [r.x0, (r.x0 + r.x1) / 2.0, r.x1]
}

fn y_stops(r: &Rect) -> [f64; 3] {
    [r.y0, (r.y0 + r.y1) / 2.0, r.y1]
}

/// Smallest correction (within `threshold`) that aligns one of `moving`'s
/// stops with a candidate stop.
fn best_delta(moving: [f64; 3], candidates: impl Iterator<Item = [f64; 3]>, threshold: f64) -> Option<f64> {
    let mut best: Option<f64> = None;
    for stops in candidates {
        for target in stops {
            for source in moving {
                let delta = target - source;
                if delta.abs() <= threshold && best.is_none_or(|b| delta.abs() < b.abs()) {
                    best = Some(delta);
                }
            }
        }
    }
    best
}

/// Compute snapping for a box being moved among `candidates`.
pub fn compute_guides(moving: Rect, candidates: &[Rect], zoom: f64) -> GuideResult {
    let zoom = if zoom.is_finite() && zoom > 0.0 { zoom } else { 1.0 };
    let threshold = GUIDE_SNAP_THRESHOLD / zoom;

    let dx = best_delta(x_stops(&moving), candidates.iter().map(x_stops), threshold);
    let dy = best_delta(y_stops(&moving), candidates.iter().map(y_stops), threshold);
    let offset = Vec2::new(dx.unwrap_or(0.0), dy.unwrap_or(0.0));
    let snapped = moving + offset;

    let mut guides: Vec<AlignmentGuide> = Vec::new();
    let mut push = |axis: GuideAxis, position: f64, start: f64, end: f64| {
        match guides
            .iter_mut()
            .find(|g| g.axis == axis && (g.position - position).abs() < ALIGN_EPSILON)
        {
            Some(existing) => {
                existing.start = existing.start.min(start);
                existing.end = existing.end.max(end);
            }
            None => guides.push(AlignmentGuide {
                axis,
                position,
                start,
                end,
            }),
        }
    };

    for candidate in candidates {
        if dx.is_some() {
            for target in x_stops(candidate) {
                if x_stops(&snapped).iter().any(|s| (s - target).abs() < ALIGN_EPSILON) {
                    push(
                        GuideAxis::Vertical,
                        target,
                        snapped.y0.min(candidate.y0),
                        snapped.y1.max(candidate.y1),
                    );
                }
            }
        }
        if dy.is_some() {
            for target in y_stops(candidate) {
                if y_stops(&snapped).iter().any(|s| (s - target).abs() < ALIGN_EPSILON) {
                    push(
                        GuideAxis::Horizontal,
                        target,
                        snapped.x0.min(candidate.x0),
                        snapped.x1.max(candidate.x1),
                    );
                }
            }
        }
    }

    GuideResult { offset, guides }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snaps_left_edges() {
        let moving = Rect::new(103.0, 300.0, 153.0, 350.0);
        let candidates = [Rect::new(100.0, 0.0, 220.0, 50.0)];
        let result = compute_guides(moving, &candidates, 1.0);
        assert!((result.offset.x - -3.0).abs() < 1e-9);
        assert!(result.offset.y.abs() < f64::EPSILON);
        assert_eq!(result.guides.len(), 1);
        let guide = result.guides[0];
        assert_eq!(guide.axis, GuideAxis::Vertical);
        assert!((guide.position - 100.0).abs() < 1e-9);
        assert!((guide.start - 0.0).abs() < 1e-9);
        assert!((guide.end - 350.0).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_scales_with_zoom() {
        let moving = Rect::new(108.0, 300.0, 158.0, 350.0);
        let candidates = [Rect::new(100.0, 0.0, 200.0, 50.0)];
        assert!(!compute_guides(moving, &candidates, 1.0).is_snapped());
        // At zoom 0.5 the threshold is 10 world units.
        let result = compute_guides(moving, &candidates, 0.5);
        assert!((result.offset.x - -8.0).abs() < 1e-9);
    }

    #[test]
    fn test_center_alignment_on_both_axes() {
        let moving = Rect::new(0.0, 0.0, 20.0, 20.0);
        let candidates = [Rect::new(-38.0, -39.0, 62.0, 61.0)];
        let result = compute_guides(moving, &candidates, 1.0);
        assert!((result.offset.x - 2.0).abs() < 1e-9);
        assert!((result.offset.y - 1.0).abs() < 1e-9);
        assert_eq!(result.guides.len(), 2);
    }
}
