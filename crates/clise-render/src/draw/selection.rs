//! Selection overlays: outlines, resize handles, group outlines, the
//! box-selection marquee and smart-guide lines.
//!
//! Everything here is drawn in world space but sized in screen pixels, so
//! widths and offsets are divided by the current zoom.

use super::DrawContext;
use crate::surface::{DashPattern, Surface};
use clise_core::hit_test::{handle_metrics, resize_handle_positions};
use clise_core::{AlignmentGuide, Element, ElementKind, GuideAxis};
use kurbo::{Point, Rect};
use peniko::Color;

/// Outward padding of a group outline, in screen pixels.
pub const GROUP_OUTLINE_PADDING: f64 = 8.0;

const OUTLINE_WIDTH: f64 = 1.0;
const BOX_SELECTION_FILL_ALPHA: f32 = 0.1;
const GROUP_DASH: f64 = 4.0;

/// Outline and handles for a selected element.
///
/// Lines get endpoint handles only. Locked elements, and elements locked in
/// both dimensions, get an outline without handles.
pub fn draw_selection(surface: &mut dyn Surface, ctx: &mut DrawContext<'_>, element: &Element) {
    let show_handles = !element.locked && !(element.lock_width && element.lock_height);
    let width = OUTLINE_WIDTH / ctx.zoom;
    let color = ctx.theme.selection();

    if let ElementKind::Line(_) = element.kind {
        if show_handles {
            let points: Vec<Point> = resize_handle_positions(element).into_iter().map(|(_, p)| p).collect();
            draw_handles(surface, ctx, &points);
        }
        return;
    }

    let rotated = element.rotation != 0.0;
    if rotated {
        surface.save();
        surface.rotate(element.rotation, element.normalized_rect().center());
    }
    {
        let paint = ctx.caches.paints.stroke(color, width);
        surface.draw_rect(element.normalized_rect(), &paint);
    }
    if show_handles {
        let points: Vec<Point> = resize_handle_positions(element).into_iter().map(|(_, p)| p).collect();
        draw_handles(surface, ctx, &points);
    }
    if rotated {
        surface.restore();
    }
}

/// Outline and (optionally) compass handles around an arbitrary box.
pub fn draw_bounds_selection(surface: &mut dyn Surface, ctx: &mut DrawContext<'_>, bounds: Rect, show_handles: bool) {
    let width = OUTLINE_WIDTH / ctx.zoom;
    {
        let paint = ctx.caches.paints.stroke(ctx.theme.selection(), width);
        surface.draw_rect(bounds, &paint);
    }
    if show_handles {
        draw_handles(surface, ctx, &box_handle_points(bounds));
    }
}

/// One dashed outline around a selected group's bounds. Groups get no resize
/// handles.
pub fn draw_group_outline(surface: &mut dyn Surface, ctx: &mut DrawContext<'_>, bounds: Rect) {
    let rect = bounds.inflate(GROUP_OUTLINE_PADDING / ctx.zoom, GROUP_OUTLINE_PADDING / ctx.zoom);
    let mut paint = ctx.caches.paints.stroke(ctx.theme.selection(), OUTLINE_WIDTH / ctx.zoom);
    paint.dash = Some(DashPattern {
        on: GROUP_DASH / ctx.zoom,
        off: GROUP_DASH / ctx.zoom,
        phase: 0.0,
    });
    surface.draw_rect(rect, &paint);
}

/// The in-progress marquee: a translucent fill plus a solid outline.
pub fn draw_box_selection(surface: &mut dyn Surface, ctx: &mut DrawContext<'_>, rect: Rect) {
    let rect = rect.abs();
    let color = ctx.theme.selection();
    {
        let paint = ctx.caches.paints.fill(color.multiply_alpha(BOX_SELECTION_FILL_ALPHA));
        surface.draw_rect(rect, &paint);
    }
    let paint = ctx.caches.paints.stroke(color, OUTLINE_WIDTH / ctx.zoom);
    surface.draw_rect(rect, &paint);
}

/// Smart-guide lines.
pub fn draw_guides(surface: &mut dyn Surface, ctx: &mut DrawContext<'_>, guides: &[AlignmentGuide]) {
    if guides.is_empty() {
        return;
    }
    let paint = ctx.caches.paints.stroke(ctx.theme.guide(), OUTLINE_WIDTH / ctx.zoom);
    for guide in guides {
        let (from, to) = match guide.axis {
            GuideAxis::Vertical => (
                Point::new(guide.position, guide.start),
                Point::new(guide.position, guide.end),
            ),
            GuideAxis::Horizontal => (
                Point::new(guide.start, guide.position),
                Point::new(guide.end, guide.position),
            ),
        };
        surface.draw_line(from, to, &paint);
    }
}

/// Corners, then edge midpoints.
fn box_handle_points(r: Rect) -> [Point; 8] {
    let c = r.center();
    [
        Point::new(r.x0, r.y0),
        Point::new(r.x1, r.y0),
        Point::new(r.x1, r.y1),
        Point::new(r.x0, r.y1),
        Point::new(c.x, r.y0),
        Point::new(r.x1, c.y),
        Point::new(c.x, r.y1),
        Point::new(r.x0, c.y),
    ]
}

fn draw_handles(surface: &mut dyn Surface, ctx: &mut DrawContext<'_>, points: &[Point]) {
    let (size, _) = handle_metrics(ctx.zoom);
    let half = size / 2.0;
    let fill = ctx.caches.paints.fill(Color::WHITE);
    let stroke = ctx.caches.paints.stroke(ctx.theme.selection(), OUTLINE_WIDTH / ctx.zoom);
    for p in points {
        let rect = Rect::new(p.x - half, p.y - half, p.x + half, p.y + half);
        surface.draw_rect(rect, &fill);
        surface.draw_rect(rect, &stroke);
    }
}
