use super::{DrawContext, FillSource};
use crate::surface::{DashPattern, Surface};
use clise_core::elements::PathProps;
use clise_core::hit_test::{PATH_ANCHOR_RADIUS, PATH_CONTROL_RADIUS};
use clise_core::{Element, StrokeDash};
use kurbo::{Point, Rect};
use peniko::Color;

/// Control-point handle color.
const CONTROL_COLOR: Color = Color::from_rgba8(249, 115, 22, 255);

/// Draw a path. Only closed paths are filled. When selected, anchor and
/// control handles are drawn on top; controls go above anchors so they win
/// the same hit-test ties.
pub fn draw_path(surface: &mut dyn Surface, ctx: &mut DrawContext<'_>, element: &Element, props: &PathProps, selected: bool) {
    let origin = Point::new(element.x, element.y);
    let path = props.to_bez_path(origin);

    if props.closed && props.points.len() > 2 {
        let source = FillSource::resolve(element.fill.as_ref(), element.normalized_rect(), element.opacity, ctx.caches);
        if let Some(source) = source {
            let paint = source.into_paint(&ctx.caches.paints);
            surface.draw_path(&path, &paint);
        }
    }

    if let Some(stroke) = element.stroke.as_ref().filter(|s| s.width.is_finite() && s.width > 0.0) {
        let color = ctx.caches.colors.color(&stroke.color, stroke.opacity * element.opacity);
        if color.components[3] > 0.0 {
            let mut paint = ctx.caches.paints.stroke(color, stroke.width);
            if stroke.style == StrokeDash::Dashed {
                paint.dash = Some(DashPattern::for_width(stroke.width));
            }
            surface.draw_path(&path, &paint);
        }
    }

    if selected {
        draw_path_handles(surface, ctx, origin, props);
    }
}

fn draw_path_handles(surface: &mut dyn Surface, ctx: &mut DrawContext<'_>, origin: Point, props: &PathProps) {
    let zoom = ctx.zoom;
    let accent = ctx.theme.selection();
    let line_width = 1.0 / zoom;
    let stroke = ctx.caches.paints.stroke(accent, line_width);

    let anchor_r = PATH_ANCHOR_RADIUS / zoom;
    let selected_fill = ctx.caches.paints.fill(accent);
    let plain_fill = ctx.caches.paints.fill(Color::WHITE);
    for point in &props.points {
        let at = Point::new(origin.x + point.x, origin.y + point.y);
        let circle = circle_rect(at, anchor_r);
        let fill = if point.selected { &selected_fill } else { &plain_fill };
        surface.draw_oval(circle, fill);
        surface.draw_oval(circle, &stroke);
    }

    let control_r = PATH_CONTROL_RADIUS / zoom;
    let control_fill = ctx.caches.paints.fill(CONTROL_COLOR);
    let guide = ctx.caches.paints.stroke(CONTROL_COLOR, line_width);
    for point in &props.points {
        let Some(curve) = point.curve else {
            continue;
        };
        let anchor = Point::new(origin.x + point.x, origin.y + point.y);
        let controls = std::iter::once(curve.cp1).chain(curve.cp2);
        for cp in controls {
            let at = Point::new(origin.x + cp.x, origin.y + cp.y);
            surface.draw_line(anchor, at, &guide);
            surface.draw_oval(circle_rect(at, control_r), &control_fill);
        }
    }
}

fn circle_rect(center: Point, radius: f64) -> Rect {
    Rect::from_center_size(center, (radius * 2.0, radius * 2.0))
}

#[cfg(test)]
mod tests {
    use crate::cache::RenderCaches;
    use crate::draw::{DrawContext, draw_element};
    use crate::renderer::Theme;
    use crate::surface::{DrawCommand, RecordingSurface};
    use clise_core::Element;
    use clise_core::elements::{CurveKind, PathPoint};
    use kurbo::{PathEl, Point};

    fn record(element: &Element, selected: bool, zoom: f64) -> Vec<DrawCommand> {
        let mut caches = RenderCaches::default();
        let mut surface = RecordingSurface::new();
        let mut ctx = DrawContext::new(&mut caches, zoom, Theme::Light);
        draw_element(&mut surface, &mut ctx, element, selected);
        surface.take_commands()
    }

    fn triangle(closed: bool) -> Element {
        let points = vec![PathPoint::new(0.0, 0.0), PathPoint::new(10.0, 0.0), PathPoint::new(5.0, 10.0)];
        Element::path(100.0, 100.0, points, closed)
            .with_fill("#ff0000")
            .with_stroke("#000000", 2.0)
    }

    fn paths(commands: &[DrawCommand]) -> usize {
        commands.iter().filter(|c| matches!(c, DrawCommand::Path { .. })).count()
    }

    #[test]
    fn test_fill_only_when_closed() {
        assert_eq!(paths(&record(&triangle(true), false, 1.0)), 2);
        assert_eq!(paths(&record(&triangle(false), false, 1.0)), 1);
    }

    #[test]
    fn test_path_is_in_world_space() {
        let commands = record(&triangle(false), false, 1.0);
        let path = commands.iter().find_map(|c| match c {
            DrawCommand::Path { path, .. } => Some(path.clone()),
            _ => None,
        });
        let first = path.unwrap().elements().first().copied();
        assert_eq!(first, Some(PathEl::MoveTo(Point::new(100.0, 100.0))));
    }

    #[test]
    fn test_curve_uses_previous_point_control() {
        let points = vec![
            PathPoint::new(0.0, 0.0).with_curve(CurveKind::Cubic, 5.0, -10.0),
            PathPoint::new(10.0, 0.0),
        ];
        let element = Element::path(0.0, 0.0, points, false).with_stroke("#000000", 1.0);
        let commands = record(&element, false, 1.0);
        let path = commands.iter().find_map(|c| match c {
            DrawCommand::Path { path, .. } => Some(path.clone()),
            _ => None,
        });
        assert!(matches!(
            path.unwrap().elements().get(1),
            Some(PathEl::QuadTo(ctrl, to)) if *ctrl == Point::new(5.0, -10.0) && *to == Point::new(10.0, 0.0)
        ));
    }

    #[test]
    fn test_selected_handles() {
        let mut points = vec![
            PathPoint::new(0.0, 0.0).with_curve(CurveKind::Quadratic, 5.0, -10.0),
            PathPoint::new(10.0, 0.0),
        ];
        points[1].selected = true;
        let element = Element::path(0.0, 0.0, points, false).with_stroke("#000000", 1.0);
        let commands = record(&element, true, 2.0);
        let ovals: Vec<_> = commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Oval { rect, paint } => Some((*rect, paint.color)),
                _ => None,
            })
            .collect();
        // two anchors (fill + ring) plus one control
        assert_eq!(ovals.len(), 5);
        assert!((ovals[0].0.width() - 4.0).abs() < 1e-9);
        assert_eq!(ovals[0].1, peniko::Color::WHITE);
        assert_eq!(ovals[2].1, Theme::Light.selection());
        assert!((ovals[4].0.width() - 3.0).abs() < 1e-9);
        assert_eq!(ovals[4].0.center(), Point::new(5.0, -10.0));
        assert!(commands.iter().any(|c| matches!(c, DrawCommand::Line { .. })));
    }
}
