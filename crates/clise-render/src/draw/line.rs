use super::DrawContext;
use crate::surface::{DashPattern, Surface};
use clise_core::elements::LineProps;
use clise_core::{Element, StrokeDash};
use kurbo::Point;

/// Draw a straight line. Nothing is drawn for a transparent or zero-width
/// stroke.
pub fn draw_line(surface: &mut dyn Surface, ctx: &mut DrawContext<'_>, element: &Element, props: &LineProps) {
    let Some(stroke) = &element.stroke else {
        return;
    };
    if !stroke.width.is_finite() || stroke.width <= 0.0 {
        return;
    }
    let color = ctx.caches.colors.color(&stroke.color, stroke.opacity * element.opacity);
    if color.components[3] <= 0.0 {
        return;
    }
    let mut paint = ctx.caches.paints.stroke(color, stroke.width);
    if stroke.style == StrokeDash::Dashed {
        paint.dash = Some(DashPattern::for_width(stroke.width));
    }
    surface.draw_line(Point::new(element.x, element.y), Point::new(props.x2, props.y2), &paint);
}
