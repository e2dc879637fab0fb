//! Text elements.
//!
//! Layout is deliberately simple: explicit line breaks only, a fixed
//! baseline progression and, when letter spacing is set, per-character
//! placement using the estimated glyph advance. Bold is simulated by a second
//! pass offset by half a pixel.

use super::{DrawContext, selection};
use crate::cache::BlurVariant;
use crate::surface::{FontSpec, Paint, Surface};
use clise_core::elements::{TextDecoration, TextProps};
use clise_core::{Element, ShadowKind};
use kurbo::{Point, Vec2};

const BOLD_OFFSET: f64 = 0.5;
const UNDERLINE_OFFSET: f64 = 0.1;
const LINE_THROUGH_OFFSET: f64 = -0.3;
const DECORATION_WIDTH: f64 = 1.0 / 16.0;

/// Draw a text element. Returns `true` when the selection overlay was drawn
/// here, so the caller should not draw the default one.
pub fn draw_text(
    surface: &mut dyn Surface,
    ctx: &mut DrawContext<'_>,
    element: &Element,
    props: &TextProps,
    selected: bool,
) -> bool {
    let display = props.display_text();
    let lines: Vec<&str> = display.split('\n').collect();
    let origin = Point::new(element.x, element.y);
    let font = FontSpec {
        family: props.font_family.clone(),
        size: props.font_size,
        weight: props.font_weight.0,
    };

    if props.font_size.is_finite() && props.font_size > 0.0 {
        if let Some(shadow) = element.shadow.as_ref().filter(|s| s.kind == ShadowKind::Drop) {
            let color = ctx.caches.colors.color(&shadow.color, shadow.opacity * element.opacity);
            if color.components[3] > 0.0 {
                let filter = ctx.caches.blurs.get(BlurVariant::Layer, shadow.blur);
                let mut paint = ctx.caches.paints.fill(color);
                paint.image_filter = filter;
                draw_lines(surface, props, &lines, origin + Vec2::new(shadow.x, shadow.y), &font, &paint);
            }
        }

        let hex = props
            .color
            .as_deref()
            .or_else(|| element.fill.as_ref().and_then(|f| f.fallback_color()))
            .unwrap_or("#000000");
        let color = ctx.caches.colors.color(hex, element.opacity);
        if color.components[3] > 0.0 {
            {
                let paint = ctx.caches.paints.fill(color);
                draw_lines(surface, props, &lines, origin, &font, &paint);
            }
            if props.text_decoration != TextDecoration::None {
                let width = (props.font_size * DECORATION_WIDTH).max(1.0);
                let paint = ctx.caches.paints.stroke(color, width);
                draw_decorations(surface, props, &lines, origin, &paint);
            }
        }
    }

    if selected {
        let bounds = props.estimate_bounds(element.x, element.y);
        selection::draw_bounds_selection(surface, ctx, bounds, !element.locked);
        return true;
    }
    false
}

fn draw_lines(surface: &mut dyn Surface, props: &TextProps, lines: &[&str], origin: Point, font: &FontSpec, paint: &Paint) {
    let bold = props.font_weight.is_bold();
    for (i, line) in lines.iter().enumerate() {
        if line.is_empty() {
            continue;
        }
        let baseline = Point::new(origin.x, origin.y + props.baseline_offset(i, lines.len()));
        draw_run(surface, props, line, baseline, font, paint);
        if bold {
            draw_run(surface, props, line, baseline + Vec2::new(BOLD_OFFSET, 0.0), font, paint);
        }
    }
}

fn draw_run(surface: &mut dyn Surface, props: &TextProps, line: &str, baseline: Point, font: &FontSpec, paint: &Paint) {
    if props.letter_spacing == 0.0 {
        surface.draw_text(line, baseline, font, paint);
        return;
    }
    let step = props.glyph_advance() + props.letter_spacing;
    let mut buf = [0u8; 4];
    for (k, ch) in line.chars().enumerate() {
        let at = baseline + Vec2::new(k as f64 * step, 0.0);
        surface.draw_text(ch.encode_utf8(&mut buf), at, font, paint);
    }
}

fn draw_decorations(surface: &mut dyn Surface, props: &TextProps, lines: &[&str], origin: Point, paint: &Paint) {
    let offset = match props.text_decoration {
        TextDecoration::None => return,
        TextDecoration::Underline => UNDERLINE_OFFSET,
        TextDecoration::LineThrough => LINE_THROUGH_OFFSET,
    } * props.font_size;
    for (i, line) in lines.iter().enumerate() {
        let width = props.estimate_line_width(line);
        if width <= 0.0 {
            continue;
        }
        let y = origin.y + props.baseline_offset(i, lines.len()) + offset;
        surface.draw_line(Point::new(origin.x, y), Point::new(origin.x + width, y), paint);
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::RenderCaches;
    use crate::draw::{DrawContext, draw_element};
    use crate::renderer::Theme;
    use crate::surface::{DrawCommand, RecordingSurface};
    use clise_core::elements::{FontWeight, TextDecoration, TextTransform};
    use clise_core::{Element, ElementKind};

    fn text_element(content: &str, edit: impl FnOnce(&mut clise_core::elements::TextProps)) -> Element {
        let mut element = Element::text(10.0, 20.0, content);
        if let ElementKind::Text(props) = &mut element.kind {
            props.font_size = 10.0;
            edit(props);
        }
        element
    }

    fn record(element: &Element, selected: bool) -> (Vec<DrawCommand>, bool) {
        let mut caches = RenderCaches::default();
        let mut surface = RecordingSurface::new();
        let mut ctx = DrawContext::new(&mut caches, 1.0, Theme::Light);
        let handled = draw_element(&mut surface, &mut ctx, element, selected);
        (surface.take_commands(), handled)
    }

    fn texts(commands: &[DrawCommand]) -> Vec<(String, f64, f64)> {
        commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, origin, .. } => Some((text.clone(), origin.x, origin.y)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_baselines() {
        let single = text_element("one", |_| {});
        let (commands, _) = record(&single, false);
        assert_eq!(texts(&commands), vec![("one".to_string(), 10.0, 30.0)]);

        let multi = text_element("a\nb", |p| p.line_height = Some(1.5));
        let (commands, _) = record(&multi, false);
        assert_eq!(
            texts(&commands),
            vec![("a".to_string(), 10.0, 30.0), ("b".to_string(), 10.0, 45.0)]
        );
    }

    #[test]
    fn test_transform_and_letter_spacing() {
        let element = text_element("ab", |p| {
            p.text_transform = TextTransform::Uppercase;
            p.letter_spacing = 2.0;
        });
        let (commands, _) = record(&element, false);
        // advance = 10 * 0.6 + 2
        assert_eq!(
            texts(&commands),
            vec![("A".to_string(), 10.0, 30.0), ("B".to_string(), 18.0, 30.0)]
        );
    }

    #[test]
    fn test_fake_bold_draws_twice() {
        let element = text_element("x", |p| p.font_weight = FontWeight::BOLD);
        let (commands, _) = record(&element, false);
        assert_eq!(
            texts(&commands),
            vec![("x".to_string(), 10.0, 30.0), ("x".to_string(), 10.5, 30.0)]
        );
    }

    #[test]
    fn test_underline() {
        let element = text_element("abc", |p| p.text_decoration = TextDecoration::Underline);
        let (commands, _) = record(&element, false);
        let line = commands.iter().find_map(|c| match c {
            DrawCommand::Line { from, to, .. } => Some((*from, *to)),
            _ => None,
        });
        let (from, to) = line.unwrap();
        assert!((from.y - 31.0).abs() < 1e-9);
        assert!((to.x - from.x - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_selected_text_draws_own_selection() {
        let element = text_element("abc", |_| {});
        let (_, handled) = record(&element, false);
        assert!(!handled);
        let (commands, handled) = record(&element, true);
        assert!(handled);
        assert!(commands.iter().any(|c| matches!(c, DrawCommand::Rect { .. })));
    }
}
