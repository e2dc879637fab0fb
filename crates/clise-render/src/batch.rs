//! Paint sharing for runs of visually identical elements.
//!
//! A batch shares one fill paint and one stroke paint, built from its first
//! element. Gradient fills are flattened to their first stop, so batching
//! only pays off for flat-color scenes. Elements that need per-element
//! effects (shadows, image fills, glass blur, dashed or offset strokes) and
//! kinds with their own state (text, images, frames) are never batched.

use crate::cache::BlurVariant;
use crate::draw::shape::ShapeGeometry;
use crate::draw::{DrawContext, draw_element};
use crate::surface::Surface;
use clise_core::{BlurKind, Element, ElementKind, ElementType, StrokeDash, StrokePosition};
use kurbo::Point;
use std::collections::HashMap;

/// Visual properties shared by every element of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BatchKey {
    pub kind: ElementType,
    pub fill: Option<String>,
    pub stroke_color: Option<String>,
    stroke_width: u64,
    stroke_opacity: u64,
    opacity: u64,
    blur: u64,
}

impl BatchKey {
    /// Key for `element`, or `None` when it must be drawn individually.
    pub fn for_element(element: &Element) -> Option<Self> {
        let blur = match &element.kind {
            ElementKind::Rect(props) => props.blur,
            ElementKind::Ellipse(props) => props.blur,
            ElementKind::Line(_) | ElementKind::Path(_) => None,
            ElementKind::Text(_) | ElementKind::Image(_) | ElementKind::Frame(_) => return None,
        };
        if blur.is_some_and(|b| b.kind == BlurKind::Background) {
            return None;
        }
        if element.shadow.is_some() || element.image_fill.is_some() {
            return None;
        }
        if let Some(stroke) = &element.stroke {
            let offset = stroke.position != StrokePosition::Center && element.element_type() != ElementType::Line;
            if stroke.style == StrokeDash::Dashed || offset {
                return None;
            }
        }
        let stroke = element.stroke.as_ref();
        Some(Self {
            kind: element.element_type(),
            fill: element.fill.as_ref().map(|f| f.cache_key()),
            stroke_color: stroke.map(|s| s.color.clone()),
            stroke_width: stroke.map_or(0.0, |s| s.width).to_bits(),
            stroke_opacity: stroke.map_or(0.0, |s| s.opacity).to_bits(),
            opacity: element.opacity.to_bits(),
            blur: blur.map_or(0.0, |b| b.radius).to_bits(),
        })
    }
}

/// Elements that draw with the same shared paints. `key` is `None` for a
/// single element that is drawn on its own.
#[derive(Debug, Clone)]
pub struct Batch<'a> {
    pub key: Option<BatchKey>,
    pub elements: Vec<&'a Element>,
}

impl Batch<'_> {
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Partition `elements` by [`BatchKey`]. Batches appear in the order of their
/// first element and keep their members' relative order; unbatchable elements
/// become single-element batches.
pub fn group_elements_for_batching<'a>(elements: &[&'a Element]) -> Vec<Batch<'a>> {
    let mut batches: Vec<Batch<'a>> = Vec::new();
    let mut index: HashMap<BatchKey, usize> = HashMap::new();
    for &element in elements {
        match BatchKey::for_element(element) {
            Some(key) => match index.get(&key) {
                Some(&i) => batches[i].elements.push(element),
                None => {
                    index.insert(key.clone(), batches.len());
                    batches.push(Batch {
                        key: Some(key),
                        elements: vec![element],
                    });
                }
            },
            None => batches.push(Batch {
                key: None,
                elements: vec![element],
            }),
        }
    }
    batches
}

/// Draw every element of `batch` in order.
pub fn render_batch(surface: &mut dyn Surface, ctx: &mut DrawContext<'_>, batch: &Batch<'_>) {
    let Some(first) = batch.elements.first() else {
        return;
    };
    if batch.key.is_none() {
        for element in &batch.elements {
            draw_element(surface, ctx, element, false);
        }
        return;
    }

    let fill_color = first
        .fill
        .as_ref()
        .and_then(|f| f.fallback_color())
        .map(|hex| ctx.caches.colors.color(hex, first.opacity))
        .filter(|c| c.components[3] > 0.0);
    let stroke_color = first
        .stroke
        .as_ref()
        .filter(|s| s.width.is_finite() && s.width > 0.0)
        .map(|s| (ctx.caches.colors.color(&s.color, s.opacity * first.opacity), s.width))
        .filter(|(c, _)| c.components[3] > 0.0);
    let blur_radius = match &first.kind {
        ElementKind::Rect(props) => props.blur.map(|b| b.radius),
        ElementKind::Ellipse(props) => props.blur.map(|b| b.radius),
        _ => None,
    };
    let filter = blur_radius.and_then(|r| ctx.caches.blurs.get(BlurVariant::Layer, r));

    let fill = fill_color.map(|color| {
        let mut paint = ctx.caches.paints.fill(color);
        paint.image_filter = filter;
        paint
    });
    let stroke = stroke_color.map(|(color, width)| ctx.caches.paints.stroke(color, width));

    for element in &batch.elements {
        if !element.is_finite() {
            log::warn!("Skipping element {} with non-finite geometry", element.id);
            continue;
        }
        let rotated = element.rotation != 0.0 && element.element_type() != ElementType::Line;
        if rotated {
            surface.save();
            surface.rotate(element.rotation, element.normalized_rect().center());
        }
        match &element.kind {
            ElementKind::Rect(props) => {
                let geometry = ShapeGeometry::Rect {
                    rect: element.normalized_rect(),
                    radii: props.radius,
                };
                for paint in fill.iter().chain(stroke.iter()) {
                    geometry.draw(surface, paint, &mut ctx.caches.paths);
                }
            }
            ElementKind::Ellipse(_) => {
                let rect = element.normalized_rect();
                for paint in fill.iter().chain(stroke.iter()) {
                    surface.draw_oval(rect, paint);
                }
            }
            ElementKind::Line(props) => {
                if let Some(paint) = &stroke {
                    surface.draw_line(Point::new(element.x, element.y), Point::new(props.x2, props.y2), paint);
                }
            }
            ElementKind::Path(props) => {
                let path = props.to_bez_path(Point::new(element.x, element.y));
                if props.closed && props.points.len() > 2 {
                    if let Some(paint) = &fill {
                        surface.draw_path(&path, paint);
                    }
                }
                if let Some(paint) = &stroke {
                    surface.draw_path(&path, paint);
                }
            }
            // Keyed batches never hold these kinds.
            ElementKind::Text(_) | ElementKind::Image(_) | ElementKind::Frame(_) => {}
        }
        if rotated {
            surface.restore();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::RenderCaches;
    use crate::renderer::Theme;
    use crate::surface::{DrawCommand, RecordingSurface};
    use clise_core::{CornerRadii, Fill, GradientDef, GradientStop, Shadow, ShadowKind};
    use std::sync::Arc;

    fn red_rect(x: f64) -> Element {
        Element::rect(x, 0.0, 10.0, 10.0).with_fill("#ff0000")
    }

    #[test]
    fn test_grouping_by_visual_key() {
        let a = red_rect(0.0);
        let b = red_rect(20.0);
        let c = Element::rect(40.0, 0.0, 10.0, 10.0).with_fill("#00ff00");
        let d = Element::ellipse(60.0, 0.0, 10.0, 10.0).with_fill("#ff0000");
        let t = Element::text(0.0, 0.0, "hi");
        let t2 = Element::text(0.0, 50.0, "hi");
        let mut faded = red_rect(80.0);
        faded.opacity = 0.5;
        let refs = vec![&a, &t, &b, &c, &d, &t2, &faded];
        let batches = group_elements_for_batching(&refs);
        let sizes: Vec<(bool, usize)> = batches.iter().map(|b| (b.key.is_some(), b.len())).collect();
        assert_eq!(
            sizes,
            vec![(true, 2), (false, 1), (true, 1), (true, 1), (false, 1), (true, 1)]
        );
        assert_eq!(batches[0].elements[1].id, b.id);
    }

    #[test]
    fn test_effects_are_not_batched() {
        let mut shadowed = red_rect(0.0);
        shadowed.shadow = Some(Shadow {
            kind: ShadowKind::Drop,
            x: 2.0,
            y: 2.0,
            blur: 4.0,
            color: "#000000".into(),
            opacity: 0.5,
            spread: 0.0,
        });
        assert!(BatchKey::for_element(&shadowed).is_none());
        let mut dashed = red_rect(0.0).with_stroke("#000000", 1.0);
        if let Some(stroke) = &mut dashed.stroke {
            stroke.style = StrokeDash::Dashed;
        }
        assert!(BatchKey::for_element(&dashed).is_none());
        assert!(BatchKey::for_element(&Element::frame(0.0, 0.0, 1.0, 1.0)).is_none());
    }

    #[test]
    fn test_batch_shares_paints() {
        let elements: Vec<Element> = (0..4).map(|i| red_rect(i as f64 * 20.0).with_stroke("#000000", 2.0)).collect();
        let refs: Vec<&Element> = elements.iter().collect();
        let batches = group_elements_for_batching(&refs);
        assert_eq!(batches.len(), 1);

        let mut caches = RenderCaches::default();
        let mut surface = RecordingSurface::new();
        {
            let mut ctx = DrawContext::new(&mut caches, 1.0, Theme::Light);
            render_batch(&mut surface, &mut ctx, &batches[0]);
        }
        assert_eq!(surface.draw_count(), 8);
        // one fill and one stroke paint for the whole batch
        assert_eq!(caches.paints.allocations(), 2);
        let xs: Vec<f64> = surface
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Rect { rect, paint } if paint.style == crate::surface::PaintStyle::Fill => Some(rect.x0),
                _ => None,
            })
            .collect();
        assert_eq!(xs, vec![0.0, 20.0, 40.0, 60.0]);
    }

    #[test]
    fn test_gradient_fill_uses_first_stop() {
        let mut rect = Element::rect(0.0, 0.0, 10.0, 10.0);
        rect.fill = Some(Fill::Gradient(GradientDef::linear(
            90.0,
            vec![
                GradientStop {
                    color: "#0000ff".into(),
                    offset: 0.0,
                    opacity: 1.0,
                },
                GradientStop {
                    color: "#ffffff".into(),
                    offset: 1.0,
                    opacity: 1.0,
                },
            ],
        )));
        let refs = vec![&rect];
        let batches = group_elements_for_batching(&refs);
        let mut caches = RenderCaches::default();
        let mut surface = RecordingSurface::new();
        let mut ctx = DrawContext::new(&mut caches, 1.0, Theme::Light);
        render_batch(&mut surface, &mut ctx, &batches[0]);
        assert!(matches!(
            surface.commands(),
            [DrawCommand::Rect { paint, .. }] if paint.shader.is_none() && paint.color == peniko::Color::from_rgba8(0, 0, 255, 255)
        ));
    }

    #[test]
    fn test_rounded_rects_reuse_cached_path() {
        let mut a = red_rect(0.0);
        if let ElementKind::Rect(props) = &mut a.kind {
            props.radius = CornerRadii::uniform(3.0);
        }
        let refs = vec![&a, &a];
        let batches = group_elements_for_batching(&refs);
        let mut caches = RenderCaches::default();
        {
            let mut surface = RecordingSurface::new();
            let mut ctx = DrawContext::new(&mut caches, 1.0, Theme::Light);
            render_batch(&mut surface, &mut ctx, &batches[0]);
        }
        assert_eq!(caches.paths.len(), 1);
        let radii = CornerRadii::uniform(3.0);
        let first = caches.paths.rounded_rect(a.normalized_rect(), &radii);
        let second = caches.paths.rounded_rect(a.normalized_rect(), &radii);
        assert!(Arc::ptr_eq(&first, &second));
    }
}
