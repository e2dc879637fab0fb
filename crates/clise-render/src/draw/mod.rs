//! Per-element renderers.
//!
//! Each renderer draws one [`ElementKind`] variant in world coordinates onto a
//! [`Surface`] whose transform already maps world space to the screen.

pub mod image;
pub mod line;
pub mod path;
pub mod selection;
pub mod shape;
pub mod text;

use crate::cache::{PaintPool, PooledPaint, RenderCaches, build_gradient};
use crate::renderer::Theme;
use crate::surface::{FontSpec, Paint, Surface};
use clise_core::{BlendMode, Element, ElementKind, Fill};
use kurbo::{Point, Rect};
use peniko::{Color, Gradient, Mix};
use shape::ShapeGeometry;
use std::ops::{Deref, DerefMut};

/// Frame label size in screen pixels.
const FRAME_LABEL_SIZE: f64 = 12.0;
/// Gap between a frame's top edge and its label baseline, in screen pixels.
const FRAME_LABEL_GAP: f64 = 6.0;

/// Shared state for drawing one frame.
#[derive(Debug)]
pub struct DrawContext<'a> {
    pub caches: &'a mut RenderCaches,
    /// Current zoom; used to keep overlays a constant screen size.
    pub zoom: f64,
    pub theme: Theme,
}

impl<'a> DrawContext<'a> {
    pub fn new(caches: &'a mut RenderCaches, zoom: f64, theme: Theme) -> Self {
        let zoom = if zoom.is_finite() && zoom > 0.0 { zoom } else { 1.0 };
        Self { caches, zoom, theme }
    }
}

/// Map an element blend mode to the compositor's.
pub fn blend_mix(mode: BlendMode) -> Mix {
    match mode {
        BlendMode::Normal => Mix::Normal,
        BlendMode::Multiply => Mix::Multiply,
        BlendMode::Screen => Mix::Screen,
        BlendMode::Overlay => Mix::Overlay,
        BlendMode::Darken => Mix::Darken,
        BlendMode::Lighten => Mix::Lighten,
        BlendMode::ColorDodge => Mix::ColorDodge,
        BlendMode::ColorBurn => Mix::ColorBurn,
        BlendMode::HardLight => Mix::HardLight,
        BlendMode::SoftLight => Mix::SoftLight,
        BlendMode::Difference => Mix::Difference,
        BlendMode::Exclusion => Mix::Exclusion,
        BlendMode::Hue => Mix::Hue,
        BlendMode::Saturation => Mix::Saturation,
        BlendMode::Color => Mix::Color,
        BlendMode::Luminosity => Mix::Luminosity,
    }
}

/// A resolved fill: a flat color or a gradient shader.
#[derive(Debug, Clone)]
pub enum FillSource {
    Solid(Color),
    Shader(Gradient),
}

impl FillSource {
    /// Resolve an element fill against `bounds`; `None` when nothing would be
    /// painted.
    pub fn resolve(fill: Option<&Fill>, bounds: Rect, opacity: f64, caches: &mut RenderCaches) -> Option<Self> {
        match fill? {
            Fill::Solid(hex) => {
                let color = caches.colors.color(hex, opacity);
                (color.components[3] > 0.0).then_some(FillSource::Solid(color))
            }
            Fill::Gradient(def) => build_gradient(def, bounds, opacity, &mut caches.colors).map(FillSource::Shader),
        }
    }

    /// A fill paint for this source. Solid colors come from the pool;
    /// shaders get a one-off paint.
    pub fn into_paint(self, pool: &PaintPool) -> ScopedPaint<'_> {
        match self {
            FillSource::Solid(color) => ScopedPaint::Pooled(pool.fill(color)),
            FillSource::Shader(gradient) => {
                let mut paint = Paint::fill(Color::WHITE);
                paint.shader = Some(gradient);
                ScopedPaint::Owned(paint)
            }
        }
    }
}

/// Either a pooled paint or a one-off one.
#[derive(Debug)]
pub enum ScopedPaint<'a> {
    Pooled(PooledPaint<'a>),
    Owned(Paint),
}

impl Deref for ScopedPaint<'_> {
    type Target = Paint;

    fn deref(&self) -> &Paint {
        match self {
            ScopedPaint::Pooled(paint) => &**paint,
            ScopedPaint::Owned(paint) => paint,
        }
    }
}

impl DerefMut for ScopedPaint<'_> {
    fn deref_mut(&mut self) -> &mut Paint {
        match self {
            ScopedPaint::Pooled(paint) => &mut **paint,
            ScopedPaint::Owned(paint) => paint,
        }
    }
}

/// Draw `element`, returning `true` when it already drew its own selection
/// overlay.
pub fn draw_element(surface: &mut dyn Surface, ctx: &mut DrawContext<'_>, element: &Element, selected: bool) -> bool {
    if !element.is_finite() {
        log::warn!("Skipping element {} with non-finite geometry", element.id);
        return false;
    }
    let rotated = element.rotation != 0.0 && !matches!(element.kind, ElementKind::Line(_));
    if rotated {
        surface.save();
        surface.rotate(element.rotation, element.normalized_rect().center());
    }
    let handled = match &element.kind {
        ElementKind::Rect(props) => {
            let geometry = ShapeGeometry::Rect {
                rect: element.normalized_rect(),
                radii: props.radius,
            };
            shape::draw_shape(surface, ctx, element, &geometry, props.blur.as_ref());
            false
        }
        ElementKind::Ellipse(props) => {
            let geometry = ShapeGeometry::Oval(element.normalized_rect());
            shape::draw_shape(surface, ctx, element, &geometry, props.blur.as_ref());
            false
        }
        ElementKind::Frame(_) => {
            draw_frame(surface, ctx, element);
            false
        }
        ElementKind::Text(props) => text::draw_text(surface, ctx, element, props, selected),
        ElementKind::Line(props) => {
            line::draw_line(surface, ctx, element, props);
            false
        }
        ElementKind::Path(props) => {
            path::draw_path(surface, ctx, element, props, selected);
            false
        }
        ElementKind::Image(props) => {
            image::draw_image(surface, ctx, element, props);
            false
        }
    };
    if rotated {
        surface.restore();
    }
    handled
}

/// Frame body (a square-cornered rect) plus its name label.
fn draw_frame(surface: &mut dyn Surface, ctx: &mut DrawContext<'_>, element: &Element) {
    let rect = element.normalized_rect();
    let geometry = ShapeGeometry::Rect {
        rect,
        radii: Default::default(),
    };
    shape::draw_shape(surface, ctx, element, &geometry, None);

    if element.name.is_empty() {
        return;
    }
    let font = FontSpec::new("Inter", FRAME_LABEL_SIZE / ctx.zoom);
    let origin = Point::new(rect.x0, rect.y0 - FRAME_LABEL_GAP / ctx.zoom);
    let paint = ctx.caches.paints.fill(ctx.theme.frame_label());
    surface.draw_text(&element.name, origin, &font, &paint);
}
