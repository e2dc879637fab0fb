//! Rectangle, ellipse and frame bodies.
//!
//! Draw order: drop shadow, fill (with element blur), image fill, stroke,
//! inner shadow.

use super::{DrawContext, FillSource, blend_mix};
use crate::cache::{BlurVariant, PathCache};
use crate::effects::ColorMatrix;
use crate::surface::{DashPattern, Paint, Surface};
use clise_core::elements::{ImageFill, ImageFit, ImageRepeat};
use clise_core::geometry::{stroke_radius_delta, stroke_rect};
use clise_core::{Blur, BlurKind, CornerRadii, Element, Shadow, ShadowKind, StrokeDash, StrokePosition};
use kurbo::{BezPath, Ellipse, Point, Rect, Shape, Size, Vec2};
use peniko::{Color, Fill};
use std::sync::Arc;

const PATH_TOLERANCE: f64 = 0.1;
/// Upper bound on tiles drawn for one tiled image fill.
const MAX_TILES: usize = 4096;

// Glass composite passes.
const GLASS_BASE_ALPHA: f32 = 0.7;
const GLASS_OVERLAY_ALPHA: f32 = 0.15;
const GLASS_HIGHLIGHT_ALPHA: f32 = 0.3;

/// Outline of a shape body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeGeometry {
    Rect { rect: Rect, radii: CornerRadii },
    Oval(Rect),
}

impl ShapeGeometry {
    pub fn bounds(&self) -> Rect {
        match self {
            ShapeGeometry::Rect { rect, .. } | ShapeGeometry::Oval(rect) => *rect,
        }
    }

    fn with_rect(&self, rect: Rect, radius_delta: f64) -> Self {
        match self {
            ShapeGeometry::Rect { radii, .. } => ShapeGeometry::Rect {
                rect,
                radii: radii.offset(radius_delta),
            },
            ShapeGeometry::Oval(_) => ShapeGeometry::Oval(rect),
        }
    }

    pub fn translated(&self, offset: Vec2) -> Self {
        self.with_rect(self.bounds() + offset, 0.0)
    }

    /// Grow (or shrink, for negative `amount`) every side by `amount`.
    pub fn inflated(&self, amount: f64) -> Self {
        let rect = self.bounds();
        let amount = amount.max(-rect.width() / 2.0).max(-rect.height() / 2.0);
        self.with_rect(rect.inflate(amount, amount), amount)
    }

    /// Geometry a stroke of `width` is drawn on for `position`.
    pub fn stroked(&self, width: f64, position: StrokePosition) -> Self {
        self.with_rect(
            stroke_rect(self.bounds(), width, position),
            stroke_radius_delta(width, position),
        )
    }

    fn is_plain_rect(&self) -> bool {
        matches!(self, ShapeGeometry::Rect { radii, .. } if radii.is_zero())
    }

    /// Closed outline, cached for rounded rectangles.
    pub fn outline(&self, paths: &mut PathCache) -> Arc<BezPath> {
        match self {
            ShapeGeometry::Rect { rect, radii } => paths.rounded_rect(*rect, radii),
            ShapeGeometry::Oval(rect) => Arc::new(Ellipse::from_rect(*rect).to_path(PATH_TOLERANCE)),
        }
    }

    pub fn draw(&self, surface: &mut dyn Surface, paint: &Paint, paths: &mut PathCache) {
        match self {
            ShapeGeometry::Rect { rect, .. } if self.is_plain_rect() => surface.draw_rect(*rect, paint),
            ShapeGeometry::Rect { .. } => surface.draw_path(&self.outline(paths), paint),
            ShapeGeometry::Oval(rect) => surface.draw_oval(*rect, paint),
        }
    }

    pub fn clip(&self, surface: &mut dyn Surface, paths: &mut PathCache) {
        match self {
            ShapeGeometry::Rect { rect, .. } if self.is_plain_rect() => surface.clip_rect(*rect),
            _ => surface.clip_path(&self.outline(paths)),
        }
    }
}

/// Draw a rect, ellipse or frame body.
pub fn draw_shape(
    surface: &mut dyn Surface,
    ctx: &mut DrawContext<'_>,
    element: &Element,
    geometry: &ShapeGeometry,
    blur: Option<&Blur>,
) {
    let shadow = element.shadow.as_ref();
    if let Some(shadow) = shadow.filter(|s| s.kind == ShadowKind::Drop) {
        draw_drop_shadow(surface, ctx, element, geometry, shadow);
    }
    draw_fill(surface, ctx, element, geometry, blur);
    if let Some(fill) = &element.image_fill {
        draw_image_fill(surface, ctx, element, geometry, fill);
    }
    draw_stroke(surface, ctx, element, geometry);
    if let Some(shadow) = shadow.filter(|s| s.kind == ShadowKind::Inner) {
        draw_inner_shadow(surface, ctx, element, geometry, shadow);
    }
}

fn draw_drop_shadow(
    surface: &mut dyn Surface,
    ctx: &mut DrawContext<'_>,
    element: &Element,
    geometry: &ShapeGeometry,
    shadow: &Shadow,
) {
    let color = ctx.caches.colors.color(&shadow.color, shadow.opacity * element.opacity);
    if color.components[3] <= 0.0 {
        return;
    }
    let filter = ctx.caches.blurs.get(BlurVariant::Layer, shadow.blur);
    let cast = geometry
        .translated(Vec2::new(shadow.x, shadow.y))
        .inflated(shadow.spread);
    let mut paint = ctx.caches.paints.fill(color);
    paint.image_filter = filter;
    cast.draw(surface, &paint, &mut ctx.caches.paths);
}

fn draw_fill(
    surface: &mut dyn Surface,
    ctx: &mut DrawContext<'_>,
    element: &Element,
    geometry: &ShapeGeometry,
    blur: Option<&Blur>,
) {
    let Some(source) = FillSource::resolve(element.fill.as_ref(), geometry.bounds(), element.opacity, ctx.caches)
    else {
        return;
    };
    match blur.filter(|b| b.radius > 0.0) {
        Some(blur) if blur.kind == BlurKind::Background => draw_glass(surface, ctx, geometry, source, blur.radius),
        Some(blur) => {
            let filter = ctx.caches.blurs.get(BlurVariant::Layer, blur.radius);
            let mut paint = source.into_paint(&ctx.caches.paints);
            paint.image_filter = filter;
            geometry.draw(surface, &paint, &mut ctx.caches.paths);
        }
        None => {
            let paint = source.into_paint(&ctx.caches.paints);
            geometry.draw(surface, &paint, &mut ctx.caches.paths);
        }
    }
}

/// Frosted glass: blurred translucent base, soft white overlay, then a thin
/// inset highlight.
fn draw_glass(surface: &mut dyn Surface, ctx: &mut DrawContext<'_>, geometry: &ShapeGeometry, source: FillSource, radius: f64) {
    let base_filter = ctx.caches.blurs.get(BlurVariant::Background, radius);
    let overlay_filter = ctx.caches.blurs.get(BlurVariant::Glassy, radius / 2.0);
    {
        let mut base = source.into_paint(&ctx.caches.paints);
        base.color = base.color.multiply_alpha(GLASS_BASE_ALPHA);
        base.image_filter = base_filter;
        geometry.draw(surface, &base, &mut ctx.caches.paths);
    }
    {
        let mut overlay = ctx.caches.paints.fill(Color::WHITE.with_alpha(GLASS_OVERLAY_ALPHA));
        overlay.image_filter = overlay_filter;
        geometry.draw(surface, &overlay, &mut ctx.caches.paths);
    }
    let width = 1.0 / ctx.zoom;
    let highlight = ctx
        .caches
        .paints
        .stroke(Color::WHITE.with_alpha(GLASS_HIGHLIGHT_ALPHA), width);
    geometry
        .inflated(-width / 2.0)
        .draw(surface, &highlight, &mut ctx.caches.paths);
}

fn draw_image_fill(
    surface: &mut dyn Surface,
    ctx: &mut DrawContext<'_>,
    element: &Element,
    geometry: &ShapeGeometry,
    fill: &ImageFill,
) {
    let Some(image) = ctx.caches.images.get_cached_image(&fill.src) else {
        return;
    };
    let bounds = geometry.bounds();
    let natural = Size::new(image.width as f64, image.height as f64);
    if natural.is_zero_area() || bounds.is_zero_area() {
        return;
    }
    let src = natural.to_rect();
    let offset = Vec2::new(fill.offset_x, fill.offset_y);

    surface.save();
    geometry.clip(surface, &mut ctx.caches.paths);
    if fill.rotation != 0.0 {
        surface.rotate(fill.rotation, bounds.center());
    }
    let alpha = (fill.opacity * element.opacity).clamp(0.0, 1.0) as f32;
    let mut paint = ctx.caches.paints.fill(Color::WHITE.with_alpha(alpha));
    paint.blend_mode = blend_mix(fill.blend_mode);
    paint.color_filter = ColorMatrix::from_adjustments(&fill.adjustments);

    match fill.fit {
        ImageFit::Stretch => surface.draw_image(&image, src, bounds + offset, &paint),
        ImageFit::Fill | ImageFit::Cover | ImageFit::Contain => {
            let sx = bounds.width() / natural.width;
            let sy = bounds.height() / natural.height;
            let scale = if fill.fit == ImageFit::Contain { sx.min(sy) } else { sx.max(sy) };
            let size = natural * scale;
            let origin = Point::new(
                bounds.x0 + (bounds.width() - size.width) * fill.align_x,
                bounds.y0 + (bounds.height() - size.height) * fill.align_y,
            ) + offset;
            surface.draw_image(&image, src, Rect::from_origin_size(origin, size), &paint);
        }
        ImageFit::Tile => {
            let scale = if fill.scale.is_finite() && fill.scale > 0.0 { fill.scale } else { 1.0 };
            let tile = natural * scale;
            for (origin, flip_x, flip_y) in tile_origins(bounds, tile, offset, fill.repeat) {
                let dst = Rect::from_origin_size(Point::ZERO, tile);
                surface.save();
                surface.translate(
                    origin.x + if flip_x { tile.width } else { 0.0 },
                    origin.y + if flip_y { tile.height } else { 0.0 },
                );
                if flip_x || flip_y {
                    surface.scale(if flip_x { -1.0 } else { 1.0 }, if flip_y { -1.0 } else { 1.0 });
                }
                surface.draw_image(&image, src, dst, &paint);
                surface.restore();
            }
        }
    }
    surface.restore();
}

/// Tile placements covering `bounds`, with per-tile mirror flags.
fn tile_origins(bounds: Rect, tile: Size, offset: Vec2, repeat: ImageRepeat) -> Vec<(Point, bool, bool)> {
    if tile.width < 1e-3 || tile.height < 1e-3 {
        return Vec::new();
    }
    let anchor = bounds.origin() + offset;
    let first_col = ((bounds.x0 - anchor.x) / tile.width).floor() as i64;
    let first_row = ((bounds.y0 - anchor.y) / tile.height).floor() as i64;
    let cols = ((bounds.x1 - anchor.x) / tile.width).ceil() as i64 - first_col;
    let rows = ((bounds.y1 - anchor.y) / tile.height).ceil() as i64 - first_row;
    let mirror = repeat == ImageRepeat::Mirror;
    let mut out = Vec::new();
    for row in first_row..first_row + rows.max(0) {
        for col in first_col..first_col + cols.max(0) {
            if out.len() >= MAX_TILES {
                log::warn!("Image fill tiling capped at {MAX_TILES} tiles");
                return out;
            }
            let origin = Point::new(
                anchor.x + col as f64 * tile.width,
                anchor.y + row as f64 * tile.height,
            );
            out.push((origin, mirror && col.rem_euclid(2) == 1, mirror && row.rem_euclid(2) == 1));
        }
    }
    out
}

fn draw_stroke(surface: &mut dyn Surface, ctx: &mut DrawContext<'_>, element: &Element, geometry: &ShapeGeometry) {
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
    geometry
        .stroked(stroke.width, stroke.position)
        .draw(surface, &paint, &mut ctx.caches.paths);
}

/// Shadow recessed into the shape: a blurred even-odd ring around the
/// offset, spread-adjusted outline, clipped to the shape.
fn draw_inner_shadow(
    surface: &mut dyn Surface,
    ctx: &mut DrawContext<'_>,
    element: &Element,
    geometry: &ShapeGeometry,
    shadow: &Shadow,
) {
    let color = ctx.caches.colors.color(&shadow.color, shadow.opacity * element.opacity);
    if color.components[3] <= 0.0 {
        return;
    }
    let bounds = geometry.bounds();
    let margin = shadow.blur.max(0.0) * 2.0 + shadow.x.abs() + shadow.y.abs() + shadow.spread.abs() + 1.0;
    let hole = geometry
        .translated(Vec2::new(shadow.x, shadow.y))
        .inflated(-shadow.spread);
    let mut ring = bounds.inflate(margin, margin).to_path(PATH_TOLERANCE);
    ring.extend(hole.outline(&mut ctx.caches.paths).elements().iter().copied());

    surface.save();
    geometry.clip(surface, &mut ctx.caches.paths);
    let layer = Paint::default().with_filter(ctx.caches.blurs.get(BlurVariant::Layer, shadow.blur));
    surface.save_layer(Some(&layer));
    {
        let mut paint = ctx.caches.paints.fill(color);
        paint.fill_rule = Fill::EvenOdd;
        surface.draw_path(&ring, &paint);
    }
    surface.restore();
    surface.restore();
}
