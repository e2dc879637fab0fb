//! Vello-backed [`Surface`].
//!
//! Draw calls are encoded into a [`vello::Scene`]; the host renders that
//! scene with its own `vello::Renderer`. Saved layers and clips map to Vello
//! layers, and each save frame remembers how many layers it pushed so
//! `restore` can pop exactly those.

use crate::surface::{FontSpec, Paint, PaintStyle, Surface};
use kurbo::{Affine, BezPath, Ellipse, Line, Point, Rect, Shape, Size};
use parley::layout::PositionedLayoutItem;
use parley::{FontContext, LayoutContext, StyleProperty};
use peniko::{Blob, Brush, Color, Fill, ImageBrush, ImageData, Mix};
use std::sync::Arc;
use vello::Scene;

/// Clip used for layers that only exist for blending or opacity.
const UNBOUNDED: Rect = Rect::new(-1e9, -1e9, 1e9, 1e9);

#[derive(Debug, Clone, Copy)]
struct SaveFrame {
    transform: Affine,
    layers: usize,
}

/// GPU surface encoding into a Vello [`Scene`].
pub struct VelloSurface {
    scene: Scene,
    /// Target size in device pixels, used by [`Surface::clear`].
    size: Size,
    transform: Affine,
    /// Layers pushed since the innermost save.
    layers: usize,
    stack: Vec<SaveFrame>,
    font_cx: FontContext,
    layout_cx: LayoutContext<Brush>,
}

impl std::fmt::Debug for VelloSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VelloSurface")
            .field("size", &self.size)
            .field("transform", &self.transform)
            .field("depth", &self.stack.len())
            .finish_non_exhaustive()
    }
}

impl VelloSurface {
    /// Create a surface for a target of `size` device pixels.
    pub fn new(size: Size) -> Self {
        Self {
            scene: Scene::new(),
            size,
            transform: Affine::IDENTITY,
            layers: 0,
            stack: Vec::new(),
            font_cx: FontContext::new(),
            layout_cx: LayoutContext::new(),
        }
    }

    /// Register extra font data (TTF/OTF/collections).
    pub fn register_font(&mut self, data: Vec<u8>) {
        self.font_cx.collection.register_fonts(Blob::new(Arc::new(data)), None);
    }

    /// Get the built scene for rendering.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Take ownership of the scene (resets internal scene).
    pub fn take_scene(&mut self) -> Scene {
        std::mem::take(&mut self.scene)
    }

    /// Start a new frame, possibly at a new size.
    pub fn reset(&mut self, size: Size) {
        self.scene.reset();
        self.size = size;
        self.transform = Affine::IDENTITY;
        self.layers = 0;
        self.stack.clear();
    }

    /// Number of unmatched `save`/`save_layer` calls.
    pub fn save_depth(&self) -> usize {
        self.stack.len()
    }

    fn push_clip(&mut self, shape: &impl Shape) {
        self.scene.push_clip_layer(self.transform, shape);
        self.layers += 1;
    }

    fn fill_shape(&mut self, shape: &impl Shape, paint: &Paint) {
        self.scene.fill(paint.fill_rule, self.transform, &paint.brush(), None, shape);
    }

    fn stroke_shape(&mut self, shape: &impl Shape, paint: &Paint) {
        self.scene
            .stroke(&paint.kurbo_stroke(), self.transform, &paint.brush(), None, shape);
    }

    /// Blend modes other than normal need an isolated layer.
    fn with_blend(&mut self, paint: &Paint, bounds: Rect, draw: impl FnOnce(&mut Self)) {
        if paint.blend_mode == Mix::Normal {
            draw(self);
            return;
        }
        self.scene.push_layer(paint.blend_mode, 1.0, self.transform, &bounds);
        draw(self);
        self.scene.pop_layer();
    }

    /// Blurred fills of rects and ovals map to Vello's blurred rounded rect.
    fn draw_blurred(&mut self, rect: Rect, corner: f64, paint: &Paint) -> bool {
        let Some(filter) = &paint.image_filter else {
            return false;
        };
        if paint.style != PaintStyle::Fill || paint.shader.is_some() {
            return false;
        }
        self.scene
            .draw_blurred_rounded_rect(self.transform, rect, paint.color, corner, filter.sigma());
        true
    }

    fn draw_shape(&mut self, shape: &impl Shape, paint: &Paint) {
        if paint.is_invisible() {
            return;
        }
        let bounds = shape.bounding_box();
        self.with_blend(paint, bounds, |surface| match paint.style {
            PaintStyle::Fill => surface.fill_shape(shape, paint),
            PaintStyle::Stroke => surface.stroke_shape(shape, paint),
        });
    }
}

impl Surface for VelloSurface {
    fn clear(&mut self, color: Color) {
        self.scene
            .fill(Fill::NonZero, Affine::IDENTITY, color, None, &self.size.to_rect());
    }

    fn save(&mut self) {
        self.stack.push(SaveFrame {
            transform: self.transform,
            layers: self.layers,
        });
        self.layers = 0;
    }

    fn save_layer(&mut self, paint: Option<&Paint>) {
        self.save();
        let (blend, alpha) = paint.map_or((Mix::Normal, 1.0), |p| (p.blend_mode, p.alpha()));
        self.scene.push_layer(blend, alpha, self.transform, &UNBOUNDED);
        self.layers += 1;
    }

    fn restore(&mut self) {
        for _ in 0..self.layers {
            self.scene.pop_layer();
        }
        match self.stack.pop() {
            Some(frame) => {
                self.transform = frame.transform;
                self.layers = frame.layers;
            }
            None => {
                log::warn!("Unbalanced restore on VelloSurface");
                self.layers = 0;
            }
        }
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.transform *= Affine::translate((dx, dy));
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.transform *= Affine::scale_non_uniform(sx, sy);
    }

    fn rotate(&mut self, degrees: f64, pivot: Point) {
        self.transform *= Affine::rotate_about(degrees.to_radians(), pivot);
    }

    fn clip_rect(&mut self, rect: Rect) {
        self.push_clip(&rect);
    }

    fn clip_path(&mut self, path: &BezPath) {
        self.push_clip(path);
    }

    fn draw_rect(&mut self, rect: Rect, paint: &Paint) {
        if paint.is_invisible() || self.draw_blurred(rect, 0.0, paint) {
            return;
        }
        self.draw_shape(&rect, paint);
    }

    fn draw_oval(&mut self, rect: Rect, paint: &Paint) {
        let corner = rect.width().min(rect.height()) / 2.0;
        if paint.is_invisible() || self.draw_blurred(rect, corner, paint) {
            return;
        }
        self.draw_shape(&Ellipse::from_rect(rect), paint);
    }

    fn draw_path(&mut self, path: &BezPath, paint: &Paint) {
        self.draw_shape(path, paint);
    }

    fn draw_line(&mut self, from: Point, to: Point, paint: &Paint) {
        if paint.is_invisible() {
            return;
        }
        let line = Line::new(from, to);
        let bounds = line.bounding_box().inflate(paint.stroke_width, paint.stroke_width);
        self.with_blend(paint, bounds, |surface| surface.stroke_shape(&line, paint));
    }

    fn draw_text(&mut self, text: &str, origin: Point, font: &FontSpec, paint: &Paint) {
        if text.is_empty() || paint.is_invisible() || !(font.size > 0.0) {
            return;
        }
        let brush = paint.brush();
        let mut builder = self.layout_cx.ranged_builder(&mut self.font_cx, text, 1.0, false);
        builder.push_default(StyleProperty::FontSize(font.size as f32));
        builder.push_default(StyleProperty::Brush(brush.clone()));
        builder.push_default(StyleProperty::FontWeight(parley::FontWeight::new(font.weight as f32)));
        builder.push_default(StyleProperty::FontStack(parley::FontStack::Single(
            parley::FontFamily::Named(font.family.clone().into()),
        )));
        let mut layout = builder.build(text);
        layout.break_all_lines(None);
        layout.align(None, parley::Alignment::Start, parley::AlignmentOptions::default());

        // `origin` is the baseline of the first line.
        let first_baseline = layout
            .lines()
            .next()
            .map_or(0.0, |line| line.metrics().baseline as f64);
        let text_transform = self.transform * Affine::translate((origin.x, origin.y - first_baseline));

        for line in layout.lines() {
            for item in line.items() {
                let PositionedLayoutItem::GlyphRun(glyph_run) = item else {
                    continue;
                };
                let mut x = glyph_run.offset();
                let y = glyph_run.baseline();
                let run = glyph_run.run();
                let synthesis = run.synthesis();
                let glyph_xform = synthesis
                    .skew()
                    .map(|angle| Affine::skew(angle.to_radians().tan() as f64, 0.0));
                let glyphs: Vec<vello::Glyph> = glyph_run
                    .glyphs()
                    .map(|glyph| {
                        let gx = x + glyph.x;
                        let gy = y - glyph.y;
                        x += glyph.advance;
                        vello::Glyph { id: glyph.id, x: gx, y: gy }
                    })
                    .collect();
                if glyphs.is_empty() {
                    continue;
                }
                self.scene
                    .draw_glyphs(run.font())
                    .brush(&brush)
                    .hint(true)
                    .transform(text_transform)
                    .glyph_transform(glyph_xform)
                    .font_size(run.font_size())
                    .normalized_coords(run.normalized_coords())
                    .draw(Fill::NonZero, glyphs.into_iter());
            }
        }
    }

    fn draw_image(&mut self, image: &ImageData, src: Rect, dst: Rect, paint: &Paint) {
        if image.width == 0 || image.height == 0 || src.is_zero_area() || dst.is_zero_area() {
            return;
        }
        let alpha = paint.alpha();
        if alpha <= 0.0 {
            return;
        }
        let data = match &paint.color_filter {
            Some(matrix) => {
                let mut pixels = image.data.data().to_vec();
                let premultiplied = matches!(image.alpha_type, peniko::ImageAlphaType::AlphaPremultiplied);
                matrix.apply_to_rgba8(&mut pixels, premultiplied);
                ImageData {
                    data: Blob::new(Arc::new(pixels)),
                    ..image.clone()
                }
            }
            None => image.clone(),
        };
        let image_transform = self.transform
            * Affine::translate(dst.origin().to_vec2())
            * Affine::scale_non_uniform(dst.width() / src.width(), dst.height() / src.height())
            * Affine::translate(-src.origin().to_vec2());

        self.scene.push_clip_layer(self.transform, &dst);
        let layered = alpha < 1.0 || paint.blend_mode != Mix::Normal;
        if layered {
            self.scene.push_layer(paint.blend_mode, alpha, self.transform, &dst);
        }
        let brush = ImageBrush {
            image: &data,
            sampler: Default::default(),
        };
        self.scene.draw_image(brush, image_transform);
        if layered {
            self.scene.pop_layer();
        }
        self.scene.pop_layer();
    }

    fn flush(&mut self) {
        if !self.stack.is_empty() {
            log::warn!("Flushing VelloSurface with {} unmatched saves", self.stack.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_creation() {
        let surface = VelloSurface::new(Size::new(800.0, 600.0));
        assert!(surface.scene().encoding().is_empty());
    }

    #[test]
    fn test_draws_encode_into_scene() {
        let mut surface = VelloSurface::new(Size::new(800.0, 600.0));
        surface.draw_rect(Rect::new(0.0, 0.0, 10.0, 10.0), &Paint::fill(Color::BLACK));
        assert!(!surface.scene().encoding().is_empty());
    }

    #[test]
    fn test_invisible_paint_draws_nothing() {
        let mut surface = VelloSurface::new(Size::new(800.0, 600.0));
        surface.draw_rect(Rect::new(0.0, 0.0, 10.0, 10.0), &Paint::fill(Color::TRANSPARENT));
        surface.draw_line(Point::ZERO, Point::new(5.0, 5.0), &Paint::stroke(Color::BLACK, 0.0));
        assert!(surface.scene().encoding().is_empty());
    }

    #[test]
    fn test_restore_unwinds_transform_and_layers() {
        let mut surface = VelloSurface::new(Size::new(800.0, 600.0));
        surface.save();
        surface.translate(10.0, 0.0);
        surface.clip_rect(Rect::new(0.0, 0.0, 5.0, 5.0));
        surface.save_layer(None);
        assert_eq!(surface.save_depth(), 2);
        surface.restore();
        surface.restore();
        assert_eq!(surface.save_depth(), 0);
        assert_eq!(surface.transform, Affine::IDENTITY);
        assert_eq!(surface.layers, 0);

        // extra restores are tolerated
        surface.restore();
        assert_eq!(surface.save_depth(), 0);
    }

    #[test]
    fn test_take_scene_resets() {
        let mut surface = VelloSurface::new(Size::new(10.0, 10.0));
        surface.clear(Color::WHITE);
        let scene = surface.take_scene();
        assert!(!scene.encoding().is_empty());
        assert!(surface.scene().encoding().is_empty());
    }
}
