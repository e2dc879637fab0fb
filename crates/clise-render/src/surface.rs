//! Drawing surface abstraction.
//!
//! A [`Surface`] is an immediate-mode canvas with a save/restore stack in
//! the style of Skia: transforms and clips apply until the matching
//! `restore`. Element renderers only talk to this trait; the GPU backend and
//! the [`RecordingSurface`] implement it.

use crate::cache::blur::BlurFilter;
use crate::effects::ColorMatrix;
use kurbo::{Affine, BezPath, Point, Rect, Stroke, Vec2};
use peniko::{Brush, Color, Fill, Gradient, ImageData, Mix};
use std::sync::Arc;

/// Whether a paint fills or strokes geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaintStyle {
    #[default]
    Fill,
    Stroke,
}

/// Dash intervals applied to strokes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DashPattern {
    pub on: f64,
    pub off: f64,
    pub phase: f64,
}

impl DashPattern {
    /// The editor's dash: `[4w, 2w]` for stroke width `w`.
    pub fn for_width(width: f64) -> Self {
        let width = width.max(1.0);
        Self {
            on: width * 4.0,
            off: width * 2.0,
            phase: 0.0,
        }
    }
}

/// Font selection for [`Surface::draw_text`].
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub family: String,
    pub size: f64,
    pub weight: u16,
}

impl FontSpec {
    pub fn new(family: impl Into<String>, size: f64) -> Self {
        Self {
            family: family.into(),
            size,
            weight: 400,
        }
    }
}

/// Paint state for a single draw call.
#[derive(Debug, Clone)]
pub struct Paint {
    pub color: Color,
    pub style: PaintStyle,
    pub stroke_width: f64,
    pub anti_alias: bool,
    /// Blur applied to the draw (or to a saved layer).
    pub image_filter: Option<Arc<BlurFilter>>,
    pub dash: Option<DashPattern>,
    /// Gradient shader; replaces `color` when set.
    pub shader: Option<Gradient>,
    pub color_filter: Option<ColorMatrix>,
    pub blend_mode: Mix,
    pub fill_rule: Fill,
}

impl Default for Paint {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            style: PaintStyle::Fill,
            stroke_width: 1.0,
            anti_alias: true,
            image_filter: None,
            dash: None,
            shader: None,
            color_filter: None,
            blend_mode: Mix::Normal,
            fill_rule: Fill::NonZero,
        }
    }
}

impl Paint {
    /// A fill paint of `color`.
    pub fn fill(color: Color) -> Self {
        Self {
            color,
            ..Default::default()
        }
    }

    /// A stroke paint of `color` and `width`.
    pub fn stroke(color: Color, width: f64) -> Self {
        Self {
            color,
            style: PaintStyle::Stroke,
            stroke_width: width,
            ..Default::default()
        }
    }

    /// Reset every field to its default.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Drop transient effects so they can't leak into the next use.
    pub fn clear_effects(&mut self) {
        self.image_filter = None;
        self.dash = None;
        self.shader = None;
        self.color_filter = None;
        self.blend_mode = Mix::Normal;
        self.fill_rule = Fill::NonZero;
    }

    pub fn with_filter(mut self, filter: Option<Arc<BlurFilter>>) -> Self {
        self.image_filter = filter;
        self
    }

    pub fn with_blend(mut self, blend_mode: Mix) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    /// Alpha of the solid color.
    pub fn alpha(&self) -> f32 {
        self.color.components[3]
    }

    /// Whether drawing with this paint would produce nothing.
    pub fn is_invisible(&self) -> bool {
        self.shader.is_none() && self.alpha() <= 0.0
            || self.style == PaintStyle::Stroke && self.stroke_width <= 0.0
    }

    /// Brush for backends: the shader when present, otherwise the color.
    pub fn brush(&self) -> Brush {
        match &self.shader {
            Some(gradient) => Brush::Gradient(gradient.clone()),
            None => Brush::Solid(self.color),
        }
    }

    /// Stroke geometry including dashes.
    pub fn kurbo_stroke(&self) -> Stroke {
        let stroke = Stroke::new(self.stroke_width);
        match self.dash {
            Some(dash) => stroke.with_dashes(dash.phase, [dash.on, dash.off]),
            None => stroke,
        }
    }
}

/// Immediate-mode drawing target.
pub trait Surface {
    /// Fill the whole target with `color`, ignoring the transform.
    fn clear(&mut self, color: Color);
    /// Push transform and clip state.
    fn save(&mut self);
    /// Push state and start an offscreen layer composited on `restore` with
    /// the paint's alpha, blend mode and image filter.
    fn save_layer(&mut self, paint: Option<&Paint>);
    /// Pop to the matching `save`/`save_layer`.
    fn restore(&mut self);
    fn translate(&mut self, dx: f64, dy: f64);
    fn scale(&mut self, sx: f64, sy: f64);
    /// Rotate by `degrees` about `pivot` (current coordinates).
    fn rotate(&mut self, degrees: f64, pivot: Point);
    fn clip_rect(&mut self, rect: Rect);
    fn clip_path(&mut self, path: &BezPath);
    fn draw_rect(&mut self, rect: Rect, paint: &Paint);
    fn draw_oval(&mut self, rect: Rect, paint: &Paint);
    fn draw_path(&mut self, path: &BezPath, paint: &Paint);
    fn draw_line(&mut self, from: Point, to: Point, paint: &Paint);
    /// Draw a single line of text with its baseline starting at `origin`.
    fn draw_text(&mut self, text: &str, origin: Point, font: &FontSpec, paint: &Paint);
    /// Draw the `src` region of `image` (pixels) into `dst`.
    fn draw_image(&mut self, image: &ImageData, src: Rect, dst: Rect, paint: &Paint);
    /// Submit pending work.
    fn flush(&mut self);

    /// Open a labelled group of commands (diagnostics only).
    fn push_debug_group(&mut self, _label: &str) {}
    fn pop_debug_group(&mut self) {}
}

/// One recorded surface call.
#[derive(Debug, Clone)]
pub enum DrawCommand {
    Clear(Color),
    Save,
    SaveLayer(Option<Paint>),
    Restore,
    Translate(Vec2),
    Scale(f64, f64),
    Rotate { degrees: f64, pivot: Point },
    ClipRect(Rect),
    ClipPath(BezPath),
    Rect { rect: Rect, paint: Paint },
    Oval { rect: Rect, paint: Paint },
    Path { path: BezPath, paint: Paint },
    Line { from: Point, to: Point, paint: Paint },
    Text { text: String, origin: Point, font: FontSpec, paint: Paint },
    Image { width: u32, height: u32, src: Rect, dst: Rect, paint: Paint },
    Flush,
    BeginGroup(String),
    EndGroup,
}

impl DrawCommand {
    /// Whether this command produces pixels.
    pub fn is_draw(&self) -> bool {
        matches!(
            self,
            DrawCommand::Rect { .. }
                | DrawCommand::Oval { .. }
                | DrawCommand::Path { .. }
                | DrawCommand::Line { .. }
                | DrawCommand::Text { .. }
                | DrawCommand::Image { .. }
        )
    }

    /// The paint of a draw command.
    pub fn paint(&self) -> Option<&Paint> {
        match self {
            DrawCommand::Rect { paint, .. }
            | DrawCommand::Oval { paint, .. }
            | DrawCommand::Path { paint, .. }
            | DrawCommand::Line { paint, .. }
            | DrawCommand::Text { paint, .. }
            | DrawCommand::Image { paint, .. } => Some(paint),
            _ => None,
        }
    }
}

/// A surface that records every call instead of drawing.
///
/// Tracks the current transform so callers can map recorded geometry back
/// to the screen.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    commands: Vec<DrawCommand>,
    transform: Affine,
    stack: Vec<Affine>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Current transform (identity outside any save scope).
    pub fn transform(&self) -> Affine {
        self.transform
    }

    /// Number of draw calls recorded.
    pub fn draw_count(&self) -> usize {
        self.commands.iter().filter(|c| c.is_draw()).count()
    }

    /// Labels of the debug groups, in the order they were opened.
    pub fn group_labels(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::BeginGroup(label) => Some(label.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Commands recorded inside the first group labelled `label`.
    pub fn group(&self, label: &str) -> Option<&[DrawCommand]> {
        let start = self
            .commands
            .iter()
            .position(|c| matches!(c, DrawCommand::BeginGroup(l) if l == label))?;
        let mut depth = 0usize;
        for (offset, command) in self.commands[start + 1..].iter().enumerate() {
            match command {
                DrawCommand::BeginGroup(_) => depth += 1,
                DrawCommand::EndGroup if depth == 0 => {
                    return Some(&self.commands[start + 1..start + 1 + offset]);
                }
                DrawCommand::EndGroup => depth -= 1,
                _ => {}
            }
        }
        Some(&self.commands[start + 1..])
    }
}

impl Surface for RecordingSurface {
    fn clear(&mut self, color: Color) {
        self.commands.push(DrawCommand::Clear(color));
    }

    fn save(&mut self) {
        self.stack.push(self.transform);
        self.commands.push(DrawCommand::Save);
    }

    fn save_layer(&mut self, paint: Option<&Paint>) {
        self.stack.push(self.transform);
        self.commands.push(DrawCommand::SaveLayer(paint.cloned()));
    }

    fn restore(&mut self) {
        if let Some(transform) = self.stack.pop() {
            self.transform = transform;
        }
        self.commands.push(DrawCommand::Restore);
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.transform *= Affine::translate((dx, dy));
        self.commands.push(DrawCommand::Translate(Vec2::new(dx, dy)));
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.transform *= Affine::scale_non_uniform(sx, sy);
        self.commands.push(DrawCommand::Scale(sx, sy));
    }

    fn rotate(&mut self, degrees: f64, pivot: Point) {
        self.transform *= Affine::rotate_about(degrees.to_radians(), pivot);
        self.commands.push(DrawCommand::Rotate { degrees, pivot });
    }

    fn clip_rect(&mut self, rect: Rect) {
        self.commands.push(DrawCommand::ClipRect(rect));
    }

    fn clip_path(&mut self, path: &BezPath) {
        self.commands.push(DrawCommand::ClipPath(path.clone()));
    }

    fn draw_rect(&mut self, rect: Rect, paint: &Paint) {
        self.commands.push(DrawCommand::Rect {
            rect,
            paint: paint.clone(),
        });
    }

    fn draw_oval(&mut self, rect: Rect, paint: &Paint) {
        self.commands.push(DrawCommand::Oval {
            rect,
            paint: paint.clone(),
        });
    }

    fn draw_path(&mut self, path: &BezPath, paint: &Paint) {
        self.commands.push(DrawCommand::Path {
            path: path.clone(),
            paint: paint.clone(),
        });
    }

    fn draw_line(&mut self, from: Point, to: Point, paint: &Paint) {
        self.commands.push(DrawCommand::Line {
            from,
            to,
            paint: paint.clone(),
        });
    }

    fn draw_text(&mut self, text: &str, origin: Point, font: &FontSpec, paint: &Paint) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            origin,
            font: font.clone(),
            paint: paint.clone(),
        });
    }

    fn draw_image(&mut self, image: &ImageData, src: Rect, dst: Rect, paint: &Paint) {
        self.commands.push(DrawCommand::Image {
            width: image.width,
            height: image.height,
            src,
            dst,
            paint: paint.clone(),
        });
    }

    fn flush(&mut self) {
        self.commands.push(DrawCommand::Flush);
    }

    fn push_debug_group(&mut self, label: &str) {
        self.commands.push(DrawCommand::BeginGroup(label.to_string()));
    }

    fn pop_debug_group(&mut self) {
        self.commands.push(DrawCommand::EndGroup);
    }
}
