//! Element definitions for the canvas.
//!
//! An [`Element`] carries the attributes every element shares plus an
//! [`ElementKind`] holding the variant-specific ones. Renderers match on the
//! kind, so each per-type routine only ever sees its own variant's fields.

mod path;
mod style;
mod text;

pub use path::{CURVE_FLATTEN_SEGMENTS, ControlPoint, CurveKind, PathCurve, PathPoint, PathProps};
pub use style::{
    BlendMode, Blur, BlurKind, ColorAdjustments, CornerRadii, ElementStroke, Fill, GradientDef,
    GradientKind, GradientStop, ImageFill, ImageFit, ImageRepeat, MeshPoint, Padding, Shadow,
    ShadowKind, StrokeDash, StrokePosition,
};
pub use text::{
    BOLD_THRESHOLD, DEFAULT_LINE_HEIGHT, FontWeight, GLYPH_ADVANCE_FACTOR, TextDecoration,
    TextProps, TextTransform,
};

use crate::geometry::{normalize_rect, rect_is_finite};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use style::{default_one, default_true};
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for elements.
pub type ElementId = String;

/// Errors produced when reading element snapshots.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Invalid element JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Duplicate element id: {0}")]
    DuplicateId(String),
}

/// Rectangle attributes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RectProps {
    #[serde(default)]
    pub radius: CornerRadii,
    #[serde(default)]
    pub blur: Option<Blur>,
}

/// Ellipse attributes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EllipseProps {
    #[serde(default)]
    pub blur: Option<Blur>,
}

/// Main-axis direction of a frame's auto layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutDirection {
    #[default]
    Horizontal,
    Vertical,
}

/// Auto-layout constraints of a frame. Carried for the layout engine; the
/// renderer only uses the padding.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameLayout {
    #[serde(default)]
    pub direction: LayoutDirection,
    #[serde(default)]
    pub gap: f64,
}

/// Frame attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameProps {
    /// Whether children are clipped to the frame's content box.
    #[serde(default = "default_true")]
    pub clip_content: bool,
    #[serde(default)]
    pub padding: Padding,
    #[serde(default)]
    pub layout: Option<FrameLayout>,
}

impl Default for FrameProps {
    fn default() -> Self {
        Self {
            clip_content: true,
            padding: Padding::default(),
            layout: None,
        }
    }
}

/// Line attributes; `(x, y)` of the element is the first endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LineProps {
    pub x2: f64,
    pub y2: f64,
}

/// Per-image visual effects.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageEffects {
    #[serde(default)]
    pub blur: f64,
    #[serde(default)]
    pub blend_mode: BlendMode,
    #[serde(flatten)]
    pub adjustments: ColorAdjustments,
}

/// Image attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageProps {
    /// Embedded `data:` URL.
    pub src: String,
    #[serde(default)]
    pub natural_width: f64,
    #[serde(default)]
    pub natural_height: f64,
    #[serde(default)]
    pub aspect_ratio: Option<f64>,
    #[serde(default)]
    pub effects: Option<ImageEffects>,
}

/// Variant-specific element data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementKind {
    Rect(RectProps),
    Ellipse(EllipseProps),
    Frame(FrameProps),
    Text(TextProps),
    Line(LineProps),
    Path(PathProps),
    Image(ImageProps),
}

/// Discriminant of [`ElementKind`], used for batching keys and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Rect,
    Ellipse,
    Frame,
    Text,
    Line,
    Path,
    Image,
}

impl ElementType {
    /// Lowercase name as used in documents.
    pub fn name(self) -> &'static str {
        match self {
            ElementType::Rect => "rect",
            ElementType::Ellipse => "ellipse",
            ElementType::Frame => "frame",
            ElementType::Text => "text",
            ElementType::Line => "line",
            ElementType::Path => "path",
            ElementType::Image => "image",
        }
    }
}

/// A canvas element in world coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: ElementId,
    /// Enclosing frame, if any. A back-reference only; frames do not own children.
    #[serde(default)]
    pub parent_id: Option<ElementId>,
    pub x: f64,
    pub y: f64,
    /// Width; negative means mirrored horizontally.
    #[serde(default)]
    pub w: f64,
    /// Height; negative means mirrored vertically.
    #[serde(default)]
    pub h: f64,
    /// Rotation in degrees about the element center.
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fill: Option<Fill>,
    #[serde(default)]
    pub stroke: Option<ElementStroke>,
    #[serde(default = "default_one")]
    pub opacity: f64,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub lock_width: bool,
    #[serde(default)]
    pub lock_height: bool,
    #[serde(default)]
    pub shadow: Option<Shadow>,
    #[serde(default)]
    pub image_fill: Option<ImageFill>,
    #[serde(flatten)]
    pub kind: ElementKind,
}

impl Element {
    /// Create an element with a fresh id.
    pub fn new(x: f64, y: f64, w: f64, h: f64, kind: ElementKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            parent_id: None,
            x,
            y,
            w,
            h,
            rotation: 0.0,
            name: String::new(),
            fill: None,
            stroke: None,
            opacity: 1.0,
            visible: true,
            locked: false,
            lock_width: false,
            lock_height: false,
            shadow: None,
            image_fill: None,
            kind,
        }
    }

    /// A square-cornered rectangle.
    pub fn rect(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self::new(x, y, w, h, ElementKind::Rect(RectProps::default()))
    }

    /// An ellipse inscribed in the given box.
    pub fn ellipse(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self::new(x, y, w, h, ElementKind::Ellipse(EllipseProps::default()))
    }

    /// A clipping frame.
    pub fn frame(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self::new(x, y, w, h, ElementKind::Frame(FrameProps::default()))
    }

    /// A text element with its top-left at `(x, y)`.
    pub fn text(x: f64, y: f64, content: impl Into<String>) -> Self {
        let props = TextProps::new(content);
        let bounds = props.estimate_bounds(x, y);
        Self::new(x, y, bounds.width(), bounds.height(), ElementKind::Text(props))
    }

    /// A straight line from `(x1, y1)` to `(x2, y2)` with a default black stroke.
    pub fn line(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let mut element = Self::new(
            x1,
            y1,
            x2 - x1,
            y2 - y1,
            ElementKind::Line(LineProps { x2, y2 }),
        );
        element.stroke = Some(ElementStroke::new("#000000", 2.0));
        element
    }

    /// A path whose points are relative to `(x, y)`.
    pub fn path(x: f64, y: f64, points: Vec<PathPoint>, closed: bool) -> Self {
        let props = PathProps { points, closed };
        let (w, h) = props
            .control_bounds(Point::ZERO)
            .map(|b| (b.x1.max(0.0), b.y1.max(0.0)))
            .unwrap_or((0.0, 0.0));
        Self::new(x, y, w, h, ElementKind::Path(props))
    }

    /// An image element showing an embedded data URL.
    pub fn image(x: f64, y: f64, w: f64, h: f64, src: impl Into<String>) -> Self {
        Self::new(
            x,
            y,
            w,
            h,
            ElementKind::Image(ImageProps {
                src: src.into(),
                natural_width: w.abs(),
                natural_height: h.abs(),
                aspect_ratio: (h != 0.0).then(|| (w / h).abs()),
                effects: None,
            }),
        )
    }

    /// Replace the id.
    pub fn with_id(mut self, id: impl Into<ElementId>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the enclosing frame.
    pub fn with_parent(mut self, parent_id: impl Into<ElementId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Set a solid fill.
    pub fn with_fill(mut self, color: impl Into<String>) -> Self {
        self.fill = Some(Fill::solid(color));
        self
    }

    /// Set a solid centered stroke.
    pub fn with_stroke(mut self, color: impl Into<String>, width: f64) -> Self {
        self.stroke = Some(ElementStroke::new(color, width));
        self
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Variant discriminant.
    pub fn element_type(&self) -> ElementType {
        match &self.kind {
            ElementKind::Rect(_) => ElementType::Rect,
            ElementKind::Ellipse(_) => ElementType::Ellipse,
            ElementKind::Frame(_) => ElementType::Frame,
            ElementKind::Text(_) => ElementType::Text,
            ElementKind::Line(_) => ElementType::Line,
            ElementKind::Path(_) => ElementType::Path,
            ElementKind::Image(_) => ElementType::Image,
        }
    }

    /// Whether this element is a frame.
    pub fn is_frame(&self) -> bool {
        matches!(self.kind, ElementKind::Frame(_))
    }

    /// Frame attributes, if this element is a frame.
    pub fn as_frame(&self) -> Option<&FrameProps> {
        match &self.kind {
            ElementKind::Frame(frame) => Some(frame),
            _ => None,
        }
    }

    /// The `x, y, w, h` box with mirroring resolved.
    pub fn normalized_rect(&self) -> Rect {
        normalize_rect(self.x, self.y, self.w, self.h)
    }

    /// Axis-aligned bounds used for culling and the spatial index.
    ///
    /// Lines use their endpoints; text and paths extend the box by their
    /// estimated glyph extent and control handles respectively.
    pub fn bounds(&self) -> Rect {
        match &self.kind {
            ElementKind::Line(line) => {
                Rect::from_points(Point::new(self.x, self.y), Point::new(line.x2, line.y2))
            }
            ElementKind::Text(text) => self.normalized_rect().union(text.estimate_bounds(self.x, self.y)),
            ElementKind::Path(path) => {
                let rect = self.normalized_rect();
                match path.control_bounds(Point::new(self.x, self.y)) {
                    Some(controls) => rect.union(controls),
                    None => rect,
                }
            }
            _ => self.normalized_rect(),
        }
    }

    /// Whether the geometry is usable at all.
    pub fn is_finite(&self) -> bool {
        self.rotation.is_finite() && rect_is_finite(self.bounds())
    }

    /// Stroke width, zero when there is no stroke.
    pub fn stroke_width(&self) -> f64 {
        self.stroke.as_ref().map_or(0.0, |s| s.width.max(0.0))
    }

    /// Position/size fragment of the spatial-index content signature.
    pub fn signature(&self) -> String {
        format!("{}:{}:{}:{}:{}", self.id, self.x, self.y, self.w, self.h)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a JSON array of elements, rejecting duplicate ids.
    pub fn from_json(json: &str) -> Result<Vec<Element>, SnapshotError> {
        let elements: Vec<Element> = serde_json::from_str(json)?;
        let mut seen = HashSet::with_capacity(elements.len());
        for element in &elements {
            if !seen.insert(element.id.as_str()) {
                return Err(SnapshotError::DuplicateId(element.id.clone()));
            }
        }
        Ok(elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_bounds_mirrored() {
        let rect = Element::rect(100.0, 100.0, -50.0, 20.0);
        let bounds = rect.bounds();
        assert!((bounds.x0 - 50.0).abs() < f64::EPSILON);
        assert!((bounds.x1 - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_line_bounds_from_endpoints() {
        let line = Element::line(10.0, 50.0, 0.0, 20.0);
        let bounds = line.bounds();
        assert_eq!(bounds, Rect::new(0.0, 20.0, 10.0, 50.0));
    }

    #[test]
    fn test_json_roundtrip_preserves_variant() {
        let json = r##"[
            {"id":"f1","type":"frame","x":0,"y":0,"w":200,"h":100,"padding":{"top":10}},
            {"id":"r1","type":"rect","x":5,"y":5,"w":20,"h":20,"parentId":"f1",
             "fill":"#ff0000","radius":{"topLeft":4}}
        ]"##;
        let elements = Element::from_json(json).unwrap();
        assert_eq!(elements.len(), 2);
        let frame = elements[0].as_frame().unwrap();
        assert!(frame.clip_content);
        assert!((frame.padding.top - 10.0).abs() < f64::EPSILON);
        assert_eq!(elements[1].parent_id.as_deref(), Some("f1"));
        assert!(elements[1].visible);
        match &elements[1].kind {
            ElementKind::Rect(rect) => assert!((rect.radius.top_left - 4.0).abs() < f64::EPSILON),
            other => panic!("expected rect, got {:?}", other),
        }

        let back = elements[1].to_json().unwrap();
        assert!(back.contains("\"type\":\"rect\""));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let json = r#"[{"id":"a","type":"ellipse","x":0,"y":0},{"id":"a","type":"ellipse","x":1,"y":1}]"#;
        assert!(matches!(
            Element::from_json(json),
            Err(SnapshotError::DuplicateId(id)) if id == "a"
        ));
    }
}
