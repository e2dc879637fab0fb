//! Visual style attributes shared by element variants.

use serde::{Deserialize, Serialize};

pub(crate) fn default_one() -> f64 {
    1.0
}

pub(crate) fn default_half() -> f64 {
    0.5
}

pub(crate) fn default_true() -> bool {
    true
}

/// Element fill: a solid color string or a gradient definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Fill {
    /// Hex (`#rgb`, `#rrggbb`) or basic named color.
    Solid(String),
    /// Linear, radial or mesh gradient.
    Gradient(GradientDef),
}

impl Fill {
    /// Solid fill from a color string.
    pub fn solid(color: impl Into<String>) -> Self {
        Fill::Solid(color.into())
    }

    /// The color to use when a single flat color must stand in for this fill.
    ///
    /// Gradients fall back to their first stop.
    pub fn fallback_color(&self) -> Option<&str> {
        match self {
            Fill::Solid(color) => Some(color.as_str()),
            Fill::Gradient(gradient) => gradient.first_color(),
        }
    }

    /// Whether this fill is a gradient.
    pub fn is_gradient(&self) -> bool {
        matches!(self, Fill::Gradient(_))
    }

    /// Canonical string used when grouping elements that share a paint.
    pub fn cache_key(&self) -> String {
        match self {
            Fill::Solid(color) => color.clone(),
            Fill::Gradient(gradient) => {
                let stops: Vec<String> = gradient
                    .stops
                    .iter()
                    .map(|s| format!("{}@{}:{}", s.color, s.offset, s.opacity))
                    .collect();
                format!("{:?}({})[{}]", gradient.kind, gradient.angle, stops.join(","))
            }
        }
    }
}

/// Gradient flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradientKind {
    #[default]
    Linear,
    Radial,
    /// Free-form mesh, rendered as a radial approximation.
    Mesh,
}

/// A color stop along a gradient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub color: String,
    /// Position along the gradient in `0.0..=1.0`.
    pub offset: f64,
    #[serde(default = "default_one")]
    pub opacity: f64,
}

/// A mesh control point (positions relative to the element box, `0.0..=1.0`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshPoint {
    pub x: f64,
    pub y: f64,
    pub color: String,
    #[serde(default = "default_one")]
    pub opacity: f64,
}

/// Gradient definition; resolved against element bounds at draw time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradientDef {
    #[serde(rename = "type", default)]
    pub kind: GradientKind,
    /// Direction in degrees for linear gradients (0 = left to right, 90 = top to bottom).
    #[serde(default)]
    pub angle: f64,
    #[serde(default)]
    pub stops: Vec<GradientStop>,
    /// Radial center relative to the element box.
    #[serde(default = "default_half")]
    pub center_x: f64,
    #[serde(default = "default_half")]
    pub center_y: f64,
    /// Radial radius as a fraction of the larger box side.
    #[serde(default = "default_half")]
    pub radius: f64,
    #[serde(default)]
    pub mesh_points: Vec<MeshPoint>,
}

impl GradientDef {
    /// A linear gradient through the given stops.
    pub fn linear(angle: f64, stops: Vec<GradientStop>) -> Self {
        Self {
            kind: GradientKind::Linear,
            angle,
            stops,
            center_x: 0.5,
            center_y: 0.5,
            radius: 0.5,
            mesh_points: Vec::new(),
        }
    }

    /// First color of the gradient (first stop, or first mesh point).
    pub fn first_color(&self) -> Option<&str> {
        self.stops
            .first()
            .map(|s| s.color.as_str())
            .or_else(|| self.mesh_points.first().map(|p| p.color.as_str()))
    }
}

/// Whether a stroke is solid or dashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeDash {
    #[default]
    Solid,
    Dashed,
}

/// Where a stroke sits relative to the shape boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokePosition {
    #[default]
    Center,
    Inside,
    Outside,
}

/// Stroke attributes of an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementStroke {
    pub color: String,
    pub width: f64,
    #[serde(default = "default_one")]
    pub opacity: f64,
    #[serde(default)]
    pub style: StrokeDash,
    #[serde(default)]
    pub position: StrokePosition,
}

impl ElementStroke {
    /// A solid, centered stroke.
    pub fn new(color: impl Into<String>, width: f64) -> Self {
        Self {
            color: color.into(),
            width,
            opacity: 1.0,
            style: StrokeDash::Solid,
            position: StrokePosition::Center,
        }
    }
}

/// Drop shadows are cast behind the shape; inner shadows are recessed into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShadowKind {
    #[default]
    Drop,
    Inner,
}

/// Shadow attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shadow {
    #[serde(rename = "type", default)]
    pub kind: ShadowKind,
    pub x: f64,
    pub y: f64,
    pub blur: f64,
    pub color: String,
    #[serde(default = "default_one")]
    pub opacity: f64,
    #[serde(default)]
    pub spread: f64,
}

/// Blur flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlurKind {
    /// Blurs the element's own fill in place.
    #[default]
    Layer,
    /// Frosted-glass composite.
    Background,
}

/// Element-level blur.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Blur {
    #[serde(rename = "type", default)]
    pub kind: BlurKind,
    pub radius: f64,
}

/// Blend modes, named as in CSS `mix-blend-mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

/// How an image fill is sized into its shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFit {
    /// Scale to cover the shape, preserving aspect ratio.
    #[default]
    Fill,
    /// Scale to fit inside the shape, preserving aspect ratio.
    Contain,
    /// Same as `Fill`, kept for documents that use CSS naming.
    Cover,
    /// Scale each axis independently to the shape.
    Stretch,
    /// Repeat at natural size.
    Tile,
}

/// Tiling behavior for `ImageFit::Tile`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageRepeat {
    #[default]
    Repeat,
    Mirror,
}

/// An image painted inside a shape, between its fill and stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageFill {
    pub src: String,
    #[serde(default)]
    pub fit: ImageFit,
    /// Horizontal alignment in `0.0..=1.0` (0.5 = centered).
    #[serde(default = "default_half")]
    pub align_x: f64,
    #[serde(default = "default_half")]
    pub align_y: f64,
    /// Rotation in degrees about the shape center.
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub offset_x: f64,
    #[serde(default)]
    pub offset_y: f64,
    #[serde(default)]
    pub repeat: ImageRepeat,
    /// Tile scale for `ImageFit::Tile`.
    #[serde(default = "default_one")]
    pub scale: f64,
    #[serde(default)]
    pub blend_mode: BlendMode,
    #[serde(default = "default_one")]
    pub opacity: f64,
    #[serde(flatten)]
    pub adjustments: ColorAdjustments,
}

impl ImageFill {
    /// An image fill with default placement.
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            fit: ImageFit::Fill,
            align_x: 0.5,
            align_y: 0.5,
            rotation: 0.0,
            offset_x: 0.0,
            offset_y: 0.0,
            repeat: ImageRepeat::Repeat,
            scale: 1.0,
            blend_mode: BlendMode::Normal,
            opacity: 1.0,
            adjustments: ColorAdjustments::default(),
        }
    }
}

/// Brightness / contrast / saturation offsets, each in `-1.0..=1.0` with 0 = unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ColorAdjustments {
    #[serde(default)]
    pub brightness: f64,
    #[serde(default)]
    pub contrast: f64,
    #[serde(default)]
    pub saturation: f64,
}

impl ColorAdjustments {
    /// True when no adjustment would change a pixel.
    pub fn is_identity(&self) -> bool {
        self.brightness == 0.0 && self.contrast == 0.0 && self.saturation == 0.0
    }
}

/// Per-corner radii of a rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CornerRadii {
    #[serde(default)]
    pub top_left: f64,
    #[serde(default)]
    pub top_right: f64,
    #[serde(default)]
    pub bottom_right: f64,
    #[serde(default)]
    pub bottom_left: f64,
}

impl CornerRadii {
    /// Same radius on every corner.
    pub fn uniform(radius: f64) -> Self {
        Self {
            top_left: radius,
            top_right: radius,
            bottom_right: radius,
            bottom_left: radius,
        }
    }

    /// True when every corner is square.
    pub fn is_zero(&self) -> bool {
        self.top_left <= 0.0
            && self.top_right <= 0.0
            && self.bottom_right <= 0.0
            && self.bottom_left <= 0.0
    }

    /// Clamp each radius into `0.0..=limit`.
    pub fn clamped(&self, limit: f64) -> Self {
        let limit = limit.max(0.0);
        let clamp = |r: f64| if r.is_finite() { r.clamp(0.0, limit) } else { 0.0 };
        Self {
            top_left: clamp(self.top_left),
            top_right: clamp(self.top_right),
            bottom_right: clamp(self.bottom_right),
            bottom_left: clamp(self.bottom_left),
        }
    }

    /// Grow (positive) or shrink (negative) every rounded corner, never below
    /// zero. Square corners stay square.
    pub fn offset(&self, delta: f64) -> Self {
        let shift = |r: f64| if r > 0.0 { (r + delta).max(0.0) } else { 0.0 };
        Self {
            top_left: shift(self.top_left),
            top_right: shift(self.top_right),
            bottom_right: shift(self.bottom_right),
            bottom_left: shift(self.bottom_left),
        }
    }

    /// Largest of the four radii.
    pub fn max(&self) -> f64 {
        self.top_left
            .max(self.top_right)
            .max(self.bottom_right)
            .max(self.bottom_left)
    }
}

/// Inner padding of a frame's content box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Padding {
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub right: f64,
    #[serde(default)]
    pub bottom: f64,
    #[serde(default)]
    pub left: f64,
}

impl Padding {
    /// Same padding on every side.
    pub fn uniform(value: f64) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }
}
