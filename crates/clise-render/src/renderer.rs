//! Per-frame inputs and the collaborators the renderer reports to.

use clise_core::clock::Duration;
use clise_core::guides::AlignmentGuide;
use clise_core::{Element, ElementId, Group, Viewport};
use kurbo::{Rect, Size};
use peniko::Color;
use thiserror::Error;

/// Renderer errors.
///
/// Only image decoding produces errors; everything else degrades to a
/// skipped draw.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Image source is not an embedded data URL: {0}")]
    UnsupportedSource(String),
    #[error("Malformed data URL: {0}")]
    InvalidDataUrl(String),
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Image decode failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("SVG rasterization failed: {0}")]
    Svg(String),
    #[error("SVG images require the `svg` feature")]
    SvgDisabled,
    #[error("Image decoder unavailable: {0}")]
    DecoderUnavailable(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Where an error happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// The image source (truncated) or element id involved.
    pub source: String,
    /// What the renderer was doing.
    pub operation: &'static str,
}

impl ErrorContext {
    pub fn new(source: impl Into<String>, operation: &'static str) -> Self {
        Self {
            source: source.into(),
            operation,
        }
    }
}

/// Receives non-fatal renderer errors.
pub trait ErrorReporter {
    fn report(&self, error: &RenderError, context: &ErrorContext);
}

/// Forwards errors to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogErrorReporter;

impl ErrorReporter for LogErrorReporter {
    fn report(&self, error: &RenderError, context: &ErrorContext) {
        log::error!("{} failed for {}: {}", context.operation, context.source, error);
    }
}

/// Timing record emitted after each frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameMetrics {
    /// Elements passed in (after dropping hidden ones).
    pub element_count: usize,
    /// Elements that survived culling.
    pub visible_count: usize,
    pub render_time: Duration,
}

/// Receives [`FrameMetrics`] after every frame.
pub trait MetricsSink {
    fn record_frame(&self, metrics: &FrameMetrics);
}

impl<F: Fn(&FrameMetrics)> MetricsSink for F {
    fn record_frame(&self, metrics: &FrameMetrics) {
        self(metrics)
    }
}

/// Color theme of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Canvas clear color.
    pub fn background(self) -> Color {
        match self {
            Theme::Light => Color::from_rgba8(250, 250, 250, 255),
            Theme::Dark => Color::from_rgba8(24, 24, 27, 255),
        }
    }

    /// Color of frame name labels; contrasts with the background.
    pub fn frame_label(self) -> Color {
        match self {
            Theme::Light => Color::from_rgba8(82, 82, 91, 255),
            Theme::Dark => Color::from_rgba8(212, 212, 216, 255),
        }
    }

    /// Selection outline and handle color.
    pub fn selection(self) -> Color {
        match self {
            Theme::Light => Color::from_rgba8(59, 130, 246, 255),
            Theme::Dark => Color::from_rgba8(96, 165, 250, 255),
        }
    }

    /// Smart-guide line color.
    pub fn guide(self) -> Color {
        Color::from_rgba8(236, 72, 153, 220)
    }
}

/// Context for a single render frame.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Elements in z-order (later = on top).
    pub elements: &'a [Element],
    pub selection: &'a [ElementId],
    pub groups: &'a [Group],
    pub viewport: Viewport,
    /// Screen size in logical pixels.
    pub screen_size: Size,
    /// Device pixel ratio.
    pub scale_factor: f64,
    /// Marquee rectangle in world coordinates.
    pub box_selection: Option<Rect>,
    /// Alignment guides to draw on top of the scene.
    pub guides: &'a [AlignmentGuide],
    pub theme: Theme,
}

impl<'a> RenderContext<'a> {
    /// Create a new render context.
    pub fn new(elements: &'a [Element], viewport: Viewport, screen_size: Size) -> Self {
        Self {
            elements,
            selection: &[],
            groups: &[],
            viewport,
            screen_size,
            scale_factor: 1.0,
            box_selection: None,
            guides: &[],
            theme: Theme::Light,
        }
    }

    /// Set the scale factor for HiDPI.
    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    /// Set the selected element and group ids.
    pub fn with_selection(mut self, selection: &'a [ElementId]) -> Self {
        self.selection = selection;
        self
    }

    /// Set the marquee rectangle.
    pub fn with_box_selection(mut self, rect: Option<Rect>) -> Self {
        self.box_selection = rect;
        self
    }

    /// Set the groups known to the store.
    pub fn with_groups(mut self, groups: &'a [Group]) -> Self {
        self.groups = groups;
        self
    }

    /// Set alignment guides for the current drag.
    pub fn with_guides(mut self, guides: &'a [AlignmentGuide]) -> Self {
        self.guides = guides;
        self
    }

    /// Set the color theme.
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Whether `id` is selected. Linear in the selection size; the frame
    /// renderer builds a set instead.
    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.iter().any(|s| s == id)
    }
}
