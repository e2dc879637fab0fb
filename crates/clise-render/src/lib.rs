//! Clise Render Library
//!
//! Scene rendering for the Clise canvas editor. [`SceneRenderer`] turns a
//! document plus view state into draw calls on a [`Surface`]; the default
//! surface encodes into a Vello scene for GPU rendering, and
//! [`RecordingSurface`] keeps the calls for inspection.

pub mod batch;
pub mod cache;
pub mod draw;
pub mod effects;
mod renderer;
mod scene;
mod surface;

#[cfg(feature = "vello-renderer")]
mod vello_impl;

pub use batch::{Batch, BatchKey, group_elements_for_batching, render_batch};
pub use cache::{ImageState, RenderCaches};
pub use draw::DrawContext;
pub use effects::ColorMatrix;
pub use renderer::{
    ErrorContext, ErrorReporter, FrameMetrics, LogErrorReporter, MetricsSink, RenderContext, RenderError,
    RenderResult, Theme,
};
pub use scene::{MAX_ANCESTOR_HOPS, SceneRenderer, content_rect};
pub use surface::{DashPattern, DrawCommand, FontSpec, Paint, PaintStyle, RecordingSurface, Surface};

#[cfg(feature = "vello-renderer")]
pub use vello_impl::VelloSurface;
