//! Clise Core Library
//!
//! Platform-agnostic element model and spatial logic for the Clise canvas
//! editor: viewport culling, the quadtree index, the performance manager that
//! reconciles the two, and the hit-testing geometry used by pointer input.

pub mod clock;
pub mod elements;
pub mod geometry;
pub mod group;
pub mod guides;
pub mod performance;
pub mod quadtree;
pub mod viewport;

pub use clock::{Clock, Instant, ManualClock, SystemClock};
pub use elements::{
    BlendMode, Blur, BlurKind, CornerRadii, Element, ElementId, ElementKind, ElementStroke,
    ElementType, Fill, GradientDef, GradientKind, GradientStop, ImageFill, ImageFit, Shadow,
    ShadowKind, SnapshotError, StrokeDash, StrokePosition,
};
pub use group::Group;
pub use guides::{AlignmentGuide, GuideAxis, GuideResult, compute_guides};
pub use hit_test::{
    PathHandleHit, PathHandleKind, ResizeHandle, get_element_at_point, get_path_handle,
    get_resize_handle,
};
pub use performance::{
    CacheStats, CullingMetrics, PerformanceConfig, PerformanceConfigPatch, PerformanceManager,
    RebuildState,
};
pub use quadtree::{QuadItem, Quadtree, QuadtreeStats};
pub use viewport::{CullResult, Viewport, ViewportBounds, calculate_viewport_bounds, cull_elements, is_visible};
