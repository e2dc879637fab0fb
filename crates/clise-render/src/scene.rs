//! Per-frame orchestration.
//!
//! [`SceneRenderer`] owns the performance manager and every cache, and turns
//! one [`RenderContext`] into a sequence of [`Surface`] calls:
//!
//! 1. drop hidden elements and (re)index the rest when the count changed,
//! 2. cull to the viewport,
//! 3. clear and apply device-pixel-ratio, pan and zoom,
//! 4. draw the marquee, then every frame, then every other element inside
//!    the clips of its content-clipping ancestor frames,
//! 5. draw group outlines and alignment guides,
//! 6. flush and report [`FrameMetrics`].

use crate::batch::{Batch, BatchKey, render_batch};
use crate::cache::{ReadyCallback, RenderCaches};
use crate::draw::{DrawContext, draw_element, selection};
use crate::renderer::{ErrorReporter, FrameMetrics, LogErrorReporter, MetricsSink, RenderContext};
use crate::surface::Surface;
use clise_core::clock::Instant;
use clise_core::elements::FrameProps;
use clise_core::group::{grouped_selection, selected_groups};
use clise_core::{CullingMetrics, Element, ElementId, PerformanceConfig, PerformanceConfigPatch, PerformanceManager, Quadtree};
use kurbo::Rect;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Upper bound on `parent_id` hops when collecting ancestor frames.
pub const MAX_ANCESTOR_HOPS: usize = 1000;

/// Draws whole frames onto a [`Surface`].
pub struct SceneRenderer {
    performance: PerformanceManager,
    caches: RenderCaches,
    reporter: Rc<dyn ErrorReporter>,
    metrics: Option<Box<dyn MetricsSink>>,
    last_element_count: Option<usize>,
}

impl Default for SceneRenderer {
    fn default() -> Self {
        Self::new(PerformanceConfig::default())
    }
}

impl std::fmt::Debug for SceneRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneRenderer")
            .field("performance", &self.performance)
            .field("caches", &self.caches)
            .field("last_element_count", &self.last_element_count)
            .finish_non_exhaustive()
    }
}

impl SceneRenderer {
    pub fn new(config: PerformanceConfig) -> Self {
        Self::with_performance(PerformanceManager::new(config))
    }

    /// Use a pre-built performance manager (e.g. one with an injected clock).
    pub fn with_performance(performance: PerformanceManager) -> Self {
        let reporter: Rc<dyn ErrorReporter> = Rc::new(LogErrorReporter);
        Self {
            performance,
            caches: RenderCaches::new(reporter.clone()),
            reporter,
            metrics: None,
            last_element_count: None,
        }
    }

    /// Route image decode failures to `reporter`.
    pub fn with_reporter(mut self, reporter: Rc<dyn ErrorReporter>) -> Self {
        self.caches.images.set_reporter(reporter.clone());
        self.reporter = reporter;
        self
    }

    /// Receive [`FrameMetrics`] after every frame.
    pub fn with_metrics_sink(mut self, sink: impl MetricsSink + 'static) -> Self {
        self.metrics = Some(Box::new(sink));
        self
    }

    /// Called (possibly from a decoder thread) when an image finishes
    /// decoding, so the host can schedule another frame.
    pub fn set_on_image_ready(&mut self, callback: Option<ReadyCallback>) {
        self.caches.images.set_on_ready(callback);
    }

    pub fn reporter(&self) -> &Rc<dyn ErrorReporter> {
        &self.reporter
    }

    pub fn performance(&self) -> &PerformanceManager {
        &self.performance
    }

    pub fn performance_mut(&mut self) -> &mut PerformanceManager {
        &mut self.performance
    }

    pub fn caches(&self) -> &RenderCaches {
        &self.caches
    }

    /// Merge a partial performance config.
    pub fn update_performance_config(&mut self, patch: &PerformanceConfigPatch) {
        self.performance.update_config(patch);
    }

    /// Last culling metrics plus current quadtree and cache statistics.
    pub fn get_performance_stats(&self) -> CullingMetrics {
        let mut metrics = self.performance.last_metrics().cloned().unwrap_or_default();
        metrics.quadtree_stats = self.performance.quadtree().map(Quadtree::stats);
        metrics.cache_stats = Some(self.caches.stats());
        metrics
    }

    /// Release every cached resource. The next frame re-indexes from scratch.
    pub fn cleanup(&mut self) {
        self.caches.clear();
        self.last_element_count = None;
        log::debug!("Renderer caches released");
    }

    /// Draw one frame. Without a surface this is a no-op.
    pub fn render(&mut self, surface: Option<&mut dyn Surface>, ctx: &RenderContext<'_>) {
        let Some(surface) = surface else {
            log::debug!("No surface, skipping frame");
            return;
        };
        let start = Instant::now();
        self.caches.images.poll();

        let element_count = ctx.elements.iter().filter(|e| e.visible).count();
        if self.last_element_count != Some(element_count) || !self.performance.is_initialized() {
            self.performance.rebuild_quadtree(ctx.elements, None);
            self.last_element_count = Some(element_count);
        }
        let (candidates, _) = self
            .performance
            .get_visible_elements(ctx.elements, &ctx.viewport, ctx.screen_size);
        let visible: Vec<&Element> = candidates.into_iter().filter(|e| e.visible).collect();
        let batching = self.performance.config().enable_batching;

        let zoom = sanitize(ctx.viewport.zoom);
        let dpr = sanitize(ctx.scale_factor);
        surface.save();
        surface.scale(dpr, dpr);
        surface.clear(ctx.theme.background());
        surface.translate(ctx.viewport.pan.x, ctx.viewport.pan.y);
        surface.scale(zoom, zoom);

        let mut draw = DrawContext::new(&mut self.caches, zoom, ctx.theme);
        if let Some(rect) = ctx.box_selection {
            selection::draw_box_selection(surface, &mut draw, rect);
        }

        let grouped = grouped_selection(ctx.groups, ctx.selection);
        let selected: HashSet<&str> = ctx.selection.iter().map(String::as_str).collect();
        let outlined = |element: &Element| selected.contains(element.id.as_str()) && !grouped.contains(&element.id);

        for &element in visible.iter().filter(|e| e.is_frame()) {
            surface.push_debug_group(&element.id);
            draw_with_selection(surface, &mut draw, element, outlined(element));
            surface.pop_debug_group();
        }

        let ancestors = AncestorIndex::new(ctx.elements, &visible);
        let others: Vec<&Element> = visible.iter().copied().filter(|e| !e.is_frame()).collect();
        let mut i = 0;
        while i < others.len() {
            let element = others[i];
            let clips = ancestors.clip_rects(element);
            let selected = outlined(element);

            if batching && clips.is_empty() && !selected {
                if let Some(key) = BatchKey::for_element(element) {
                    let run = batch_run(&others[i..], &key, &ancestors, &outlined);
                    if run > 1 {
                        let batch = Batch {
                            key: Some(key),
                            elements: others[i..i + run].to_vec(),
                        };
                        surface.push_debug_group(&format!("batch:{}", element.id));
                        render_batch(surface, &mut draw, &batch);
                        surface.pop_debug_group();
                        i += run;
                        continue;
                    }
                }
            }

            surface.push_debug_group(&element.id);
            if !clips.is_empty() {
                surface.save();
                for rect in &clips {
                    surface.clip_rect(*rect);
                }
            }
            draw_with_selection(surface, &mut draw, element, selected);
            if !clips.is_empty() {
                surface.restore();
            }
            surface.pop_debug_group();
            i += 1;
        }

        for group in selected_groups(ctx.groups, ctx.selection) {
            if let Some(bounds) = group.bounds(ctx.elements) {
                selection::draw_group_outline(surface, &mut draw, bounds);
            }
        }
        selection::draw_guides(surface, &mut draw, ctx.guides);

        surface.restore();
        surface.flush();

        let frame = FrameMetrics {
            element_count,
            visible_count: visible.len(),
            render_time: start.elapsed(),
        };
        if let Some(sink) = &self.metrics {
            sink.record_frame(&frame);
        }
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 { value } else { 1.0 }
}

fn draw_with_selection(surface: &mut dyn Surface, draw: &mut DrawContext<'_>, element: &Element, selected: bool) {
    let handled = draw_element(surface, draw, element, selected);
    if selected && !handled {
        selection::draw_selection(surface, draw, element);
    }
}

/// Length of the run at the start of `elements` that can share `key`'s paints.
fn batch_run(
    elements: &[&Element],
    key: &BatchKey,
    ancestors: &AncestorIndex<'_>,
    outlined: &impl Fn(&Element) -> bool,
) -> usize {
    elements
        .iter()
        .take_while(|&&e| {
            !outlined(e) && ancestors.clip_rects(e).is_empty() && BatchKey::for_element(e).as_ref() == Some(key)
        })
        .count()
}

/// `parent_id` lookup for ancestor-frame clipping. Empty when no visible
/// element has a parent.
struct AncestorIndex<'a> {
    by_id: HashMap<&'a str, &'a Element>,
}

impl<'a> AncestorIndex<'a> {
    fn new(elements: &'a [Element], visible: &[&Element]) -> Self {
        let by_id = if visible.iter().any(|e| e.parent_id.is_some()) {
            elements.iter().map(|e| (e.id.as_str(), e)).collect()
        } else {
            HashMap::new()
        };
        Self { by_id }
    }

    /// Content rects of the clipping ancestor frames, outermost first.
    fn clip_rects(&self, element: &Element) -> Vec<Rect> {
        let mut rects = Vec::new();
        if self.by_id.is_empty() {
            return rects;
        }
        let mut seen: HashSet<&ElementId> = HashSet::new();
        let mut current = element.parent_id.as_ref();
        let mut hops = 0;
        while let Some(id) = current {
            if hops == MAX_ANCESTOR_HOPS || !seen.insert(id) {
                log::warn!("Ancestor chain of {} is cyclic or too deep, stopping", element.id);
                break;
            }
            hops += 1;
            let Some(parent) = self.by_id.get(id.as_str()) else {
                break;
            };
            if let Some(frame) = parent.as_frame().filter(|f| f.clip_content) {
                rects.push(content_rect(parent, frame));
            }
            current = parent.parent_id.as_ref();
        }
        rects.reverse();
        rects
    }
}

/// The frame's normalized rect minus its padding.
pub fn content_rect(frame: &Element, props: &FrameProps) -> Rect {
    let r = frame.normalized_rect();
    let p = &props.padding;
    let x0 = r.x0 + p.left;
    let y0 = r.y0 + p.top;
    Rect::new(x0, y0, (r.x1 - p.right).max(x0), (r.y1 - p.bottom).max(y0))
}
