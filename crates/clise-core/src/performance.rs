//! Performance manager: decides how the visible set is computed each frame
//! and owns the quadtree's rebuild schedule.
//!
//! Rebuilds are debounced through a small state machine:
//!
//! ```text
//! Idle ──request (recent rebuild)──▶ Scheduled{due} ──tick ≥ due──▶ Rebuilding ──▶ Idle
//!   └──request (no recent rebuild)──────────────────────────────────▶ Rebuilding ──▶ Idle
//! ```
//!
//! A request while `Scheduled` replaces the pending payload but keeps the
//! timer. A request while `Rebuilding` sets `rebuild_again`, which schedules
//! one more pass when the current one finishes.

use crate::clock::{Clock, Duration, Instant, SystemClock};
use crate::elements::Element;
use crate::geometry::{rect_is_finite, union_rects};
use crate::quadtree::{QuadItem, Quadtree, QuadtreeStats, default_world_bounds};
use crate::viewport::{Viewport, ViewportBounds, cull_elements};
use kurbo::{Rect, Size};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Minimum margin added around content when sizing the quadtree root.
pub const MIN_WORLD_MARGIN: f64 = 5000.0;

/// Tuning knobs for culling and indexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PerformanceConfig {
    pub enable_culling: bool,
    pub enable_quadtree: bool,
    pub enable_batching: bool,
    /// Fraction of the visible world size added on every side.
    pub viewport_buffer: f64,
    /// Scenes with at most this many elements are never culled.
    pub culling_threshold: usize,
    pub quadtree_max_elements: usize,
    pub quadtree_max_levels: usize,
    pub rebuild_threshold_ms: u64,
    pub rebuild_delay_ms: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            enable_culling: true,
            enable_quadtree: true,
            enable_batching: false,
            viewport_buffer: 0.2,
            culling_threshold: 1000,
            quadtree_max_elements: 10,
            quadtree_max_levels: 8,
            rebuild_threshold_ms: 2000,
            rebuild_delay_ms: 100,
        }
    }
}

/// Partial update for [`PerformanceConfig`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PerformanceConfigPatch {
    pub enable_culling: Option<bool>,
    pub enable_quadtree: Option<bool>,
    pub enable_batching: Option<bool>,
    pub viewport_buffer: Option<f64>,
    pub culling_threshold: Option<usize>,
    pub quadtree_max_elements: Option<usize>,
    pub quadtree_max_levels: Option<usize>,
    pub rebuild_threshold_ms: Option<u64>,
    pub rebuild_delay_ms: Option<u64>,
}

impl PerformanceConfig {
    /// Apply a patch. Returns true when an option affecting the quadtree changed.
    pub fn merge(&mut self, patch: &PerformanceConfigPatch) -> bool {
        let before = (self.enable_quadtree, self.quadtree_max_elements, self.quadtree_max_levels);
        if let Some(v) = patch.enable_culling {
            self.enable_culling = v;
        }
        if let Some(v) = patch.enable_quadtree {
            self.enable_quadtree = v;
        }
        if let Some(v) = patch.enable_batching {
            self.enable_batching = v;
        }
        if let Some(v) = patch.viewport_buffer.filter(|v| v.is_finite() && *v >= 0.0) {
            self.viewport_buffer = v;
        }
        if let Some(v) = patch.culling_threshold {
            self.culling_threshold = v;
        }
        if let Some(v) = patch.quadtree_max_elements {
            self.quadtree_max_elements = v.max(1);
        }
        if let Some(v) = patch.quadtree_max_levels {
            self.quadtree_max_levels = v;
        }
        if let Some(v) = patch.rebuild_threshold_ms {
            self.rebuild_threshold_ms = v;
        }
        if let Some(v) = patch.rebuild_delay_ms {
            self.rebuild_delay_ms = v;
        }
        before != (self.enable_quadtree, self.quadtree_max_elements, self.quadtree_max_levels)
    }
}

/// Sizes of the renderer's caches, filled in by the render crate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub color_entries: usize,
    pub color_handle_entries: usize,
    pub path_entries: usize,
    pub blur_filter_entries: usize,
    pub paint_pool_free: usize,
    pub paint_allocations: usize,
    pub paint_disposals: usize,
    pub image_entries: usize,
    pub image_pending: usize,
}

/// Per-call culling record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CullingMetrics {
    pub total_elements: usize,
    pub visible_elements: usize,
    pub culled_elements: usize,
    pub culling_time: Duration,
    pub quadtree_stats: Option<QuadtreeStats>,
    pub cache_stats: Option<CacheStats>,
}

/// Rebuild scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildState {
    Idle,
    Scheduled { due: Instant },
    Rebuilding,
}

/// What a rebuild request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildOutcome {
    /// Signature matched the indexed content.
    Unchanged,
    /// Index was rebuilt synchronously.
    Rebuilt,
    /// A deferred rebuild is pending.
    Scheduled,
    /// The quadtree is turned off.
    Disabled,
}

#[derive(Debug)]
struct PendingRebuild {
    items: Vec<QuadItem>,
    bounds: Rect,
    signature: String,
}

/// Orchestrates the quadtree, viewport culling and their configuration.
pub struct PerformanceManager {
    config: PerformanceConfig,
    clock: Box<dyn Clock>,
    quadtree: Option<Quadtree>,
    state: RebuildState,
    pending: Option<PendingRebuild>,
    rebuild_again: bool,
    /// Skip the debounce on the next request.
    force_next: bool,
    last_signature: Option<String>,
    last_rebuild: Option<Instant>,
    rebuild_count: usize,
    last_metrics: Option<CullingMetrics>,
}

impl Default for PerformanceManager {
    fn default() -> Self {
        Self::new(PerformanceConfig::default())
    }
}

impl std::fmt::Debug for PerformanceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerformanceManager")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("rebuild_count", &self.rebuild_count)
            .finish_non_exhaustive()
    }
}

impl PerformanceManager {
    /// Create a manager using the system clock.
    pub fn new(config: PerformanceConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }

    /// Create a manager with an injected clock.
    pub fn with_clock(config: PerformanceConfig, clock: impl Clock + 'static) -> Self {
        Self {
            config,
            clock: Box::new(clock),
            quadtree: None,
            state: RebuildState::Idle,
            pending: None,
            rebuild_again: false,
            force_next: false,
            last_signature: None,
            last_rebuild: None,
            rebuild_count: 0,
            last_metrics: None,
        }
    }

    pub fn config(&self) -> &PerformanceConfig {
        &self.config
    }

    pub fn state(&self) -> RebuildState {
        self.state
    }

    /// Number of rebuilds actually performed.
    pub fn rebuild_count(&self) -> usize {
        self.rebuild_count
    }

    /// Whether a quadtree has been built.
    pub fn is_initialized(&self) -> bool {
        self.quadtree.is_some()
    }

    pub fn quadtree(&self) -> Option<&Quadtree> {
        self.quadtree.as_ref()
    }

    /// Metrics of the last [`get_visible_elements`](Self::get_visible_elements) call.
    pub fn last_metrics(&self) -> Option<&CullingMetrics> {
        self.last_metrics.as_ref()
    }

    /// Merge a partial config. Changing a quadtree option makes the next
    /// rebuild request bypass both the signature check and the debounce.
    pub fn update_config(&mut self, patch: &PerformanceConfigPatch) {
        if self.config.merge(patch) {
            log::debug!("Quadtree options changed, forcing next rebuild");
            self.force_next = true;
            self.last_signature = None;
            if !self.config.enable_quadtree {
                self.quadtree = None;
                self.pending = None;
                self.state = RebuildState::Idle;
            }
        }
    }

    /// Request a quadtree rebuild for `elements`.
    pub fn rebuild_quadtree(&mut self, elements: &[Element], bounds: Option<Rect>) -> RebuildOutcome {
        if !self.config.enable_quadtree {
            return RebuildOutcome::Disabled;
        }
        let signature = content_signature(elements);
        let target = self
            .pending
            .as_ref()
            .map(|p| &p.signature)
            .or(self.last_signature.as_ref());
        if !self.force_next && target == Some(&signature) {
            return RebuildOutcome::Unchanged;
        }

        let items: Vec<QuadItem> = elements
            .iter()
            .map(QuadItem::from)
            .filter(|item| rect_is_finite(item.bounds))
            .collect();
        let bounds = bounds.unwrap_or_else(|| world_bounds(&items));
        let payload = PendingRebuild {
            items,
            bounds,
            signature,
        };

        match self.state {
            RebuildState::Rebuilding => {
                self.pending = Some(payload);
                self.rebuild_again = true;
                RebuildOutcome::Scheduled
            }
            RebuildState::Scheduled { .. } if self.force_next => {
                log::debug!("Quadtree options changed, dropping scheduled rebuild");
                self.pending = None;
                self.perform_rebuild(payload);
                RebuildOutcome::Rebuilt
            }
            RebuildState::Scheduled { .. } => {
                self.pending = Some(payload);
                RebuildOutcome::Scheduled
            }
            RebuildState::Idle => {
                let now = self.clock.now();
                let threshold = Duration::from_millis(self.config.rebuild_threshold_ms);
                let recent = self
                    .last_rebuild
                    .is_some_and(|at| now.duration_since(at) < threshold);
                if recent && !self.force_next {
                    let due = now + Duration::from_millis(self.config.rebuild_delay_ms);
                    log::debug!("Deferring quadtree rebuild by {}ms", self.config.rebuild_delay_ms);
                    self.state = RebuildState::Scheduled { due };
                    self.pending = Some(payload);
                    RebuildOutcome::Scheduled
                } else {
                    self.perform_rebuild(payload);
                    RebuildOutcome::Rebuilt
                }
            }
        }
    }

    /// Fire a scheduled rebuild whose delay has elapsed. Returns whether one ran.
    pub fn tick(&mut self) -> bool {
        let RebuildState::Scheduled { due } = self.state else {
            return false;
        };
        if self.clock.now() < due {
            return false;
        }
        match self.pending.take() {
            Some(payload) => {
                self.perform_rebuild(payload);
                true
            }
            None => {
                self.state = RebuildState::Idle;
                false
            }
        }
    }

    fn perform_rebuild(&mut self, payload: PendingRebuild) {
        self.state = RebuildState::Rebuilding;
        let count = payload.items.len();
        let mut tree = Quadtree::new(
            payload.bounds,
            self.config.quadtree_max_elements,
            self.config.quadtree_max_levels,
        );
        tree.rebuild(payload.items, Some(payload.bounds));
        self.quadtree = Some(tree);

        let now = self.clock.now();
        self.rebuild_count += 1;
        self.last_signature = Some(payload.signature);
        self.last_rebuild = Some(now);
        self.force_next = false;
        log::debug!("Rebuilt quadtree with {} elements", count);

        self.state = RebuildState::Idle;
        if std::mem::take(&mut self.rebuild_again) && self.pending.is_some() {
            self.state = RebuildState::Scheduled {
                due: now + Duration::from_millis(self.config.rebuild_delay_ms),
            };
        }
    }

    /// Compute the elements to draw for this viewport, in input order.
    ///
    /// Runs any due scheduled rebuild first.
    pub fn get_visible_elements<'a>(
        &mut self,
        elements: &'a [Element],
        viewport: &Viewport,
        screen: Size,
    ) -> (Vec<&'a Element>, CullingMetrics) {
        self.tick();
        let start = Instant::now();
        let total = elements.len();
        let bounds = viewport.bounds(screen, self.config.viewport_buffer);
        let mut quadtree_stats = None;

        let visible: Vec<&Element> = if total <= self.config.culling_threshold {
            elements.iter().collect()
        } else if let Some(tree) = self.quadtree.as_ref().filter(|_| self.config.enable_quadtree) {
            quadtree_stats = Some(tree.stats());
            query_in_order(tree, elements, &bounds)
        } else if self.config.enable_culling {
            cull_elements(elements, viewport, screen, self.config.viewport_buffer, true).visible
        } else {
            elements.iter().collect()
        };

        let metrics = CullingMetrics {
            total_elements: total,
            visible_elements: visible.len(),
            culled_elements: total - visible.len(),
            culling_time: start.elapsed(),
            quadtree_stats,
            cache_stats: None,
        };
        self.last_metrics = Some(metrics.clone());
        (visible, metrics)
    }
}

/// Resolve a quadtree candidate set back to elements, deduplicated and in
/// z-order.
fn query_in_order<'a>(tree: &Quadtree, elements: &'a [Element], bounds: &ViewportBounds) -> Vec<&'a Element> {
    let ids: HashSet<&str> = tree
        .query(bounds.to_rect())
        .into_iter()
        .map(|item| item.id.as_str())
        .collect();
    elements.iter().filter(|e| ids.contains(e.id.as_str())).collect()
}

/// Position/size signature of the whole element list.
pub fn content_signature(elements: &[Element]) -> String {
    let mut signature = String::with_capacity(elements.len() * 32);
    for (i, element) in elements.iter().enumerate() {
        if i > 0 {
            signature.push('|');
        }
        signature.push_str(&element.signature());
    }
    signature
}

/// Root bounds for `items`: content AABB grown by `max(5000, span/2)` per
/// axis, or the default world square when empty.
pub fn world_bounds(items: &[QuadItem]) -> Rect {
    match union_rects(items.iter().map(|item| item.bounds)) {
        Some(content) => {
            let mx = MIN_WORLD_MARGIN.max(content.width() * 0.5);
            let my = MIN_WORLD_MARGIN.max(content.height() * 0.5);
            content.inflate(mx, my)
        }
        None => default_world_bounds(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use kurbo::Vec2;

    fn grid(n: usize, spacing: f64) -> Vec<Element> {
        let side = (n as f64).sqrt().ceil() as usize;
        (0..n)
            .map(|i| {
                let x = (i % side) as f64 * spacing;
                let y = (i / side) as f64 * spacing;
                Element::rect(x, y, 10.0, 10.0).with_id(format!("e{}", i))
            })
            .collect()
    }

    #[test]
    fn test_small_scenes_are_not_culled() {
        let mut manager = PerformanceManager::default();
        let elements = grid(1000, 500.0);
        manager.rebuild_quadtree(&elements, None);
        let (visible, metrics) =
            manager.get_visible_elements(&elements, &Viewport::default(), Size::new(100.0, 100.0));
        assert_eq!(visible.len(), 1000);
        assert_eq!(metrics.culled_elements, 0);
        assert!(metrics.quadtree_stats.is_none());
    }

    #[test]
    fn test_quadtree_results_deduped_and_ordered() {
        let mut manager = PerformanceManager::default();
        let mut elements = grid(1500, 50.0);
        // A large element that straddles many nodes
        elements.insert(0, Element::rect(-10.0, -10.0, 2000.0, 2000.0).with_id("big"));
        manager.rebuild_quadtree(&elements, None);
        let (visible, metrics) =
            manager.get_visible_elements(&elements, &Viewport::default(), Size::new(200.0, 200.0));
        assert_eq!(visible.iter().filter(|e| e.id == "big").count(), 1);
        assert_eq!(visible[0].id, "big");
        assert!(metrics.quadtree_stats.is_some());
        assert!(visible.len() < elements.len());
    }

    #[test]
    fn test_basic_culling_when_quadtree_disabled() {
        let config = PerformanceConfig {
            enable_quadtree: false,
            ..Default::default()
        };
        let mut manager = PerformanceManager::new(config);
        let elements = grid(2000, 100.0);
        assert_eq!(manager.rebuild_quadtree(&elements, None), RebuildOutcome::Disabled);
        let (visible, metrics) =
            manager.get_visible_elements(&elements, &Viewport::default(), Size::new(300.0, 300.0));
        assert!(visible.len() < 100);
        assert_eq!(metrics.culled_elements, 2000 - visible.len());
    }

    #[test]
    fn test_unchanged_signature_skips_rebuild() {
        let mut manager = PerformanceManager::default();
        let elements = grid(10, 20.0);
        assert_eq!(manager.rebuild_quadtree(&elements, None), RebuildOutcome::Rebuilt);
        assert_eq!(manager.rebuild_quadtree(&elements, None), RebuildOutcome::Unchanged);
        assert_eq!(manager.rebuild_count(), 1);
    }

    #[test]
    fn test_debounce_coalesces_burst() {
        let clock = ManualClock::new();
        let mut manager = PerformanceManager::with_clock(PerformanceConfig::default(), clock.clone());
        let mut elements = grid(10, 20.0);
        assert_eq!(manager.rebuild_quadtree(&elements, None), RebuildOutcome::Rebuilt);

        for step in 0..5 {
            elements[0].x = step as f64 + 1.0;
            clock.advance(Duration::from_millis(10));
            assert_eq!(manager.rebuild_quadtree(&elements, None), RebuildOutcome::Scheduled);
        }
        assert!(matches!(manager.state(), RebuildState::Scheduled { .. }));
        assert_eq!(manager.rebuild_count(), 1);

        // Timer was armed by the first deferred request and is not pushed back.
        clock.advance(Duration::from_millis(60));
        assert!(manager.tick());
        assert_eq!(manager.rebuild_count(), 2);
        assert_eq!(manager.state(), RebuildState::Idle);
        assert_eq!(manager.rebuild_quadtree(&elements, None), RebuildOutcome::Unchanged);
    }

    #[test]
    fn test_rebuild_after_threshold_is_immediate() {
        let clock = ManualClock::new();
        let mut manager = PerformanceManager::with_clock(PerformanceConfig::default(), clock.clone());
        let mut elements = grid(4, 20.0);
        manager.rebuild_quadtree(&elements, None);
        clock.advance(Duration::from_millis(2500));
        elements[1].w = 99.0;
        assert_eq!(manager.rebuild_quadtree(&elements, None), RebuildOutcome::Rebuilt);
    }

    #[test]
    fn test_config_change_forces_rebuild() {
        let clock = ManualClock::new();
        let mut manager = PerformanceManager::with_clock(PerformanceConfig::default(), clock.clone());
        let elements = grid(4, 20.0);
        manager.rebuild_quadtree(&elements, None);
        manager.update_config(&PerformanceConfigPatch {
            quadtree_max_elements: Some(2),
            ..Default::default()
        });
        assert_eq!(manager.rebuild_quadtree(&elements, None), RebuildOutcome::Rebuilt);
        assert_eq!(manager.rebuild_count(), 2);

        // Non-quadtree options don't force anything.
        manager.update_config(&PerformanceConfigPatch {
            viewport_buffer: Some(0.5),
            ..Default::default()
        });
        assert_eq!(manager.rebuild_quadtree(&elements, None), RebuildOutcome::Unchanged);
        assert!((manager.config().viewport_buffer - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_config_change_bypasses_scheduled_rebuild() {
        let clock = ManualClock::new();
        let mut manager = PerformanceManager::with_clock(PerformanceConfig::default(), clock.clone());
        let mut elements = grid(4, 20.0);
        manager.rebuild_quadtree(&elements, None);
        elements[0].x = 5.0;
        clock.advance(Duration::from_millis(10));
        assert_eq!(manager.rebuild_quadtree(&elements, None), RebuildOutcome::Scheduled);

        manager.update_config(&PerformanceConfigPatch {
            quadtree_max_elements: Some(2),
            ..Default::default()
        });
        assert_eq!(manager.rebuild_quadtree(&elements, None), RebuildOutcome::Rebuilt);
        assert_eq!(manager.rebuild_count(), 2);
        assert_eq!(manager.state(), RebuildState::Idle);

        // the old timer no longer fires
        clock.advance(Duration::from_millis(200));
        assert!(!manager.tick());
        assert_eq!(manager.rebuild_count(), 2);
    }

    #[test]
    fn test_visible_query_runs_due_rebuild() {
        let clock = ManualClock::new();
        let mut manager = PerformanceManager::with_clock(PerformanceConfig::default(), clock.clone());
        let mut elements = grid(1200, 100.0);
        manager.rebuild_quadtree(&elements, None);
        elements.push(Element::rect(10.0, 10.0, 5.0, 5.0).with_id("late"));
        assert_eq!(manager.rebuild_quadtree(&elements, None), RebuildOutcome::Scheduled);

        clock.advance(Duration::from_millis(150));
        let (visible, _) = manager.get_visible_elements(
            &elements,
            &Viewport::new(Vec2::ZERO, 1.0),
            Size::new(200.0, 200.0),
        );
        assert!(visible.iter().any(|e| e.id == "late"));
        assert_eq!(manager.rebuild_count(), 2);
    }

    #[test]
    fn test_world_bounds_margin() {
        assert_eq!(world_bounds(&[]), default_world_bounds());
        let items = vec![QuadItem::new("a", Rect::new(0.0, 0.0, 20_000.0, 100.0))];
        let bounds = world_bounds(&items);
        assert!((bounds.x0 - -10_000.0).abs() < f64::EPSILON);
        assert!((bounds.y0 - -5000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_patch_from_partial_json() {
        let patch: PerformanceConfigPatch =
            serde_json::from_str(r#"{"enableBatching":true,"cullingThreshold":50}"#).unwrap();
        let mut config = PerformanceConfig::default();
        assert!(!config.merge(&patch));
        assert!(config.enable_batching);
        assert_eq!(config.culling_threshold, 50);
    }
}
