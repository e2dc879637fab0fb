//! Per-renderer resource caches.
//!
//! Every cache is owned by one [`RenderCaches`] value, itself owned by a
//! single renderer. Nothing here is shared between renderer instances.

pub mod blur;
pub mod color;
pub mod gradient;
pub mod image;
pub mod paint_pool;
pub mod path;

pub use blur::{BlurFilter, BlurFilterCache, BlurVariant, EdgeMode};
pub use color::{ColorCache, Rgba};
pub use gradient::build_gradient;
pub use image::{ImageCache, ImageState, ReadyCallback};
pub use paint_pool::{PaintPool, PooledPaint};
pub use path::PathCache;

use crate::renderer::ErrorReporter;
use clise_core::CacheStats;
use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::rc::Rc;

/// A bounded cache evicting in insertion order.
///
/// Callers read with `peek`, which leaves recency untouched, and only insert
/// on a miss, so the least recently used entry is always the oldest insert.
pub(crate) fn bounded<K: Hash + Eq, V>(capacity: usize) -> LruCache<K, V> {
    LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN))
}

/// The cache set used by one renderer.
#[derive(Debug, Default)]
pub struct RenderCaches {
    pub colors: ColorCache,
    pub paths: PathCache,
    pub blurs: BlurFilterCache,
    pub paints: PaintPool,
    pub images: ImageCache,
}

impl RenderCaches {
    pub fn new(reporter: Rc<dyn ErrorReporter>) -> Self {
        Self {
            images: ImageCache::new(reporter),
            ..Default::default()
        }
    }

    /// Current sizes and pool counters.
    pub fn stats(&self) -> CacheStats {
        let (color_entries, color_handle_entries) = self.colors.len();
        CacheStats {
            color_entries,
            color_handle_entries,
            path_entries: self.paths.len(),
            blur_filter_entries: self.blurs.len(),
            paint_pool_free: self.paints.free_count(),
            paint_allocations: self.paints.allocations(),
            paint_disposals: self.paints.disposals(),
            image_entries: self.images.len(),
            image_pending: self.images.pending_count(),
        }
    }

    /// Release everything every cache holds.
    pub fn clear(&mut self) {
        self.colors.clear();
        self.paths.clear();
        self.blurs.clear();
        self.paints.clear();
        self.images.clear();
    }
}
