//! Blur image filter cache.

use super::bounded;
use clise_core::BlurKind;
use lru::LruCache;
use std::sync::Arc;

/// Entries kept by the blur filter cache.
pub const BLUR_CACHE_SIZE: usize = 100;

/// Which compositing recipe a blur belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlurVariant {
    /// Blurs the element's own fill; edges fade to transparent.
    Layer,
    /// Frosted background; edges clamp so the blur stays opaque to the rim.
    Background,
    /// Soft pass used by the layered glass composite.
    Glassy,
}

impl From<BlurKind> for BlurVariant {
    fn from(kind: BlurKind) -> Self {
        match kind {
            BlurKind::Layer => BlurVariant::Layer,
            BlurKind::Background => BlurVariant::Background,
        }
    }
}

/// How samples outside the blurred content are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeMode {
    /// Outside is transparent.
    Decal,
    /// Outside repeats the nearest edge pixel.
    Clamp,
}

/// A Gaussian blur image filter.
#[derive(Debug, Clone, PartialEq)]
pub struct BlurFilter {
    pub variant: BlurVariant,
    /// Blur radius in the units of the draw it applies to.
    pub radius: f64,
    pub edge_mode: EdgeMode,
}

impl BlurFilter {
    /// Gaussian standard deviation for this radius.
    pub fn sigma(&self) -> f64 {
        self.radius / 2.0
    }
}

/// Caches blur filters by `(variant, radius)`.
#[derive(Debug)]
pub struct BlurFilterCache {
    filters: LruCache<(BlurVariant, u64), Arc<BlurFilter>>,
}

impl Default for BlurFilterCache {
    fn default() -> Self {
        Self::new()
    }
}

impl BlurFilterCache {
    pub fn new() -> Self {
        Self {
            filters: bounded(BLUR_CACHE_SIZE),
        }
    }

    /// The filter for `variant` at `radius`; `None` when the radius is not
    /// positive.
    pub fn get(&mut self, variant: BlurVariant, radius: f64) -> Option<Arc<BlurFilter>> {
        if !radius.is_finite() || radius <= 0.0 {
            return None;
        }
        let key = (variant, radius.to_bits());
        if let Some(filter) = self.filters.peek(&key) {
            return Some(Arc::clone(filter));
        }
        let edge_mode = match variant {
            BlurVariant::Layer => EdgeMode::Decal,
            BlurVariant::Background | BlurVariant::Glassy => EdgeMode::Clamp,
        };
        let filter = Arc::new(BlurFilter {
            variant,
            radius,
            edge_mode,
        });
        self.filters.push(key, Arc::clone(&filter));
        Some(filter)
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn clear(&mut self) {
        self.filters.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_positive_radius_has_no_filter() {
        let mut cache = BlurFilterCache::new();
        assert!(cache.get(BlurVariant::Layer, 0.0).is_none());
        assert!(cache.get(BlurVariant::Layer, -3.0).is_none());
        assert!(cache.get(BlurVariant::Layer, f64::NAN).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_edge_modes() {
        let mut cache = BlurFilterCache::new();
        let layer = cache.get(BlurVariant::Layer, 4.0);
        let background = cache.get(BlurVariant::Background, 4.0);
        assert_eq!(layer.map(|f| f.edge_mode), Some(EdgeMode::Decal));
        assert_eq!(background.map(|f| f.edge_mode), Some(EdgeMode::Clamp));
    }

    #[test]
    fn test_reuses_filter() {
        let mut cache = BlurFilterCache::new();
        let a = cache.get(BlurVariant::Glassy, 12.0);
        let b = cache.get(BlurVariant::Glassy, 12.0);
        assert!(matches!((a, b), (Some(a), Some(b)) if Arc::ptr_eq(&a, &b)));
        assert_eq!(cache.len(), 1);
    }
}
