//! Rounded rectangle path cache.

use super::bounded;
use clise_core::CornerRadii;
use kurbo::{BezPath, Rect, RoundedRect, RoundedRectRadii, Shape};
use lru::LruCache;
use std::sync::Arc;

/// Entries kept by the path cache.
pub const PATH_CACHE_SIZE: usize = 100;

const PATH_TOLERANCE: f64 = 0.1;

/// Caches rounded-rectangle outlines by exact geometry.
#[derive(Debug)]
pub struct PathCache {
    paths: LruCache<String, Arc<BezPath>>,
}

impl Default for PathCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PathCache {
    pub fn new() -> Self {
        Self {
            paths: bounded(PATH_CACHE_SIZE),
        }
    }

    /// Outline of `rect` with `radii`, each clamped to half the shorter side.
    ///
    /// Repeated calls with the same geometry return the same `Arc`.
    pub fn rounded_rect(&mut self, rect: Rect, radii: &CornerRadii) -> Arc<BezPath> {
        let rect = rect.abs();
        let radii = radii.clamped(rect.width().min(rect.height()) / 2.0);
        let key = format!(
            "{},{},{},{},{},{},{},{}",
            rect.x0,
            rect.y0,
            rect.width(),
            rect.height(),
            radii.top_left,
            radii.top_right,
            radii.bottom_right,
            radii.bottom_left
        );
        if let Some(path) = self.paths.peek(&key) {
            return Arc::clone(path);
        }
        let path = Arc::new(build_rounded_rect(rect, &radii));
        if let Some((evicted, _)) = self.paths.push(key, Arc::clone(&path)) {
            log::trace!("Path cache evicted {evicted}");
        }
        path
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }
}

/// Build the outline without caching. Radii must already be clamped.
pub fn build_rounded_rect(rect: Rect, radii: &CornerRadii) -> BezPath {
    if radii.is_zero() {
        return rect.to_path(PATH_TOLERANCE);
    }
    RoundedRect::from_rect(
        rect,
        RoundedRectRadii::new(
            radii.top_left,
            radii.top_right,
            radii.bottom_right,
            radii.bottom_left,
        ),
    )
    .to_path(PATH_TOLERANCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_geometry_reuses_path() {
        let mut cache = PathCache::new();
        let rect = Rect::new(10.0, 10.0, 110.0, 60.0);
        let a = cache.rounded_rect(rect, &CornerRadii::uniform(8.0));
        let b = cache.rounded_rect(rect, &CornerRadii::uniform(8.0));
        assert!(Arc::ptr_eq(&a, &b));
        let c = cache.rounded_rect(rect, &CornerRadii::uniform(9.0));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_radius_clamped_to_half_side() {
        let mut cache = PathCache::new();
        let rect = Rect::new(0.0, 0.0, 100.0, 20.0);
        let huge = cache.rounded_rect(rect, &CornerRadii::uniform(500.0));
        let clamped = cache.rounded_rect(rect, &CornerRadii::uniform(10.0));
        assert!(Arc::ptr_eq(&huge, &clamped));
    }

    #[test]
    fn test_zero_radius_is_plain_rect() {
        let mut cache = PathCache::new();
        let rect = Rect::new(0.0, 0.0, 40.0, 30.0);
        let path = cache.rounded_rect(rect, &CornerRadii::default());
        let bbox = path.bounding_box();
        assert_eq!(bbox, rect);
        // moveto, four linetos and closepath
        assert!(path.elements().len() <= 6);
    }

    #[test]
    fn test_bounded() {
        let mut cache = PathCache::new();
        for i in 0..(PATH_CACHE_SIZE + 10) {
            cache.rounded_rect(Rect::new(0.0, 0.0, 50.0 + i as f64, 50.0), &CornerRadii::uniform(4.0));
        }
        assert_eq!(cache.len(), PATH_CACHE_SIZE);
    }

    #[test]
    fn test_eviction_follows_insertion_order() {
        let mut cache = PathCache::new();
        let radii = CornerRadii::uniform(4.0);
        let rect = |i: usize| Rect::new(0.0, 0.0, 50.0 + i as f64, 50.0);
        let first = cache.rounded_rect(rect(0), &radii);
        for i in 1..PATH_CACHE_SIZE {
            cache.rounded_rect(rect(i), &radii);
        }
        // a hit does not make the oldest entry younger
        assert!(Arc::ptr_eq(&first, &cache.rounded_rect(rect(0), &radii)));
        let second = cache.rounded_rect(rect(1), &radii);
        cache.rounded_rect(rect(PATH_CACHE_SIZE), &radii);
        assert_eq!(cache.len(), PATH_CACHE_SIZE);
        assert!(!Arc::ptr_eq(&first, &cache.rounded_rect(rect(0), &radii)));
        // rebuilding rect(0) pushed out rect(1), the next oldest
        assert!(!Arc::ptr_eq(&second, &cache.rounded_rect(rect(1), &radii)));
    }
}
