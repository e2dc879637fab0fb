//! Quadtree spatial index over element bounding boxes.
//!
//! Items that straddle a split line are stored in every child they touch, so
//! a query returns a candidate set that may contain duplicates. Callers that
//! draw the result dedupe by id.

use crate::elements::{Element, ElementId};
use crate::geometry::{rect_is_finite, rects_intersect, union_rects};
use kurbo::Rect;
use serde::Serialize;

/// Half-extent of the world square used when there is nothing to index.
pub const DEFAULT_WORLD_HALF_EXTENT: f64 = 50_000.0;

/// An indexed entry: element id and its bounds at insertion time.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadItem {
    pub id: ElementId,
    pub bounds: Rect,
}

impl QuadItem {
    pub fn new(id: impl Into<ElementId>, bounds: Rect) -> Self {
        Self {
            id: id.into(),
            bounds,
        }
    }
}

impl From<&Element> for QuadItem {
    fn from(element: &Element) -> Self {
        Self {
            id: element.id.clone(),
            bounds: element.bounds(),
        }
    }
}

/// Diagnostic counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuadtreeStats {
    pub total_nodes: usize,
    pub leaf_nodes: usize,
    pub total_elements: usize,
    pub max_depth: usize,
}

#[derive(Debug)]
struct Node {
    bounds: Rect,
    level: usize,
    items: Vec<QuadItem>,
    children: Option<Box<[Node; 4]>>,
}

impl Node {
    fn new(bounds: Rect, level: usize) -> Self {
        Self {
            bounds,
            level,
            items: Vec::new(),
            children: None,
        }
    }

    fn split(&mut self) {
        let Rect { x0, y0, x1, y1 } = self.bounds;
        let mx = (x0 + x1) / 2.0;
        let my = (y0 + y1) / 2.0;
        let level = self.level + 1;
        self.children = Some(Box::new([
            Node::new(Rect::new(x0, y0, mx, my), level),
            Node::new(Rect::new(mx, y0, x1, my), level),
            Node::new(Rect::new(x0, my, mx, y1), level),
            Node::new(Rect::new(mx, my, x1, y1), level),
        ]));
    }

    fn insert(&mut self, item: QuadItem, max_items: usize, max_levels: usize) {
        if !rects_intersect(self.bounds, item.bounds) {
            return;
        }
        if let Some(children) = self.children.as_mut() {
            insert_into_children(children, item, max_items, max_levels);
            return;
        }
        if self.items.len() < max_items || self.level >= max_levels {
            self.items.push(item);
            return;
        }

        self.split();
        let existing = std::mem::take(&mut self.items);
        if let Some(children) = self.children.as_mut() {
            for old in existing {
                insert_into_children(children, old, max_items, max_levels);
            }
            insert_into_children(children, item, max_items, max_levels);
        }
    }

    fn remove(&mut self, id: &str) -> bool {
        if let Some(pos) = self.items.iter().position(|item| item.id == id) {
            self.items.remove(pos);
            return true;
        }
        match self.children.as_mut() {
            Some(children) => children.iter_mut().any(|child| child.remove(id)),
            None => false,
        }
    }

    fn query<'a>(&'a self, range: Rect, out: &mut Vec<&'a QuadItem>) {
        if !rects_intersect(self.bounds, range) {
            return;
        }
        out.extend(self.items.iter().filter(|item| rects_intersect(item.bounds, range)));
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.query(range, out);
            }
        }
    }

    fn collect_stats(&self, stats: &mut QuadtreeStats) {
        stats.total_nodes += 1;
        stats.total_elements += self.items.len();
        stats.max_depth = stats.max_depth.max(self.level);
        match &self.children {
            Some(children) => children.iter().for_each(|c| c.collect_stats(stats)),
            None => stats.leaf_nodes += 1,
        }
    }
}

fn insert_into_children(children: &mut [Node; 4], item: QuadItem, max_items: usize, max_levels: usize) {
    let targets: Vec<usize> = (0..4)
        .filter(|&i| rects_intersect(children[i].bounds, item.bounds))
        .collect();
    let Some((&last, rest)) = targets.split_last() else {
        return;
    };
    for &i in rest {
        children[i].insert(item.clone(), max_items, max_levels);
    }
    children[last].insert(item, max_items, max_levels);
}

/// Region quadtree keyed by element bounds.
#[derive(Debug)]
pub struct Quadtree {
    root: Node,
    max_items: usize,
    max_levels: usize,
}

impl Quadtree {
    /// Create an empty tree covering `bounds`.
    pub fn new(bounds: Rect, max_items: usize, max_levels: usize) -> Self {
        Self {
            root: Node::new(bounds, 0),
            max_items: max_items.max(1),
            max_levels,
        }
    }

    /// World rectangle covered by the root.
    pub fn bounds(&self) -> Rect {
        self.root.bounds
    }

    /// Clear and reinsert every item.
    ///
    /// Without explicit `bounds`, the root covers the union of all finite item
    /// bounds, or a ±50,000 square when there are none.
    pub fn rebuild(&mut self, items: impl IntoIterator<Item = QuadItem>, bounds: Option<Rect>) {
        let items: Vec<QuadItem> = items
            .into_iter()
            .filter(|item| rect_is_finite(item.bounds))
            .collect();
        let bounds = bounds
            .or_else(|| union_rects(items.iter().map(|item| item.bounds)))
            .unwrap_or_else(default_world_bounds);
        self.root = Node::new(bounds, 0);
        for item in items {
            self.insert(item);
        }
    }

    /// Insert an item. Items outside the root bounds are dropped.
    pub fn insert(&mut self, item: QuadItem) {
        self.root.insert(item, self.max_items, self.max_levels);
    }

    /// Remove the first stored entry with `id`. Returns whether one was found.
    pub fn remove(&mut self, id: &str) -> bool {
        self.root.remove(id)
    }

    /// Items whose bounds intersect `range`. May contain duplicates.
    pub fn query(&self, range: Rect) -> Vec<&QuadItem> {
        let mut out = Vec::new();
        self.root.query(range, &mut out);
        out
    }

    /// Node and element counts.
    pub fn stats(&self) -> QuadtreeStats {
        let mut stats = QuadtreeStats::default();
        self.root.collect_stats(&mut stats);
        stats
    }
}

/// The fixed square indexed before any content exists.
pub fn default_world_bounds() -> Rect {
    Rect::new(
        -DEFAULT_WORLD_HALF_EXTENT,
        -DEFAULT_WORLD_HALF_EXTENT,
        DEFAULT_WORLD_HALF_EXTENT,
        DEFAULT_WORLD_HALF_EXTENT,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn item(id: &str, x: f64, y: f64, w: f64, h: f64) -> QuadItem {
        QuadItem::new(id, Rect::new(x, y, x + w, y + h))
    }

    #[test]
    fn test_split_after_capacity() {
        let mut tree = Quadtree::new(Rect::new(0.0, 0.0, 100.0, 100.0), 2, 4);
        tree.insert(item("a", 1.0, 1.0, 2.0, 2.0));
        tree.insert(item("b", 60.0, 1.0, 2.0, 2.0));
        assert_eq!(tree.stats().total_nodes, 1);
        tree.insert(item("c", 1.0, 60.0, 2.0, 2.0));
        let stats = tree.stats();
        assert_eq!(stats.total_nodes, 5);
        assert_eq!(stats.leaf_nodes, 4);
        assert_eq!(stats.total_elements, 3);
    }

    #[test]
    fn test_straddling_item_stored_in_each_child() {
        let mut tree = Quadtree::new(Rect::new(0.0, 0.0, 100.0, 100.0), 1, 4);
        tree.insert(item("a", 1.0, 1.0, 2.0, 2.0));
        tree.insert(item("center", 40.0, 40.0, 20.0, 20.0));
        assert_eq!(tree.stats().total_elements, 5);
        let ids: HashSet<&str> = tree
            .query(Rect::new(45.0, 45.0, 55.0, 55.0))
            .into_iter()
            .map(|i| i.id.as_str())
            .collect();
        assert_eq!(ids, HashSet::from(["center"]));
    }

    #[test]
    fn test_max_level_accepts_unbounded() {
        let mut tree = Quadtree::new(Rect::new(0.0, 0.0, 100.0, 100.0), 1, 0);
        for i in 0..20 {
            tree.insert(item(&i.to_string(), 1.0, 1.0, 1.0, 1.0));
        }
        let stats = tree.stats();
        assert_eq!(stats.total_nodes, 1);
        assert_eq!(stats.total_elements, 20);
    }

    #[test]
    fn test_outside_root_is_ignored() {
        let mut tree = Quadtree::new(Rect::new(0.0, 0.0, 10.0, 10.0), 4, 4);
        tree.insert(item("far", 100.0, 100.0, 1.0, 1.0));
        assert_eq!(tree.stats().total_elements, 0);
    }

    #[test]
    fn test_remove() {
        let mut tree = Quadtree::new(Rect::new(0.0, 0.0, 100.0, 100.0), 4, 4);
        tree.insert(item("a", 1.0, 1.0, 2.0, 2.0));
        assert!(tree.remove("a"));
        assert!(!tree.remove("a"));
        assert!(tree.query(Rect::new(0.0, 0.0, 100.0, 100.0)).is_empty());
    }

    #[test]
    fn test_rebuild_bounds() {
        let mut tree = Quadtree::new(Rect::ZERO, 4, 4);
        tree.rebuild(Vec::new(), None);
        assert_eq!(tree.bounds(), default_world_bounds());

        tree.rebuild(
            vec![item("a", -5.0, 0.0, 5.0, 5.0), item("b", 20.0, 10.0, 5.0, 5.0)],
            None,
        );
        assert_eq!(tree.bounds(), Rect::new(-5.0, 0.0, 25.0, 15.0));
        assert_eq!(tree.query(tree.bounds()).len(), 2);
    }

    fn arb_rect() -> impl Strategy<Value = Rect> {
        (-1000.0f64..1000.0, -1000.0f64..1000.0, 0.0f64..300.0, 0.0f64..300.0)
            .prop_map(|(x, y, w, h)| Rect::new(x, y, x + w, y + h))
    }

    proptest! {
        #[test]
        fn prop_query_never_under_reports(
            rects in prop::collection::vec(arb_rect(), 0..200),
            range in arb_rect(),
            max_items in 1usize..12,
            max_levels in 0usize..8,
        ) {
            let items: Vec<QuadItem> = rects
                .iter()
                .enumerate()
                .map(|(i, r)| QuadItem::new(i.to_string(), *r))
                .collect();
            let mut tree = Quadtree::new(Rect::ZERO, max_items, max_levels);
            tree.rebuild(items.clone(), None);

            let found: HashSet<&str> = tree.query(range).into_iter().map(|i| i.id.as_str()).collect();
            for item in &items {
                if rects_intersect(item.bounds, range) {
                    prop_assert!(found.contains(item.id.as_str()), "missing {}", item.id);
                }
            }
        }
    }
}
