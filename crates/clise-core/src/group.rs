//! Element groups.
//!
//! Groups are owned by the store; the engine only reads them to draw one
//! selection outline per selected group.

use crate::elements::{Element, ElementId};
use crate::geometry::union_rects;
use kurbo::Rect;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// A named set of elements that is selected and moved as a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub element_ids: Vec<ElementId>,
    #[serde(default)]
    pub collapsed: bool,
}

impl Group {
    /// Create a group over the given members.
    pub fn new(name: impl Into<String>, element_ids: Vec<ElementId>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            element_ids,
            collapsed: false,
        }
    }

    /// Create a group with a specific ID.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Whether `id` is a member of this group.
    pub fn contains(&self, id: &str) -> bool {
        self.element_ids.iter().any(|member| member == id)
    }

    /// Union of the members' normalized bounds, recomputed from the current
    /// element geometry. `None` when no member is present in `elements`.
    pub fn bounds(&self, elements: &[Element]) -> Option<Rect> {
        let members: HashSet<&str> = self.element_ids.iter().map(String::as_str).collect();
        union_rects(
            elements
                .iter()
                .filter(|e| members.contains(e.id.as_str()))
                .map(Element::bounds),
        )
    }
}

/// Groups whose id is in the selection.
pub fn selected_groups<'a>(groups: &'a [Group], selection: &[ElementId]) -> Vec<&'a Group> {
    groups
        .iter()
        .filter(|g| selection.iter().any(|id| *id == g.id))
        .collect()
}

/// Ids of selected elements that belong to a selected group. Those members
/// get no individual selection outline.
pub fn grouped_selection(groups: &[Group], selection: &[ElementId]) -> HashSet<ElementId> {
    let mut grouped = HashSet::new();
    for group in selected_groups(groups, selection) {
        for id in &group.element_ids {
            if selection.contains(id) {
                grouped.insert(id.clone());
            }
        }
    }
    grouped
}
