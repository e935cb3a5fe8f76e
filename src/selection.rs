//! Selection Filter
//!
//! Multi-select may span several parents. Every drag, drop and batch removal
//! works on one parent context, so the active selection is reduced to the
//! anchor's siblings before use.

use crate::domain::ItemId;
use crate::tree::HierarchyTree;

/// Active selection of the tree widget
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Primary-clicked item
    pub anchor: Option<ItemId>,
    /// Multi-selected items in selection order
    pub items: Vec<ItemId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain click: `id` becomes the anchor and the only selected item
    pub fn select(&mut self, id: ItemId) {
        self.anchor = Some(id);
        self.items = vec![id];
    }

    /// Modifier click: add or remove `id` from the multi-selection
    pub fn toggle(&mut self, id: ItemId) {
        if let Some(pos) = self.items.iter().position(|i| *i == id) {
            self.items.remove(pos);
        } else {
            self.items.push(id);
            self.anchor = Some(id);
        }
    }

    pub fn clear(&mut self) {
        self.anchor = None;
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Keep only the selected items sharing the anchor's parent.
///
/// Selections of fewer than two items are returned untouched. Otherwise the
/// selection is replaced by the filtered set, so highlighting follows it.
/// Ids the tree no longer knows are dropped.
pub fn filter_to_anchor_parent(tree: &HierarchyTree, selection: &mut Selection) -> Vec<ItemId> {
    if selection.items.len() < 2 {
        return selection.items.clone();
    }

    let anchor_parent = selection
        .anchor
        .and_then(|anchor| tree.get(anchor))
        .map(|anchor| anchor.parent_id);

    let filtered: Vec<ItemId> = match anchor_parent {
        Some(parent) => selection
            .items
            .iter()
            .copied()
            .filter(|id| tree.get(*id).is_some_and(|item| item.parent_id == parent))
            .collect(),
        None => Vec::new(),
    };

    if filtered.len() != selection.items.len() {
        log::debug!(
            "Selection reduced from {} to {} items sharing the anchor's parent",
            selection.items.len(),
            filtered.len()
        );
    }
    selection.items = filtered.clone();
    filtered
}
