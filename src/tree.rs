//! Hierarchy Model
//!
//! In-memory tree of the loaded items. Every item has at most one owning
//! parent; cross-links live in the tree as separate pointer items.
//! Children are loaded lazily, so a folder may be known with an empty
//! `children` list until it is refreshed.

use std::collections::HashMap;

use crate::domain::{DomainError, DomainResult, Entity, Item, ItemId, ItemRecord, NodeId};

/// Arena of items keyed by their transient id
#[derive(Debug, Clone, Default)]
pub struct HierarchyTree {
    items: HashMap<ItemId, Item>,
    roots: Vec<ItemId>,
    next_id: u32,
}

impl HierarchyTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> ItemId {
        self.next_id += 1;
        ItemId(self.next_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.get_mut(&id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn roots(&self) -> &[ItemId] {
        &self.roots
    }

    /// Loaded children of `id` (empty when unknown or not loaded)
    pub fn children(&self, id: ItemId) -> &[ItemId] {
        self.items.get(&id).map(|i| i.children.as_slice()).unwrap_or(&[])
    }

    /// Loaded child of `parent` (or root when None) with the given backend id
    pub fn find_child(&self, parent: Option<ItemId>, node: &NodeId) -> Option<ItemId> {
        let siblings = match parent {
            Some(pid) => self.children(pid),
            None => self.roots.as_slice(),
        };
        siblings
            .iter()
            .copied()
            .find(|id| self.items.get(id).is_some_and(|item| &item.node_id == node))
    }

    /// Owning item of `id`, None for roots and unknown ids
    pub fn parent(&self, id: ItemId) -> Option<&Item> {
        self.items
            .get(&id)
            .and_then(|item| item.parent_id)
            .and_then(|pid| self.items.get(&pid))
    }

    /// True when `candidate` lies on the parent chain of `item`.
    ///
    /// An item is not its own ancestor; callers compare identity separately.
    pub fn is_ancestor(&self, candidate: ItemId, item: ItemId) -> bool {
        let mut current = self.items.get(&item).and_then(|i| i.parent_id);
        let mut steps = 0;
        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            steps += 1;
            if steps > self.items.len() {
                log::error!("Parent chain of {} does not terminate", item);
                return false;
            }
            current = self.items.get(&id).and_then(|i| i.parent_id);
        }
        false
    }

    /// Insert one record under `parent` (or as a root) and return its new id
    pub fn insert(&mut self, parent: Option<ItemId>, record: &ItemRecord) -> DomainResult<ItemId> {
        if let Some(pid) = parent {
            if !self.contains(pid) {
                return Err(DomainError::NotFound(format!("Parent item {} not found", pid)));
            }
        }

        let id = self.allocate();
        let item = Item::from_record(id, parent, record);
        match parent {
            Some(pid) => {
                if let Some(p) = self.items.get_mut(&pid) {
                    p.children.push(id);
                }
            }
            None => self.roots.push(id),
        }
        self.items.insert(item.id(), item);
        Ok(id)
    }

    /// Drop the whole tree and load `records` as the new top level
    pub fn set_roots(&mut self, records: &[ItemRecord]) -> Vec<ItemId> {
        self.items.clear();
        self.roots.clear();
        records
            .iter()
            .filter_map(|record| self.insert(None, record).ok())
            .collect()
    }

    /// Replace the loaded subtree of `parent` with a fresh listing.
    ///
    /// Previously loaded descendants are discarded, new children get new ids.
    pub fn replace_children(
        &mut self,
        parent: ItemId,
        records: &[ItemRecord],
    ) -> DomainResult<Vec<ItemId>> {
        if !self.contains(parent) {
            return Err(DomainError::NotFound(format!("Item {} not found", parent)));
        }
        self.clear_children(parent);

        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            ids.push(self.insert(Some(parent), record)?);
        }
        if let Some(p) = self.items.get_mut(&parent) {
            p.children_count = ids.len() as u32;
        }
        Ok(ids)
    }

    /// Forget the loaded descendants of `id`, keeping `id` itself
    pub fn clear_children(&mut self, id: ItemId) {
        let mut to_visit = match self.items.get_mut(&id) {
            Some(item) => std::mem::take(&mut item.children),
            None => return,
        };
        while let Some(current) = to_visit.pop() {
            if let Some(removed) = self.items.remove(&current) {
                to_visit.extend(removed.children);
            }
        }
    }

    /// Detach `id` from its parent (or the roots) and drop its subtree
    pub fn remove(&mut self, id: ItemId) -> Option<Item> {
        self.clear_children(id);
        let item = self.items.remove(&id)?;
        match item.parent_id.and_then(|pid| self.items.get_mut(&pid)) {
            Some(parent) => {
                parent.children.retain(|c| *c != id);
                parent.children_count = parent.children.len() as u32;
            }
            None => self.roots.retain(|r| *r != id),
        }
        Some(item)
    }

    /// Visible rows as (id, depth) pairs in display order.
    ///
    /// Only expanded items contribute their children.
    pub fn flatten(&self) -> Vec<(ItemId, usize)> {
        fn collect(
            tree: &HierarchyTree,
            ids: &[ItemId],
            depth: usize,
            result: &mut Vec<(ItemId, usize)>,
        ) {
            for id in ids {
                if let Some(item) = tree.items.get(id) {
                    result.push((*id, depth));
                    if item.expand {
                        collect(tree, &item.children, depth + 1, result);
                    }
                }
            }
        }

        let mut result = Vec::new();
        collect(self, &self.roots, 0, &mut result);
        result
    }
}
