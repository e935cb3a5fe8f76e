//! Drag Session
//!
//! Created at drag-start, updated on every drag-over tick, consumed by the
//! drop. Holds the modifier key and the last resolved mode so nothing leaks
//! between gestures.

use crate::domain::ItemId;
use crate::tree::HierarchyTree;

use super::mode::resolve_mode;
use super::DragMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    items: Vec<ItemId>,
    alt_held: bool,
    target: Option<ItemId>,
    mode: DragMode,
}

impl DragSession {
    pub fn new(items: Vec<ItemId>) -> Self {
        Self {
            items,
            alt_held: false,
            target: None,
            mode: DragMode::Forbidden,
        }
    }

    /// Dragged siblings, representative first
    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    pub fn alt_held(&self) -> bool {
        self.alt_held
    }

    pub fn set_alt_held(&mut self, held: bool) {
        self.alt_held = held;
    }

    pub fn target(&self) -> Option<ItemId> {
        self.target
    }

    pub fn mode(&self) -> DragMode {
        self.mode
    }

    /// Re-resolve the mode for the hovered `target`
    pub fn update(&mut self, tree: &HierarchyTree, target: ItemId) -> DragMode {
        self.target = Some(target);
        self.mode = resolve_mode(tree, &self.items, target, self.alt_held);
        self.mode
    }

    /// Pointer left every drop target
    pub fn leave(&mut self) {
        self.target = None;
        self.mode = DragMode::Forbidden;
    }
}
