//! Drop Acceptance Validator
//!
//! Hierarchy and capability checks for dropping a sibling set onto a folder.
//! With `mode == None` only the capability flags are checked; passing the
//! resolved mode additionally checks the folder accepts that specific
//! transfer.

use crate::domain::{Item, ItemId};
use crate::tree::HierarchyTree;

use super::{PolicyViolation, TransferMode};

/// Check whether `folder` takes `items`, returning the first violated rule
pub fn check_drop(
    tree: &HierarchyTree,
    items: &[ItemId],
    folder: ItemId,
    mode: Option<TransferMode>,
) -> Result<(), PolicyViolation> {
    let target = tree.get(folder).ok_or(PolicyViolation::UnknownItem)?;
    if target.kind.is_smart_folder() {
        return Err(PolicyViolation::SmartFolder);
    }
    if !target.kind.accepts_drops() {
        return Err(PolicyViolation::NotAFolder);
    }

    let dragged = items
        .iter()
        .map(|id| tree.get(*id).ok_or(PolicyViolation::UnknownItem))
        .collect::<Result<Vec<&Item>, _>>()?;
    let representative = dragged.first().ok_or(PolicyViolation::EmptySelection)?;

    // Every dragged item is checked, not only the representative: siblings
    // share a parent but not their descendants.
    for item in &dragged {
        if item.id == folder {
            return Err(PolicyViolation::SelfDrop);
        }
        if tree.is_ancestor(item.id, folder) {
            return Err(PolicyViolation::Cycle);
        }
    }

    let source = tree.parent(representative.id);
    if source.is_some_and(|parent| parent.node_id == target.node_id) {
        return Err(PolicyViolation::SameParent);
    }

    let has_components = dragged.iter().any(|item| item.kind.is_component());
    let has_folders = dragged.iter().any(|item| item.kind.is_folder());
    let copyable = dragged.iter().all(|item| item.can_copy());
    let movable = source.is_some() && dragged.iter().all(|item| item.can_move());

    let accepts = &target.permissions;
    if has_components && !accepts.accepts_components {
        return Err(PolicyViolation::RejectsComponents);
    }
    if has_folders && !accepts.accepts_folders {
        return Err(PolicyViolation::RejectsFolders);
    }
    match mode {
        Some(TransferMode::Move) if !(accepts.accepts_moves && movable) => {
            Err(PolicyViolation::RejectsMoves)
        }
        Some(TransferMode::Copy) if !(accepts.accepts_copies && copyable) => {
            Err(PolicyViolation::RejectsCopies)
        }
        _ => Ok(()),
    }
}

/// Boolean form of [`check_drop`]
pub fn can_accept_drop(
    tree: &HierarchyTree,
    items: &[ItemId],
    folder: ItemId,
    mode: Option<TransferMode>,
) -> bool {
    check_drop(tree, items, folder, mode).is_ok()
}
