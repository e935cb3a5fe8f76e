//! Drag Mode Resolver
//!
//! Evaluated on every drag-over tick. Acceptance is checked twice: first on
//! capability flags alone, then again for the chosen mode, since a folder may
//! take the class of item but refuse that particular copy or move.

use crate::domain::ItemId;
use crate::tree::HierarchyTree;

use super::accept::check_drop;
use super::{DragMode, PolicyViolation, TransferMode};

/// Resolve the transfer for dropping `items` on `target`, or why it is refused
pub fn resolve(
    tree: &HierarchyTree,
    items: &[ItemId],
    target: ItemId,
    alt_held: bool,
) -> Result<TransferMode, PolicyViolation> {
    let dragged: Vec<_> = items.iter().filter_map(|id| tree.get(*id)).collect();
    if dragged.len() != items.len() {
        return Err(PolicyViolation::UnknownItem);
    }

    let has_source = items.first().and_then(|id| tree.parent(*id)).is_some();
    let can_copy = dragged.iter().all(|item| item.can_copy());
    let can_move = has_source && dragged.iter().all(|item| item.can_move());
    let is_self = items.contains(&target);

    check_drop(tree, items, target, None)?;

    let mode = match (can_move, can_copy) {
        (true, true) if alt_held => TransferMode::Copy,
        (true, _) => TransferMode::Move,
        (false, true) => TransferMode::Copy,
        (false, false) => return Err(PolicyViolation::NoCapability),
    };

    check_drop(tree, items, target, Some(mode))?;

    if is_self {
        return Err(PolicyViolation::SelfDrop);
    }
    Ok(mode)
}

/// Mode for cursor and hover feedback
pub fn resolve_mode(
    tree: &HierarchyTree,
    items: &[ItemId],
    target: ItemId,
    alt_held: bool,
) -> DragMode {
    match resolve(tree, items, target, alt_held) {
        Ok(mode) => mode.into(),
        Err(reason) => {
            log::debug!("Drop of {} item(s) on {} forbidden: {}", items.len(), target, reason);
            DragMode::Forbidden
        }
    }
}
