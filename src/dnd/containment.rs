//! Containment Resolver

use crate::domain::ItemId;
use crate::tree::HierarchyTree;

/// The one of `a` and `b` that encloses the other, if exactly one does
pub fn which_is_container(tree: &HierarchyTree, a: ItemId, b: ItemId) -> Option<ItemId> {
    match (tree.is_ancestor(a, b), tree.is_ancestor(b, a)) {
        (true, false) => Some(a),
        (false, true) => Some(b),
        _ => None,
    }
}
