//! Drag and Drop Policy
//!
//! Pure decisions taken while a drag gesture is in progress:
//! - mode: resolve move / copy / forbidden for the hovered target
//! - accept: capability and hierarchy checks gating a drop
//! - containment: which of two folders encloses the other
//! - session: per-gesture state threaded through the hooks

mod accept;
mod containment;
mod mode;
mod session;

pub use accept::{can_accept_drop, check_drop};
pub use containment::which_is_container;
pub use mode::{resolve, resolve_mode};
pub use session::DragSession;

/// Resolved intent of a drag gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragMode {
    Move,
    Copy,
    #[default]
    Forbidden,
}

impl DragMode {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, DragMode::Forbidden)
    }

    /// Cursor shown on the drag ghost
    pub fn cursor(&self) -> &'static str {
        match self {
            DragMode::Move => "move",
            DragMode::Copy => "copy",
            DragMode::Forbidden => "not-allowed",
        }
    }

    /// Class put on the hovered row
    pub fn hover_class(&self) -> &'static str {
        if self.is_allowed() {
            "tb-h-success"
        } else {
            "po-hover"
        }
    }
}

impl From<TransferMode> for DragMode {
    fn from(mode: TransferMode) -> Self {
        match mode {
            TransferMode::Move => DragMode::Move,
            TransferMode::Copy => DragMode::Copy,
        }
    }
}

/// An executable drop mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Move,
    Copy,
}

/// Expected "you can't drop there" outcomes. Never shown as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PolicyViolation {
    #[error("nothing is being dragged")]
    EmptySelection,
    #[error("item is not loaded in the tree")]
    UnknownItem,
    #[error("target is not a folder")]
    NotAFolder,
    #[error("smart folders do not take drops")]
    SmartFolder,
    #[error("cannot drop an item onto itself")]
    SelfDrop,
    #[error("cannot drop an item into its own descendant")]
    Cycle,
    #[error("items already live in this folder")]
    SameParent,
    #[error("folder does not accept components")]
    RejectsComponents,
    #[error("folder does not accept folders")]
    RejectsFolders,
    #[error("folder does not accept moves of these items")]
    RejectsMoves,
    #[error("folder does not accept copies of these items")]
    RejectsCopies,
    #[error("items can be neither moved nor copied")]
    NoCapability,
    #[error("item cannot be dragged")]
    NotDraggable,
    #[error("Not allowed: Private folder")]
    PrivateFolder,
    #[error("selection contains items that cannot be removed from the folder")]
    NotRemovable,
}
