//! Item Entity
//!
//! A node of the organizer tree: folders, smart folders, projects,
//! registrations, components and pointers (cross-links).

use serde::{Deserialize, Serialize};

use super::entity::Entity;
use super::ids::{ItemId, NodeId};

/// Item kind determines drop and drag capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemKind {
    /// Real folder owning pointer memberships
    Folder,
    /// Virtual, query-derived grouping. Never a drop target, never dragged.
    SmartFolder,
    Project,
    Registration,
    Component,
    /// Registration that is also a component
    RegisteredComponent,
    /// Cross-link to a project or component
    Pointer,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Folder => "folder",
            ItemKind::SmartFolder => "smartFolder",
            ItemKind::Project => "project",
            ItemKind::Registration => "registration",
            ItemKind::Component => "component",
            ItemKind::RegisteredComponent => "registeredComponent",
            ItemKind::Pointer => "link",
        }
    }

    /// Only real folders take dropped items
    pub fn accepts_drops(&self) -> bool {
        matches!(self, ItemKind::Folder)
    }

    /// Smart folders are never dragged into real memberships
    pub fn is_draggable_kind(&self) -> bool {
        !matches!(self, ItemKind::SmartFolder)
    }

    /// Counts against a target's `accepts_components` flag
    pub fn is_component(&self) -> bool {
        matches!(self, ItemKind::Component | ItemKind::RegisteredComponent)
    }

    /// Counts against a target's `accepts_folders` flag
    pub fn is_folder(&self) -> bool {
        matches!(self, ItemKind::Folder)
    }

    pub fn is_smart_folder(&self) -> bool {
        matches!(self, ItemKind::SmartFolder)
    }
}

/// Capability flags delivered by the server per item. Never inferred locally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Permissions {
    pub view: bool,
    pub edit: bool,
    pub movable: bool,
    pub copyable: bool,
    pub accepts_components: bool,
    pub accepts_folders: bool,
    pub accepts_moves: bool,
    pub accepts_copies: bool,
}

/// A tree item with its single ownership edge
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// Transient handle assigned by the tree
    pub id: ItemId,
    /// Backend identifier
    pub node_id: NodeId,
    pub name: String,
    /// Owning item (None = root)
    pub parent_id: Option<ItemId>,
    pub kind: ItemKind,
    pub permissions: Permissions,
    /// Loaded children in display order
    pub children: Vec<ItemId>,
    /// Auto-expand on next load
    pub expand: bool,
    /// Child count reported by the server before the children are loaded
    pub children_count: u32,
}

impl Item {
    pub fn new(id: ItemId, node_id: NodeId, name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id,
            node_id,
            name: name.into(),
            parent_id: None,
            kind,
            permissions: Permissions::default(),
            children: Vec::new(),
            expand: false,
            children_count: 0,
        }
    }

    /// Build a tree item from a server listing row
    pub fn from_record(id: ItemId, parent_id: Option<ItemId>, record: &ItemRecord) -> Self {
        Self {
            id,
            node_id: record.node_id.clone(),
            name: record.name.clone(),
            parent_id,
            kind: record.kind(),
            permissions: record.permissions,
            children: Vec::new(),
            expand: record.expand,
            children_count: record.children_count,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn can_move(&self) -> bool {
        self.kind.is_draggable_kind() && self.permissions.movable
    }

    pub fn can_copy(&self) -> bool {
        self.kind.is_draggable_kind() && self.permissions.copyable
    }

    pub fn is_draggable(&self) -> bool {
        self.can_move() || self.can_copy()
    }
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// One row of a children listing as the server sends it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    #[serde(rename = "node_id")]
    pub node_id: NodeId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_folder: bool,
    #[serde(default)]
    pub is_smart_folder: bool,
    #[serde(default)]
    pub is_project: bool,
    #[serde(default)]
    pub is_registration: bool,
    #[serde(default)]
    pub is_component: bool,
    #[serde(default)]
    pub is_pointer: bool,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default)]
    pub expand: bool,
    #[serde(default)]
    pub children_count: u32,
}

impl ItemRecord {
    pub fn new(node_id: impl Into<NodeId>, name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            node_id: node_id.into(),
            name: name.into(),
            is_folder: kind == ItemKind::Folder,
            is_smart_folder: kind == ItemKind::SmartFolder,
            is_project: kind == ItemKind::Project,
            is_registration: matches!(kind, ItemKind::Registration | ItemKind::RegisteredComponent),
            is_component: matches!(kind, ItemKind::Component | ItemKind::RegisteredComponent),
            is_pointer: kind == ItemKind::Pointer,
            permissions: Permissions::default(),
            expand: false,
            children_count: 0,
        }
    }

    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }

    /// Collapse the flag matrix into one kind. A row without flags is a folder.
    pub fn kind(&self) -> ItemKind {
        if self.is_smart_folder {
            ItemKind::SmartFolder
        } else if self.is_folder {
            ItemKind::Folder
        } else if self.is_registration && self.is_component {
            ItemKind::RegisteredComponent
        } else if self.is_registration {
            ItemKind::Registration
        } else if self.is_component {
            ItemKind::Component
        } else if self.is_project {
            ItemKind::Project
        } else if self.is_pointer {
            ItemKind::Pointer
        } else {
            ItemKind::Folder
        }
    }
}
