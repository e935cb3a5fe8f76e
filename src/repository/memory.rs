//! In-Memory Repository
//!
//! Keeps folder listings in process. Every call is recorded so callers can
//! assert which remote requests a flow issued, and any single operation can
//! be switched to fail.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::{DomainError, DomainResult, ItemKind, ItemRecord, NodeId, Permissions};

use super::traits::{FolderRepository, PointerRepository};

/// Repository operation, used to inject failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    FetchPointerIds,
    AddPointers,
    MovePointers,
    DeletePointers,
    FetchChildren,
    SetExpanded,
    AddPointer,
    RemovePointer,
    CreateFolder,
    DeleteFolder,
    Rename,
}

/// One recorded repository call with its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    FetchPointerIds(NodeId),
    AddPointers { folder: NodeId, ids: Vec<NodeId> },
    MovePointers { ids: Vec<NodeId>, from: NodeId, to: NodeId },
    DeletePointers { ids: Vec<NodeId>, folder: NodeId },
    FetchChildren(NodeId),
    SetExpanded(NodeId, bool),
    AddPointer { folder: NodeId, pointer: NodeId },
    RemovePointer { folder: NodeId, pointer: NodeId },
    CreateFolder { parent: NodeId, title: String },
    DeleteFolder(NodeId),
    Rename { node: NodeId, title: String },
}

impl RemoteCall {
    pub fn op(&self) -> RemoteOp {
        match self {
            RemoteCall::FetchPointerIds(_) => RemoteOp::FetchPointerIds,
            RemoteCall::AddPointers { .. } => RemoteOp::AddPointers,
            RemoteCall::MovePointers { .. } => RemoteOp::MovePointers,
            RemoteCall::DeletePointers { .. } => RemoteOp::DeletePointers,
            RemoteCall::FetchChildren(_) => RemoteOp::FetchChildren,
            RemoteCall::SetExpanded(..) => RemoteOp::SetExpanded,
            RemoteCall::AddPointer { .. } => RemoteOp::AddPointer,
            RemoteCall::RemovePointer { .. } => RemoteOp::RemovePointer,
            RemoteCall::CreateFolder { .. } => RemoteOp::CreateFolder,
            RemoteCall::DeleteFolder(_) => RemoteOp::DeleteFolder,
            RemoteCall::Rename { .. } => RemoteOp::Rename,
        }
    }

    /// Calls that change membership or folders. Reads and expand-state
    /// bookkeeping are not writes.
    pub fn is_write(&self) -> bool {
        !matches!(
            self.op(),
            RemoteOp::FetchPointerIds | RemoteOp::FetchChildren | RemoteOp::SetExpanded
        )
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    /// Every node known to the backend
    catalog: HashMap<NodeId, ItemRecord>,
    /// Ordered children listing per node
    listings: HashMap<NodeId, Vec<NodeId>>,
    calls: Vec<RemoteCall>,
    failing: HashSet<RemoteOp>,
    next_folder: u32,
}

impl MemoryState {
    fn listing_mut(&mut self, node: &NodeId) -> DomainResult<&mut Vec<NodeId>> {
        self.listings
            .get_mut(node)
            .ok_or_else(|| DomainError::NotFound(format!("Folder {} not found", node)))
    }

    fn check_known(&self, ids: &[NodeId]) -> DomainResult<()> {
        match ids.iter().find(|id| !self.catalog.contains_key(*id)) {
            Some(missing) => Err(DomainError::NotFound(format!("Node {} not found", missing))),
            None => Ok(()),
        }
    }

    fn link(&mut self, folder: &NodeId, ids: &[NodeId]) -> DomainResult<()> {
        self.check_known(ids)?;
        let listing = self.listing_mut(folder)?;
        for id in ids {
            if !listing.contains(id) {
                listing.push(id.clone());
            }
        }
        Ok(())
    }

    fn unlink(&mut self, folder: &NodeId, ids: &[NodeId]) -> DomainResult<()> {
        let listing = self.listing_mut(folder)?;
        listing.retain(|id| !ids.contains(id));
        Ok(())
    }

    fn update_counts(&mut self) {
        for (node, listing) in &self.listings {
            if let Some(record) = self.catalog.get_mut(node) {
                record.children_count = listing.len() as u32;
            }
        }
    }
}

/// Repository backed by process memory
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    state: Mutex<MemoryState>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `call`, then fail it if its operation is switched off
    fn begin(&self, call: RemoteCall) -> DomainResult<MutexGuard<'_, MemoryState>> {
        let mut state = self.state();
        let op = call.op();
        state.calls.push(call);
        if state.failing.contains(&op) {
            return Err(DomainError::Remote(format!("{:?} failed", op)));
        }
        Ok(state)
    }

    /// Register a node under `parent`. Folders get an empty listing.
    pub fn insert(&self, parent: &NodeId, record: ItemRecord) {
        let mut state = self.state();
        let node = record.node_id.clone();
        if record.kind().accepts_drops() {
            state.listings.entry(node.clone()).or_default();
        }
        state.catalog.insert(node.clone(), record);
        let listing = state.listings.entry(parent.clone()).or_default();
        if !listing.contains(&node) {
            listing.push(node);
        }
        state.update_counts();
    }

    /// Register a node without linking it anywhere
    pub fn insert_detached(&self, record: ItemRecord) {
        let mut state = self.state();
        if record.kind().accepts_drops() {
            state.listings.entry(record.node_id.clone()).or_default();
        }
        state.catalog.insert(record.node_id.clone(), record);
    }

    /// Make every later call of `op` fail with a remote error
    pub fn fail(&self, op: RemoteOp) {
        self.state().failing.insert(op);
    }

    pub fn recover(&self, op: RemoteOp) {
        self.state().failing.remove(&op);
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state().calls.clone()
    }

    pub fn writes(&self) -> Vec<RemoteCall> {
        self.state().calls.iter().filter(|c| c.is_write()).cloned().collect()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Current children of `node` in listing order
    pub fn membership(&self, node: &NodeId) -> Vec<NodeId> {
        self.state().listings.get(node).cloned().unwrap_or_default()
    }

    pub fn record(&self, node: &NodeId) -> Option<ItemRecord> {
        self.state().catalog.get(node).cloned()
    }
}

#[async_trait]
impl PointerRepository for InMemoryRepository {
    async fn fetch_child_pointer_ids(&self, folder: &NodeId) -> DomainResult<HashSet<NodeId>> {
        let mut state = self.begin(RemoteCall::FetchPointerIds(folder.clone()))?;
        let listing = state.listing_mut(folder)?;
        Ok(listing.iter().cloned().collect())
    }

    async fn add_pointers(&self, folder: &NodeId, ids: &[NodeId]) -> DomainResult<()> {
        let mut state = self.begin(RemoteCall::AddPointers {
            folder: folder.clone(),
            ids: ids.to_vec(),
        })?;
        state.link(folder, ids)?;
        state.update_counts();
        Ok(())
    }

    async fn move_pointers(&self, ids: &[NodeId], from: &NodeId, to: &NodeId) -> DomainResult<()> {
        let mut state = self.begin(RemoteCall::MovePointers {
            ids: ids.to_vec(),
            from: from.clone(),
            to: to.clone(),
        })?;
        // Validate both ends before touching either listing
        state.listing_mut(from)?;
        state.listing_mut(to)?;
        state.check_known(ids)?;
        state.unlink(from, ids)?;
        state.link(to, ids)?;
        state.update_counts();
        Ok(())
    }

    async fn delete_pointers(&self, ids: &[NodeId], folder: &NodeId) -> DomainResult<()> {
        let mut state = self.begin(RemoteCall::DeletePointers {
            ids: ids.to_vec(),
            folder: folder.clone(),
        })?;
        state.unlink(folder, ids)?;
        state.update_counts();
        Ok(())
    }
}

#[async_trait]
impl FolderRepository for InMemoryRepository {
    async fn fetch_children(&self, node: &NodeId) -> DomainResult<Vec<ItemRecord>> {
        let state = self.begin(RemoteCall::FetchChildren(node.clone()))?;
        let listing = state
            .listings
            .get(node)
            .ok_or_else(|| DomainError::NotFound(format!("Node {} not found", node)))?;
        Ok(listing
            .iter()
            .filter_map(|id| state.catalog.get(id).cloned())
            .collect())
    }

    async fn set_expanded(&self, node: &NodeId, expanded: bool) -> DomainResult<()> {
        let mut state = self.begin(RemoteCall::SetExpanded(node.clone(), expanded))?;
        let record = state
            .catalog
            .get_mut(node)
            .ok_or_else(|| DomainError::NotFound(format!("Node {} not found", node)))?;
        record.expand = expanded;
        Ok(())
    }

    async fn add_pointer(&self, folder: &NodeId, pointer: &NodeId) -> DomainResult<()> {
        let mut state = self.begin(RemoteCall::AddPointer {
            folder: folder.clone(),
            pointer: pointer.clone(),
        })?;
        if state.listing_mut(folder)?.contains(pointer) {
            return Err(DomainError::Conflict(format!("{} is already in {}", pointer, folder)));
        }
        state.link(folder, std::slice::from_ref(pointer))?;
        state.update_counts();
        Ok(())
    }

    async fn remove_pointer(&self, folder: &NodeId, pointer: &NodeId) -> DomainResult<()> {
        let mut state = self.begin(RemoteCall::RemovePointer {
            folder: folder.clone(),
            pointer: pointer.clone(),
        })?;
        state.unlink(folder, std::slice::from_ref(pointer))?;
        state.update_counts();
        Ok(())
    }

    async fn create_folder(&self, parent: &NodeId, title: &str) -> DomainResult<()> {
        let mut state = self.begin(RemoteCall::CreateFolder {
            parent: parent.clone(),
            title: title.to_string(),
        })?;
        state.listing_mut(parent)?;

        state.next_folder += 1;
        let node = NodeId::new(format!("folder-{}", state.next_folder));
        let permissions = Permissions {
            view: true,
            edit: true,
            movable: true,
            copyable: true,
            accepts_components: true,
            accepts_folders: true,
            accepts_moves: true,
            accepts_copies: true,
        };
        let record =
            ItemRecord::new(node.clone(), title, ItemKind::Folder).with_permissions(permissions);
        state.catalog.insert(node.clone(), record);
        state.listings.insert(node.clone(), Vec::new());
        state.link(parent, &[node])?;
        state.update_counts();
        Ok(())
    }

    async fn delete_folder(&self, node: &NodeId) -> DomainResult<()> {
        let mut state = self.begin(RemoteCall::DeleteFolder(node.clone()))?;
        let is_folder = state.catalog.get(node).is_some_and(|r| r.kind() == ItemKind::Folder);
        if !is_folder {
            return Err(DomainError::NotFound(format!("Folder {} not found", node)));
        }

        // Sub-folders go with it, linked projects stay in the catalog
        let mut doomed = vec![node.clone()];
        let mut index = 0;
        while index < doomed.len() {
            let children = state.listings.get(&doomed[index]).cloned().unwrap_or_default();
            for child in children {
                let child_is_folder = state
                    .catalog
                    .get(&child)
                    .is_some_and(|r| r.kind() == ItemKind::Folder);
                if child_is_folder && !doomed.contains(&child) {
                    doomed.push(child);
                }
            }
            index += 1;
        }

        for folder in &doomed {
            state.catalog.remove(folder);
            state.listings.remove(folder);
        }
        for listing in state.listings.values_mut() {
            listing.retain(|id| !doomed.contains(id));
        }
        state.update_counts();
        Ok(())
    }

    async fn rename(&self, node: &NodeId, title: &str) -> DomainResult<()> {
        let mut state = self.begin(RemoteCall::Rename {
            node: node.clone(),
            title: title.to_string(),
        })?;
        let record = state
            .catalog
            .get_mut(node)
            .ok_or_else(|| DomainError::NotFound(format!("Node {} not found", node)))?;
        record.name = title.to_string();
        Ok(())
    }
}
