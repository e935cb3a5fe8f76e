//! Organizer Facade
//!
//! Owns the loaded tree and the selection, and wires the drag hooks, the
//! reconciliation executor and folder editing to one repository.
//!
//! The tree lock is never held across a remote call. Every operation
//! snapshots what it needs, talks to the backend, then applies the result
//! (a refresh) only after the backend accepted the change.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::OrganizerConfig;
use crate::dnd::{resolve, which_is_container, DragMode, DragSession, PolicyViolation};
use crate::domain::{DomainError, ItemId, NodeId};
use crate::logging::report_invariant;
use crate::notify::{NotificationReceiver, Notifier};
use crate::reconcile::{DropOutcome, DropPlan, FolderLocks, FolderRef, ReconcileError, Reconciler};
use crate::repository::{FolderRepository, PointerRepository};
use crate::selection::{filter_to_anchor_parent, Selection};
use crate::tree::HierarchyTree;

#[cfg(test)]
mod tests;

const ALREADY_IN_FOLDER: &str = "This project is already in the folder";

#[derive(Debug, thiserror::Error)]
pub enum OrganizerError {
    #[error(transparent)]
    Policy(#[from] PolicyViolation),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("Invariant violation: {0}")]
    Invariant(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("{}", ALREADY_IN_FOLDER)]
    AlreadyInFolder,
}

pub type OrganizerResult<T> = Result<T, OrganizerError>;

#[derive(Debug, Default)]
struct OrganizerState {
    tree: HierarchyTree,
    selection: Selection,
}

pub struct Organizer<R> {
    repo: Arc<R>,
    reconciler: Reconciler<R>,
    state: Mutex<OrganizerState>,
    notifier: Notifier,
    max_expand_depth: usize,
}

impl<R> Organizer<R>
where
    R: PointerRepository + FolderRepository,
{
    /// Build an organizer and the receiver its notifications go to
    pub fn new(repo: Arc<R>, config: &OrganizerConfig) -> (Self, NotificationReceiver) {
        let (notifier, receiver) = Notifier::channel();
        let organizer = Self {
            reconciler: Reconciler::new(repo.clone()),
            repo,
            state: Mutex::new(OrganizerState::default()),
            notifier,
            max_expand_depth: config.max_expand_depth.max(1),
        };
        (organizer, receiver)
    }

    pub fn locks(&self) -> &FolderLocks {
        self.reconciler.locks()
    }

    /// Run `f` against the current tree
    pub async fn with_tree<T>(&self, f: impl FnOnce(&HierarchyTree) -> T) -> T {
        let state = self.state.lock().await;
        f(&state.tree)
    }

    /// Visible rows as (id, depth) pairs
    pub async fn visible_rows(&self) -> Vec<(ItemId, usize)> {
        self.with_tree(|tree| tree.flatten()).await
    }

    pub async fn selection(&self) -> Selection {
        self.state.lock().await.selection.clone()
    }

    pub async fn select(&self, id: ItemId) {
        self.state.lock().await.selection.select(id);
    }

    pub async fn toggle_select(&self, id: ItemId) {
        self.state.lock().await.selection.toggle(id);
    }

    pub async fn clear_selection(&self) {
        self.state.lock().await.selection.clear();
    }

    /// Log a failed remote call and tell the user about it
    fn remote_failure(&self, context: &str, error: DomainError) -> OrganizerError {
        log::warn!("{}: {}", context, error);
        self.notifier.error("Error:", format!("{}: {}", context, error));
        error.into()
    }

    async fn node_of(&self, item: ItemId) -> OrganizerResult<NodeId> {
        let state = self.state.lock().await;
        state
            .tree
            .get(item)
            .map(|i| i.node_id.clone())
            .ok_or_else(|| DomainError::NotFound(format!("Item {} not found", item)).into())
    }

    /// Remote id of a folder that may be written to
    async fn writable_folder(&self, folder: ItemId) -> OrganizerResult<NodeId> {
        let state = self.state.lock().await;
        let item = state
            .tree
            .get(folder)
            .ok_or_else(|| DomainError::NotFound(format!("Item {} not found", folder)))?;
        if item.kind.is_smart_folder() {
            return Err(PolicyViolation::SmartFolder.into());
        }
        if !item.kind.accepts_drops() {
            return Err(PolicyViolation::NotAFolder.into());
        }
        Ok(item.node_id.clone())
    }

    async fn mark_expanded(&self, item: ItemId) {
        let mut state = self.state.lock().await;
        if let Some(it) = state.tree.get_mut(item) {
            it.expand = true;
        }
    }

    // ========================
    // Loading
    // ========================

    /// Load the top-level listing of `root` and open whatever it flags
    pub async fn load_root(&self, root: &NodeId) -> OrganizerResult<Vec<ItemId>> {
        let records = self
            .repo
            .fetch_children(root)
            .await
            .map_err(|e| self.remote_failure("Could not load projects", e))?;

        let (roots, expanded) = {
            let mut state = self.state.lock().await;
            let roots = state.tree.set_roots(&records);
            state.selection.clear();
            let expanded: Vec<ItemId> = roots
                .iter()
                .copied()
                .filter(|id| state.tree.get(*id).is_some_and(|item| item.expand))
                .collect();
            (roots, expanded)
        };
        log::info!("Loaded {} top-level item(s) from {}", roots.len(), root);

        for id in expanded {
            if let Err(e) = self.refresh_folder(id).await {
                log::warn!("Auto-expanding {} failed: {}", id, e);
            }
        }
        Ok(roots)
    }

    /// Reload the children of `item`, then every loaded child flagged expanded.
    ///
    /// Children are replaced wholesale with fresh ids. A failure on `item`
    /// itself is returned; failures further down are only notified.
    pub async fn refresh_folder(&self, item: ItemId) -> OrganizerResult<()> {
        let node = self.node_of(item).await?;
        let mut queue = VecDeque::from([(item, node, 0usize)]);

        while let Some((id, node, depth)) = queue.pop_front() {
            let records = match self.repo.fetch_children(&node).await {
                Ok(records) => records,
                Err(e) => {
                    let error = self.remote_failure(&format!("Could not load {}", node), e);
                    if id == item {
                        return Err(error);
                    }
                    continue;
                }
            };

            let mut state = self.state.lock().await;
            let children = match state.tree.replace_children(id, &records) {
                Ok(children) => children,
                Err(e) if id == item => return Err(e.into()),
                Err(e) => {
                    log::debug!("Skipping refresh of {}: {}", node, e);
                    continue;
                }
            };

            for child in children {
                let Some(loaded) = state.tree.get(child) else {
                    continue;
                };
                if !loaded.expand {
                    continue;
                }
                if depth + 1 >= self.max_expand_depth {
                    log::warn!("Auto-expansion stopped at depth {} under {}", depth + 1, node);
                    break;
                }
                queue.push_back((child, loaded.node_id.clone(), depth + 1));
            }
        }
        Ok(())
    }

    /// Open or close `item`, persisting the state remotely. Returns the new state.
    pub async fn toggle_folder(&self, item: ItemId) -> OrganizerResult<bool> {
        let (node, open) = {
            let state = self.state.lock().await;
            let it = state
                .tree
                .get(item)
                .ok_or_else(|| DomainError::NotFound(format!("Item {} not found", item)))?;
            if !it.permissions.view {
                self.notifier.warning(PolicyViolation::PrivateFolder.to_string());
                return Err(PolicyViolation::PrivateFolder.into());
            }
            (it.node_id.clone(), !it.expand)
        };

        self.repo
            .set_expanded(&node, open)
            .await
            .map_err(|e| self.remote_failure("Could not save folder state", e))?;

        {
            let mut state = self.state.lock().await;
            if let Some(it) = state.tree.get_mut(item) {
                it.expand = open;
            }
            if !open {
                state.tree.clear_children(item);
            }
        }

        if open {
            self.refresh_folder(item).await?;
        }
        Ok(open)
    }

    // ========================
    // Drag and Drop
    // ========================

    /// Start a drag on `anchor`.
    ///
    /// With a multi-selection containing the anchor, the anchor's selected
    /// siblings are dragged with it; otherwise the anchor alone. Returns None
    /// when the anchor cannot be dragged.
    pub async fn drag_start(&self, anchor: ItemId) -> Option<DragSession> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let draggable = state.tree.get(anchor)?.is_draggable();
        if !draggable {
            log::debug!("{} is not draggable", anchor);
            return None;
        }

        let items = if state.selection.len() < 2 || !state.selection.items.contains(&anchor) {
            state.selection.select(anchor);
            vec![anchor]
        } else {
            state.selection.anchor = Some(anchor);
            let mut items = filter_to_anchor_parent(&state.tree, &mut state.selection);
            items.retain(|id| *id != anchor);
            items.insert(0, anchor);
            items
        };
        Some(DragSession::new(items))
    }

    /// Drag-over tick for `target`
    pub async fn drag_over(&self, session: &mut DragSession, target: ItemId) -> DragMode {
        let state = self.state.lock().await;
        session.update(&state.tree, target)
    }

    /// Drop the session's items on `target`.
    ///
    /// Refused drops change nothing. A failed remote step raises a
    /// notification and leaves the tree as it was. The affected folder is
    /// refreshed only after every step succeeded.
    pub async fn drop_on(
        &self,
        session: DragSession,
        target: ItemId,
    ) -> OrganizerResult<DropOutcome> {
        let plan = {
            let state = self.state.lock().await;
            plan_drop(&state.tree, &session, target)?
        };

        let outcome = match self.reconciler.execute(&plan).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("Drop into {} failed: {}", plan.target.node_id, e);
                self.notifier.error("Error:", e.to_string());
                return Err(e.into());
            }
        };

        if let Err(e) = self.refresh_folder(outcome.refresh).await {
            log::warn!("Refresh after drop failed: {}", e);
        }
        Ok(outcome)
    }

    // ========================
    // Pointers
    // ========================

    /// Link an existing project into `folder`
    pub async fn add_pointer(&self, folder: ItemId, pointer: &NodeId) -> OrganizerResult<()> {
        let node = self.writable_folder(folder).await?;
        {
            let _tokens = self.locks().acquire(&[&node]).await;

            let members = self
                .repo
                .fetch_child_pointer_ids(&node)
                .await
                .map_err(|e| self.remote_failure("Could not check folder contents", e))?;
            if members.contains(pointer) {
                self.notifier.warning(ALREADY_IN_FOLDER);
                return Err(OrganizerError::AlreadyInFolder);
            }

            self.repo
                .set_expanded(&node, true)
                .await
                .map_err(|e| self.remote_failure("Could not save folder state", e))?;
            self.repo
                .add_pointer(&node, pointer)
                .await
                .map_err(|e| self.remote_failure("Could not add project to folder", e))?;
        }

        self.mark_expanded(folder).await;
        self.refresh_folder(folder).await
    }

    /// Unlink `item` from its folder
    pub async fn remove_pointer(&self, item: ItemId) -> OrganizerResult<()> {
        let (folder, folder_node, nodes) = {
            let state = self.state.lock().await;
            removal_target(&state.tree, &[item])?
        };
        let [node] = nodes.as_slice() else {
            return Err(OrganizerError::Invariant(
                "single removal resolved to several items".to_string(),
            ));
        };

        {
            let _tokens = self.locks().acquire(&[&folder_node]).await;
            self.repo
                .remove_pointer(&folder_node, node)
                .await
                .map_err(|e| self.remote_failure("Could not remove project from folder", e))?;
        }
        self.refresh_folder(folder).await
    }

    /// Unlink every selected sibling of the anchor from their folder in one call
    pub async fn remove_pointers(&self) -> OrganizerResult<()> {
        let (folder, folder_node, nodes) = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            let items = filter_to_anchor_parent(&state.tree, &mut state.selection);
            removal_target(&state.tree, &items)?
        };

        {
            let _tokens = self.locks().acquire(&[&folder_node]).await;
            self.repo
                .delete_pointers(&nodes, &folder_node)
                .await
                .map_err(|e| self.remote_failure("Could not remove projects from folder", e))?;
        }
        log::info!("Removed {} item(s) from {}", nodes.len(), folder_node);

        self.clear_selection().await;
        self.refresh_folder(folder).await
    }

    // ========================
    // Folders
    // ========================

    pub async fn create_folder(&self, parent: ItemId, title: &str) -> OrganizerResult<()> {
        let title = title.trim();
        if title.is_empty() {
            return Err(OrganizerError::InvalidInput("Folder title must not be empty".to_string()));
        }
        let node = self.writable_folder(parent).await?;

        self.repo
            .set_expanded(&node, true)
            .await
            .map_err(|e| self.remote_failure("Could not save folder state", e))?;
        self.repo
            .create_folder(&node, title)
            .await
            .map_err(|e| self.remote_failure("Could not create folder", e))?;

        self.mark_expanded(parent).await;
        self.refresh_folder(parent).await
    }

    pub async fn rename(&self, item: ItemId, title: &str) -> OrganizerResult<()> {
        let title = title.trim();
        if title.is_empty() {
            return Err(OrganizerError::InvalidInput("Title must not be empty".to_string()));
        }
        let (node, parent) = {
            let state = self.state.lock().await;
            let it = state
                .tree
                .get(item)
                .ok_or_else(|| DomainError::NotFound(format!("Item {} not found", item)))?;
            if it.name == title {
                return Err(OrganizerError::InvalidInput("Title is unchanged".to_string()));
            }
            (it.node_id.clone(), it.parent_id)
        };

        self.repo
            .rename(&node, title)
            .await
            .map_err(|e| self.remote_failure("Could not rename", e))?;

        match parent {
            Some(parent) => self.refresh_folder(parent).await,
            None => {
                // Roots are not part of any reloadable listing
                if let Some(it) = self.state.lock().await.tree.get_mut(item) {
                    it.name = title.to_string();
                }
                self.refresh_folder(item).await
            }
        }
    }

    /// Delete a folder. Projects linked into it are kept by the backend.
    pub async fn delete_folder(&self, item: ItemId) -> OrganizerResult<()> {
        let (node, parent) = {
            let state = self.state.lock().await;
            let it = state
                .tree
                .get(item)
                .ok_or_else(|| DomainError::NotFound(format!("Item {} not found", item)))?;
            if it.kind.is_smart_folder() {
                return Err(PolicyViolation::SmartFolder.into());
            }
            if !it.kind.is_folder() {
                return Err(PolicyViolation::NotAFolder.into());
            }
            (it.node_id.clone(), it.parent_id)
        };

        self.repo
            .delete_folder(&node)
            .await
            .map_err(|e| self.remote_failure("Could not delete folder", e))?;
        log::info!("Deleted folder {}", node);

        match parent {
            Some(parent) => self.refresh_folder(parent).await,
            None => {
                self.state.lock().await.tree.remove(item);
                Ok(())
            }
        }
    }
}

/// Capture the remote side of a drop while the tree is locked
fn plan_drop(
    tree: &HierarchyTree,
    session: &DragSession,
    target: ItemId,
) -> OrganizerResult<DropPlan> {
    let mode = resolve(tree, session.items(), target, session.alt_held()).map_err(|violation| {
        log::debug!("Drop on {} refused: {}", target, violation);
        violation
    })?;

    let representative = *session.items().first().ok_or(PolicyViolation::EmptySelection)?;
    let target_item = tree.get(target).ok_or(PolicyViolation::UnknownItem)?;
    let source = tree.parent(representative).map(|parent| FolderRef {
        item: parent.id,
        node_id: parent.node_id.clone(),
    });

    if let Some(source) = &source {
        if source.node_id == target_item.node_id {
            let message = format!(
                "drop of {} resolved to its own folder {} after acceptance",
                representative, source.node_id
            );
            report_invariant(&message);
            return Err(OrganizerError::Invariant(message));
        }
    }

    let items = session
        .items()
        .iter()
        .filter_map(|id| tree.get(*id))
        .map(|item| item.node_id.clone())
        .collect();
    let outer = source
        .as_ref()
        .and_then(|source| which_is_container(tree, source.item, target));

    Ok(DropPlan {
        mode,
        items,
        source,
        target: FolderRef {
            item: target,
            node_id: target_item.node_id.clone(),
        },
        outer,
    })
}

/// Common folder and remote ids of `items` when all of them may be unlinked
fn removal_target(
    tree: &HierarchyTree,
    items: &[ItemId],
) -> OrganizerResult<(ItemId, NodeId, Vec<NodeId>)> {
    let first = *items.first().ok_or(PolicyViolation::EmptySelection)?;
    let folder = tree.parent(first).ok_or(PolicyViolation::NotRemovable)?;

    let mut nodes = Vec::with_capacity(items.len());
    for id in items {
        let item = tree.get(*id).ok_or(PolicyViolation::UnknownItem)?;
        let removable = !item.kind.is_folder()
            && !item.kind.is_smart_folder()
            && item.parent_id == Some(folder.id)
            && folder.kind.accepts_drops()
            && item.can_move();
        if !removable {
            log::debug!("{} cannot be removed from {}", id, folder.node_id);
            return Err(PolicyViolation::NotRemovable.into());
        }
        nodes.push(item.node_id.clone());
    }
    Ok((folder.id, folder.node_id.clone(), nodes))
}
