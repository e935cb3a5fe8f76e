//! Reconciliation Executor
//!
//! Carries out an accepted drop against the remote collaborator:
//! 1. fetch the target folder's current pointer membership
//! 2. split the dragged ids into already-present and to-transfer
//! 3. for moves, unlink the already-present ids from the source
//! 4. one batched add (copy) or move request for the rest
//!
//! Each step runs only after the previous one succeeded. Drops touching the
//! same folder are serialized through [`FolderLocks`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::dnd::TransferMode;
use crate::domain::{DomainError, ItemId, NodeId};
use crate::repository::PointerRepository;

// ========================
// Plan and Outcome
// ========================

/// A folder as both the tree and the backend know it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRef {
    pub item: ItemId,
    pub node_id: NodeId,
}

/// Everything the executor needs, captured from the tree at drop time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropPlan {
    pub mode: TransferMode,
    /// Remote ids of the dragged items, representative first
    pub items: Vec<NodeId>,
    /// Common parent of the dragged items. None for root items.
    pub source: Option<FolderRef>,
    pub target: FolderRef,
    /// Whichever of source and target encloses the other
    pub outer: Option<ItemId>,
}

impl DropPlan {
    /// Folder to reload once the drop is done.
    ///
    /// A move touches both ends, so the enclosing one is reloaded when there
    /// is one, the source otherwise. A copy only changes the target. When
    /// the target already held every item, only the source changed.
    pub fn refresh_target(&self, transferred_any: bool) -> ItemId {
        match (self.mode, &self.source) {
            (_, Some(source)) if !transferred_any => source.item,
            (TransferMode::Move, Some(source)) => self.outer.unwrap_or(source.item),
            _ => self.target.item,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropOutcome {
    pub mode: TransferMode,
    /// Ids sent in the batched add or move
    pub transferred: Vec<NodeId>,
    /// Ids the target already held
    pub already_present: Vec<NodeId>,
    pub refresh: ItemId,
}

// ========================
// Errors
// ========================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileStage {
    FetchMembership,
    RemoveDuplicates,
    Transfer,
}

impl fmt::Display for ReconcileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ReconcileStage::FetchMembership => "fetch target folder contents",
            ReconcileStage::RemoveDuplicates => "remove duplicates from source folder",
            ReconcileStage::Transfer => "transfer items",
        };
        f.write_str(text)
    }
}

/// A failed drop and the step it stopped at. Later steps never ran.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Failed to {stage}: {source}")]
pub struct ReconcileError {
    pub stage: ReconcileStage,
    pub source: DomainError,
}

impl ReconcileError {
    fn at(stage: ReconcileStage) -> impl FnOnce(DomainError) -> Self {
        move |source| Self { stage, source }
    }
}

// ========================
// Folder Locks
// ========================

type LockMap = Arc<Mutex<HashMap<NodeId, Arc<AsyncMutex<()>>>>>;

/// One async lock per folder node id. Entries live only while a gesture
/// holds or waits for them.
#[derive(Debug, Clone, Default)]
pub struct FolderLocks {
    locks: LockMap,
}

/// Held folder locks, released on drop
#[derive(Debug)]
pub struct FolderTokens {
    guards: Vec<(NodeId, OwnedMutexGuard<()>)>,
    locks: LockMap,
}

impl Drop for FolderTokens {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        for (folder, guard) in self.guards.drain(..) {
            drop(guard);
            // The map's own handle is the last one: nobody holds or waits
            if locks.get(&folder).is_some_and(|lock| Arc::strong_count(lock) == 1) {
                locks.remove(&folder);
            }
        }
    }
}

impl FolderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, folder: &NodeId) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(folder.clone()).or_default().clone()
    }

    /// Wait for every folder in `folders`. Locks are taken in sorted order
    /// so two gestures sharing folders cannot deadlock.
    pub async fn acquire(&self, folders: &[&NodeId]) -> FolderTokens {
        let mut keys: Vec<&NodeId> = folders.to_vec();
        keys.sort();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            let guard = self.lock_for(key).lock_owned().await;
            guards.push((key.clone(), guard));
        }
        FolderTokens {
            guards,
            locks: self.locks.clone(),
        }
    }

    pub fn is_held(&self, folder: &NodeId) -> bool {
        let locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.get(folder).is_some_and(|lock| lock.try_lock().is_err())
    }
}

// ========================
// Executor
// ========================

pub struct Reconciler<R> {
    repo: Arc<R>,
    locks: FolderLocks,
}

impl<R: PointerRepository> Reconciler<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            repo,
            locks: FolderLocks::new(),
        }
    }

    pub fn locks(&self) -> &FolderLocks {
        &self.locks
    }

    pub async fn execute(&self, plan: &DropPlan) -> Result<DropOutcome, ReconcileError> {
        let source = match (plan.mode, &plan.source) {
            (TransferMode::Move, None) => {
                return Err(ReconcileError {
                    stage: ReconcileStage::Transfer,
                    source: DomainError::InvalidInput("Move without a source folder".to_string()),
                })
            }
            (TransferMode::Move, Some(source)) => Some(source),
            (TransferMode::Copy, _) => None,
        };

        let mut folders = vec![&plan.target.node_id];
        if let Some(source) = source {
            folders.push(&source.node_id);
        }
        let _tokens = self.locks.acquire(&folders).await;

        let membership = self
            .repo
            .fetch_child_pointer_ids(&plan.target.node_id)
            .await
            .map_err(ReconcileError::at(ReconcileStage::FetchMembership))?;

        let (already_present, to_transfer): (Vec<NodeId>, Vec<NodeId>) =
            plan.items.iter().cloned().partition(|id| membership.contains(id));

        if let Some(source) = source {
            if !already_present.is_empty() {
                log::debug!(
                    "Removing {} item(s) from {} already present in {}",
                    already_present.len(),
                    source.node_id,
                    plan.target.node_id
                );
                self.repo
                    .delete_pointers(&already_present, &source.node_id)
                    .await
                    .map_err(ReconcileError::at(ReconcileStage::RemoveDuplicates))?;
            }
        }

        if !to_transfer.is_empty() {
            let written = match source {
                Some(source) => {
                    self.repo
                        .move_pointers(&to_transfer, &source.node_id, &plan.target.node_id)
                        .await
                }
                None => self.repo.add_pointers(&plan.target.node_id, &to_transfer).await,
            };
            written.map_err(ReconcileError::at(ReconcileStage::Transfer))?;
        }

        log::info!(
            "{:?} of {} item(s) into {} done ({} already present)",
            plan.mode,
            plan.items.len(),
            plan.target.node_id,
            already_present.len()
        );

        Ok(DropOutcome {
            mode: plan.mode,
            refresh: plan.refresh_target(!to_transfer.is_empty()),
            transferred: to_transfer,
            already_present,
        })
    }
}
