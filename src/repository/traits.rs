//! Repository Layer - Core Traits
//!
//! Every call is a single request with idempotent intent. Failures are
//! returned once; nothing here retries.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::domain::{DomainResult, ItemRecord, NodeId};

/// Pointer membership of folders, used by drop reconciliation
#[async_trait]
pub trait PointerRepository: Send + Sync {
    /// Remote ids currently linked into `folder`
    async fn fetch_child_pointer_ids(&self, folder: &NodeId) -> DomainResult<HashSet<NodeId>>;

    /// Link `ids` into `folder` in one request
    async fn add_pointers(&self, folder: &NodeId, ids: &[NodeId]) -> DomainResult<()>;

    /// Re-point `ids` from `from` to `to` in one request
    async fn move_pointers(&self, ids: &[NodeId], from: &NodeId, to: &NodeId) -> DomainResult<()>;

    /// Unlink `ids` from `folder` in one request
    async fn delete_pointers(&self, ids: &[NodeId], folder: &NodeId) -> DomainResult<()>;
}

/// Folder listing and editing
#[async_trait]
pub trait FolderRepository: Send + Sync {
    /// Children listing used for lazy loading
    async fn fetch_children(&self, node: &NodeId) -> DomainResult<Vec<ItemRecord>>;

    /// Persist whether `node` auto-expands on the next load
    async fn set_expanded(&self, node: &NodeId, expanded: bool) -> DomainResult<()>;

    /// Link a single node into `folder`
    async fn add_pointer(&self, folder: &NodeId, pointer: &NodeId) -> DomainResult<()>;

    /// Unlink a single node from `folder`
    async fn remove_pointer(&self, folder: &NodeId, pointer: &NodeId) -> DomainResult<()>;

    async fn create_folder(&self, parent: &NodeId, title: &str) -> DomainResult<()>;

    /// Delete a folder and its sub-folders. Linked projects survive.
    async fn delete_folder(&self, node: &NodeId) -> DomainResult<()>;

    async fn rename(&self, node: &NodeId, title: &str) -> DomainResult<()>;
}
