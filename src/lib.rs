//! Project Organizer
//!
//! Drag-and-drop core of a remote-backed project organizer tree.
//!
//! Layers:
//! - domain: items, identifiers and the shared error type
//! - tree / selection / dnd: pure decisions on the loaded hierarchy
//! - repository: the remote source of truth (HTTP or in-memory)
//! - reconcile / organizer: executing gestures against the remote
//!
//! A typical host loads the config, installs logging, then drives an
//! [`Organizer`] from its tree widget callbacks:
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use std::path::Path;
//! use std::sync::Arc;
//! use project_organizer::{HttpRepository, NodeId, Organizer, OrganizerConfig};
//!
//! let config = OrganizerConfig::load_or_default(Path::new("organizer_config.json"))
//!     .with_env_overrides();
//! project_organizer::logging::init_logging(&config)?;
//!
//! let repo = Arc::new(HttpRepository::new(&config)?);
//! let (organizer, mut notifications) = Organizer::new(repo, &config);
//! organizer.load_root(&NodeId::from("dashboard")).await?;
//!
//! while let Some(n) = notifications.recv().await {
//!     eprintln!("{} {}", n.title, n.message);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dnd;
pub mod domain;
pub mod logging;
pub mod notify;
pub mod organizer;
pub mod reconcile;
pub mod repository;
pub mod selection;
pub mod tree;

pub use config::OrganizerConfig;
pub use dnd::{DragMode, DragSession, PolicyViolation, TransferMode};
pub use domain::{
    DomainError, DomainResult, Item, ItemId, ItemKind, ItemRecord, NodeId, Permissions,
};
pub use organizer::{Organizer, OrganizerError, OrganizerResult};
pub use reconcile::{DropOutcome, ReconcileError, ReconcileStage};
pub use repository::{FolderRepository, HttpRepository, InMemoryRepository, PointerRepository};
pub use tree::HierarchyTree;
