//! Domain Layer
//!
//! Core entities of the organizer tree and the errors shared by every layer.
//! Nothing in here talks to the network.

mod entity;
mod ids;
mod item;

pub use entity::{DomainError, DomainResult, Entity};
pub use ids::{ItemId, NodeId};
pub use item::{Item, ItemKind, ItemRecord, Permissions};
