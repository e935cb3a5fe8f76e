//! Repository Layer
//!
//! Abstract contracts for the remote source of truth plus two
//! implementations: HTTP against the organizer API and an in-memory one.

mod http;
pub mod memory;
mod traits;

pub use http::HttpRepository;
pub use memory::InMemoryRepository;
pub use traits::{FolderRepository, PointerRepository};
