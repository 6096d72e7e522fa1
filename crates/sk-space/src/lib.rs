//! # sk-space
//!
//! Logical namespace ("spaces") layered on a plain directory tree.
//!
//! A space is a directory carrying a `metadata.yaml` record. Spaces can be
//! nested, are discovered by scanning the tree, and every operation on a
//! space is confined to that space's directory.
//!
//! ## Key components
//!
//! - [`SpaceManager`] — create (with rollback), delete, list, subordinate
//!   directory operations, recency queries. Owns the index.
//! - [`SpaceIndex`] — in-memory cache of the last scan, persisted as a JSON
//!   snapshot. Rebuilt wholesale by [`SpaceManager::refresh`].
//! - [`resolve`] — boundary-checked path resolution used by every
//!   filesystem-touching operation.
//! - [`SpaceStore`] — trait over the filesystem primitives; [`LocalStore`]
//!   is the `std::fs` implementation.
//! - [`SpaceConfig`] — base directory and derived layout.

pub mod config;
pub mod error;
pub mod index;
pub mod manager;
pub mod recency;
pub mod resolver;
pub mod space;
pub mod store;

pub use config::SpaceConfig;
pub use error::SpaceError;
pub use index::{scan, SpaceIndex};
pub use manager::{validate_name, DeletePolicy, SpaceManager};
pub use resolver::resolve;
pub use space::{Space, METADATA_FILE_NAME};
pub use store::{DirEntry, EntryKind, LocalStore, SpaceStore};
