//! # sk-files
//!
//! File-level operations inside spaces: existence checks, text and
//! structured (YAML / JSON) reads and writes, deletion, listings and
//! per-file modification times.
//!
//! Every path is resolved through the owning space's boundary check, so
//! nothing here can touch a file outside the named space.

pub mod error;
pub mod files;

pub use error::FileError;
pub use files::{Content, FileContent, FileKind, SpaceFileManager};
