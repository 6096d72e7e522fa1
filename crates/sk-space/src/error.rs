// error.rs — Error types for the space namespace subsystem.
//
// Every variant carries the subject of the failed operation (space name,
// attempted path) plus the underlying cause, so a failure can be diagnosed
// from the error alone. `error_code()` gives a stable machine-readable tag.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during space management operations.
#[derive(Debug, Error)]
pub enum SpaceError {
    /// `create_space` was called for a name already present in the index.
    #[error("space '{name}' already exists")]
    AlreadyExists { name: String },

    /// The operation references a space absent from the index.
    #[error("space '{name}' not found")]
    NotFound { name: String },

    /// A nested creation named a base space absent from the index.
    #[error("base space '{base}' not found (parent path '{parent_path}')")]
    BaseSpaceNotFound { base: String, parent_path: String },

    /// The space name is not usable as a single directory component.
    #[error("invalid space name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// A resolved path falls outside its declared boundary (security violation).
    #[error("path '{requested}' escapes boundary {}: resolves to {}", .root.display(), .resolved.display())]
    PathEscape {
        root: PathBuf,
        requested: String,
        resolved: PathBuf,
    },

    /// Creating the space directory failed. Nothing was left behind.
    #[error("failed to create space '{name}' at {}: {source}", .path.display())]
    CreateSpaceFailed {
        name: String,
        path: PathBuf,
        source: std::io::Error,
    },

    /// Writing the metadata record failed; the directory was rolled back.
    #[error("failed to write metadata for space '{name}' at {}: {source}", .path.display())]
    MetadataWriteFailed {
        name: String,
        path: PathBuf,
        source: std::io::Error,
    },

    /// Writing the metadata record failed AND removing the directory failed.
    /// The directory is left on disk without a valid record.
    #[error(
        "failed to write metadata for space '{name}' ({cause}); rollback of {} also failed: {source}",
        .path.display()
    )]
    RollbackFailed {
        name: String,
        path: PathBuf,
        cause: std::io::Error,
        source: std::io::Error,
    },

    /// Removing a space directory tree failed. The index is left untouched.
    #[error("failed to delete space '{name}' at {}: {source}", .path.display())]
    SpaceDeleteFailed {
        name: String,
        path: PathBuf,
        source: std::io::Error,
    },

    /// Deletion was refused because nested spaces exist under the space.
    #[error("space '{name}' contains nested spaces: {}", .subspaces.join(", "))]
    HasSubspaces { name: String, subspaces: Vec<String> },

    /// The persisted index snapshot exists but could not be read.
    #[error("failed to load space index from {}: {source}", .path.display())]
    IndexLoadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The index snapshot could not be persisted after a refresh.
    #[error("failed to save space index to {}: {source}", .path.display())]
    IndexSaveFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The directory listing primitive failed during a scan.
    #[error("directory scan of {} failed: {source}", .path.display())]
    DirectoryScanFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Enumerating a directory for its latest modification time failed.
    #[error("failed to compute modification time of {}: {source}", .path.display())]
    DirMTimeFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Creating a directory inside a space failed.
    #[error("failed to create directory {} in space '{space}': {source}", .path.display())]
    DirectoryCreateFailed {
        space: String,
        path: PathBuf,
        source: std::io::Error,
    },

    /// Removing a directory inside a space failed.
    #[error("failed to remove directory {} in space '{space}': {source}", .path.display())]
    DirectoryRemoveFailed {
        space: String,
        path: PathBuf,
        source: std::io::Error,
    },

    /// `remove_directory` resolved to the space root itself.
    #[error("refusing to remove the root of space '{space}'; use delete instead")]
    RootRemovalRefused { space: String },

    /// A generic I/O failure outside the operations above (e.g. config dirs).
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configuration file could not be parsed.
    #[error("invalid config file {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl SpaceError {
    /// Stable machine-readable code for this error kind.
    pub fn error_code(&self) -> &'static str {
        match self {
            SpaceError::AlreadyExists { .. } => "SPACE_ALREADY_EXISTS",
            SpaceError::NotFound { .. } => "SPACE_NOT_FOUND",
            SpaceError::BaseSpaceNotFound { .. } => "BASE_SPACE_NOT_FOUND",
            SpaceError::InvalidName { .. } => "INVALID_SPACE_NAME",
            SpaceError::PathEscape { .. } => "PATH_ESCAPE",
            SpaceError::CreateSpaceFailed { .. } => "CREATE_SPACE_FAILED",
            SpaceError::MetadataWriteFailed { .. } => "METADATA_WRITE_FAILED",
            SpaceError::RollbackFailed { .. } => "ROLLBACK_FAILED",
            SpaceError::SpaceDeleteFailed { .. } => "SPACE_DELETE_FAILED",
            SpaceError::HasSubspaces { .. } => "SPACE_HAS_SUBSPACES",
            SpaceError::IndexLoadFailed { .. } => "INDEX_LOAD_FAILED",
            SpaceError::IndexSaveFailed { .. } => "INDEX_SAVE_FAILED",
            SpaceError::DirectoryScanFailed { .. } => "DIRECTORY_SCAN_FAILED",
            SpaceError::DirMTimeFailed { .. } => "DIR_MTIME_FAILED",
            SpaceError::DirectoryCreateFailed { .. } => "DIRECTORY_CREATE_FAILED",
            SpaceError::DirectoryRemoveFailed { .. } => "DIRECTORY_REMOVE_FAILED",
            SpaceError::RootRemovalRefused { .. } => "ROOT_REMOVAL_REFUSED",
            SpaceError::Io { .. } => "IO_ERROR",
            SpaceError::Config { .. } => "CONFIG_INVALID",
        }
    }
}
