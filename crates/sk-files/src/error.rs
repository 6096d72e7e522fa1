// error.rs — Error types for file operations inside spaces.

use std::path::PathBuf;
use thiserror::Error;

use sk_space::SpaceError;

/// Errors that can occur during file operations inside a space.
#[derive(Debug, Error)]
pub enum FileError {
    /// Space lookup or boundary resolution failed.
    #[error(transparent)]
    Space(#[from] SpaceError),

    /// Reading the file failed.
    #[error("failed to read '{file}' in space '{space}': {source}")]
    ReadFailed {
        space: String,
        file: String,
        source: std::io::Error,
    },

    /// Writing the file failed.
    #[error("failed to write '{file}' in space '{space}': {source}")]
    WriteFailed {
        space: String,
        file: String,
        source: std::io::Error,
    },

    /// Deleting the file failed.
    #[error("failed to delete '{file}' in space '{space}': {source}")]
    DeleteFailed {
        space: String,
        file: String,
        source: std::io::Error,
    },

    /// Listing the space's files failed.
    #[error("failed to list files in space '{space}': {source}")]
    ListFailed {
        space: String,
        source: std::io::Error,
    },

    /// The file does not exist.
    #[error("file '{file}' does not exist in space '{space}'")]
    FileNotFound { space: String, file: String },

    /// Reading the file's modification time failed.
    #[error("failed to read modification time of '{file}' in space '{space}': {source}")]
    MTimeFailed {
        space: String,
        file: String,
        source: std::io::Error,
    },

    /// The file content could not be decoded as YAML / JSON.
    #[error("failed to decode '{file}' in space '{space}': {reason}")]
    DecodeFailed {
        space: String,
        file: String,
        reason: String,
    },

    /// Structured content can only be written to .yaml, .yml or .json files.
    #[error("unsupported file extension for structured content: '{file}' in space '{space}'")]
    UnsupportedSerialization { space: String, file: String },

    /// The path names a space metadata record.
    #[error("'{}' in space '{space}' is a space metadata record and cannot be modified", .path.display())]
    ReservedPath { space: String, path: PathBuf },
}

impl FileError {
    /// Stable machine-readable code for this error kind.
    pub fn error_code(&self) -> &'static str {
        match self {
            FileError::Space(e) => e.error_code(),
            FileError::ReadFailed { .. } => "FILE_READ_FAILED",
            FileError::WriteFailed { .. } => "FILE_WRITE_FAILED",
            FileError::DeleteFailed { .. } => "FILE_DELETE_FAILED",
            FileError::ListFailed { .. } => "LIST_FILES_FAILED",
            FileError::FileNotFound { .. } => "FILE_NOT_FOUND",
            FileError::MTimeFailed { .. } => "FILE_MTIME_FAILED",
            FileError::DecodeFailed { .. } => "FILE_DECODE_FAILED",
            FileError::UnsupportedSerialization { .. } => "UNSUPPORTED_SERIALIZATION",
            FileError::ReservedPath { .. } => "RESERVED_PATH",
        }
    }
}
