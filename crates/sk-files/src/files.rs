// files.rs — SpaceFileManager: file-level operations inside spaces.
//
// Every call names a space and a path relative to it. The index is
// refreshed first so files can be addressed in spaces created by another
// manager instance, then the path is resolved through the space boundary
// check. All I/O goes through the manager's SpaceStore.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sk_space::{LocalStore, SpaceManager, SpaceStore, METADATA_FILE_NAME};

use crate::error::FileError;

/// File content as read or written by [`SpaceFileManager`].
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Raw UTF-8 text, written as is.
    Text(String),
    /// A document serialized as YAML or JSON depending on the file extension.
    Structured(serde_json::Value),
}

/// Whether a listed file decoded as ASCII.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Ascii,
    Binary,
}

/// One entry of [`SpaceFileManager::list_files_content`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    /// Path relative to the space root.
    pub file_name: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    /// Text content for ASCII files, `None` for binary ones.
    pub file_content: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Yaml,
    Json,
    Other,
}

impl Format {
    fn of(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Format::Yaml,
            Some("json") => Format::Json,
            _ => Format::Other,
        }
    }
}

/// File operations confined to spaces managed by a [`SpaceManager`].
pub struct SpaceFileManager<S: SpaceStore = LocalStore> {
    spaces: SpaceManager<S>,
}

impl<S: SpaceStore> SpaceFileManager<S> {
    pub fn new(spaces: SpaceManager<S>) -> Self {
        Self { spaces }
    }

    pub fn spaces(&self) -> &SpaceManager<S> {
        &self.spaces
    }

    pub fn spaces_mut(&mut self) -> &mut SpaceManager<S> {
        &mut self.spaces
    }

    pub fn into_inner(self) -> SpaceManager<S> {
        self.spaces
    }

    /// Refresh the index and resolve `relative` inside the named space.
    pub fn resolve_file_path(&mut self, space: &str, relative: &str) -> Result<PathBuf, FileError> {
        self.spaces.refresh()?;
        let path = self.spaces.resolve_in_space(space, relative)?;
        tracing::debug!("resolved '{}' in space '{}' to {}", relative, space, path.display());
        Ok(path)
    }

    pub fn file_exists(&mut self, space: &str, relative: &str) -> Result<bool, FileError> {
        let path = self.resolve_file_path(space, relative)?;
        Ok(self.spaces.store().exists(&path))
    }

    /// Read a file's raw bytes.
    pub fn read_bytes(&mut self, space: &str, relative: &str) -> Result<Vec<u8>, FileError> {
        let path = self.resolve_file_path(space, relative)?;
        self.spaces
            .store()
            .read_bytes(&path)
            .map_err(|source| FileError::ReadFailed {
                space: space.to_string(),
                file: relative.to_string(),
                source,
            })
    }

    /// Read a file as UTF-8 text.
    pub fn read_file(&mut self, space: &str, relative: &str) -> Result<String, FileError> {
        let bytes = self.read_bytes(space, relative)?;
        String::from_utf8(bytes).map_err(|e| FileError::ReadFailed {
            space: space.to_string(),
            file: relative.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })
    }

    /// Read a file, decoding `.yaml`/`.yml`/`.json` into structured content.
    /// Other extensions come back as text.
    pub fn load_file(&mut self, space: &str, relative: &str) -> Result<Content, FileError> {
        let path = self.resolve_file_path(space, relative)?;
        let format = Format::of(&path);
        let text = self.read_file(space, relative)?;

        let decode_failed = |reason: String| FileError::DecodeFailed {
            space: space.to_string(),
            file: relative.to_string(),
            reason,
        };

        match format {
            Format::Yaml => serde_yaml::from_str(&text)
                .map(Content::Structured)
                .map_err(|e| decode_failed(e.to_string())),
            Format::Json => serde_json::from_str(&text)
                .map(Content::Structured)
                .map_err(|e| decode_failed(e.to_string())),
            Format::Other => {
                tracing::warn!("no structured format for '{}', returning text", relative);
                Ok(Content::Text(text))
            }
        }
    }

    /// Write a file, creating missing parent directories inside the space.
    pub fn write_file(
        &mut self,
        space: &str,
        relative: &str,
        content: &Content,
    ) -> Result<(), FileError> {
        let path = self.resolve_file_path(space, relative)?;
        ensure_not_record(space, &path)?;

        let write_failed = |source: std::io::Error| FileError::WriteFailed {
            space: space.to_string(),
            file: relative.to_string(),
            source,
        };

        let bytes = match content {
            Content::Text(text) => text.clone().into_bytes(),
            Content::Structured(value) => match Format::of(&path) {
                Format::Yaml => serde_yaml::to_string(value)
                    .map_err(|e| write_failed(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?
                    .into_bytes(),
                Format::Json => serde_json::to_vec_pretty(value)
                    .map_err(|e| write_failed(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?,
                Format::Other => {
                    return Err(FileError::UnsupportedSerialization {
                        space: space.to_string(),
                        file: relative.to_string(),
                    })
                }
            },
        };

        if let Some(parent) = path.parent() {
            self.spaces
                .store()
                .create_dir_all(parent)
                .map_err(write_failed)?;
        }
        self.spaces
            .store()
            .write_bytes(&path, &bytes)
            .map_err(write_failed)?;

        tracing::info!("file '{}' written in space '{}'", relative, space);
        Ok(())
    }

    pub fn delete_file(&mut self, space: &str, relative: &str) -> Result<(), FileError> {
        let path = self.resolve_file_path(space, relative)?;
        ensure_not_record(space, &path)?;

        self.spaces
            .store()
            .remove_file(&path)
            .map_err(|source| FileError::DeleteFailed {
                space: space.to_string(),
                file: relative.to_string(),
                source,
            })?;

        tracing::info!("file '{}' deleted from space '{}'", relative, space);
        Ok(())
    }

    /// Relative paths of the regular files in a space, sorted.
    /// Non-recursive listing returns only files directly in the space root.
    pub fn list_files(&mut self, space: &str, recursive: bool) -> Result<Vec<String>, FileError> {
        self.spaces.refresh()?;
        let root = self.spaces.space_path(space)?;

        let entries = self
            .spaces
            .store()
            .list_recursive(&root)
            .map_err(|source| FileError::ListFailed {
                space: space.to_string(),
                source,
            })?;

        let files = entries
            .into_iter()
            .filter(|e| e.is_file())
            .filter(|e| recursive || e.relative_path.components().count() == 1)
            .map(|e| e.relative_path.to_string_lossy().into_owned())
            .collect();
        Ok(files)
    }

    /// Every regular file in the space with its content if it is ASCII.
    ///
    /// Files that can't be read are logged and left out.
    pub fn list_files_content(&mut self, space: &str) -> Result<Vec<FileContent>, FileError> {
        let files = self.list_files(space, true)?;
        let root = self.spaces.space_path(space)?;

        let mut results = Vec::with_capacity(files.len());
        for file_name in files {
            let full_path = root.join(&file_name);
            let bytes = match self.spaces.store().read_bytes(&full_path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!("failed to read '{}' in space '{}': {}", file_name, space, e);
                    continue;
                }
            };

            let entry = if bytes.is_ascii() {
                FileContent {
                    file_name,
                    kind: FileKind::Ascii,
                    file_content: String::from_utf8(bytes).ok(),
                }
            } else {
                FileContent {
                    file_name,
                    kind: FileKind::Binary,
                    file_content: None,
                }
            };
            results.push(entry);
        }
        Ok(results)
    }

    /// Modification time of a single file.
    pub fn file_last_modified(
        &mut self,
        space: &str,
        relative: &str,
    ) -> Result<DateTime<Utc>, FileError> {
        if !self.file_exists(space, relative)? {
            return Err(FileError::FileNotFound {
                space: space.to_string(),
                file: relative.to_string(),
            });
        }
        let path = self.spaces.resolve_in_space(space, relative)?;

        let modified = self
            .spaces
            .store()
            .modified(&path)
            .map_err(|source| FileError::MTimeFailed {
                space: space.to_string(),
                file: relative.to_string(),
                source,
            })?;
        Ok(DateTime::<Utc>::from(modified))
    }
}

/// Metadata records define spaces: writing one would create or corrupt a
/// space, deleting one would make a space disappear.
fn ensure_not_record(space: &str, path: &Path) -> Result<(), FileError> {
    if path.file_name().is_some_and(|n| n == METADATA_FILE_NAME) {
        return Err(FileError::ReservedPath {
            space: space.to_string(),
            path: path.to_path_buf(),
        });
    }
    Ok(())
}
