// manager.rs — SpaceManager: the externally consumed namespace API.
//
// The manager owns the SpaceIndex and the SpaceStore. Every structural
// change (create, delete, removing a directory that held spaces) is
// followed by a full rescan instead of an incremental index update, so the
// index always equals a real scan of the tree.
//
// The index is the authority for existence checks. A stale index can
// disagree with the filesystem until the next refresh; failed mutations
// never auto-correct it.
//
// Concurrent creation of the same space by two processes is not
// coordinated. The leaf directory is created with a non-recursive
// create_dir, so only one of them can own it; the other gets
// CreateSpaceFailed.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::config::SpaceConfig;
use crate::error::SpaceError;
use crate::index::SpaceIndex;
use crate::recency;
use crate::resolver::{self, is_within};
use crate::space::Space;
use crate::store::{LocalStore, SpaceStore};

/// Space names must be a single safe path component.
pub const NAME_PATTERN: &str = r"^[A-Za-z0-9][A-Za-z0-9._-]*$";

const MAX_NAME_LEN: usize = 255;

/// What `delete_space` does when other spaces are nested inside the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletePolicy {
    /// Remove the whole subtree, nested spaces included.
    #[default]
    Cascade,
    /// Fail with `HasSubspaces` if any space lives below the target.
    RefuseIfNested,
}

/// Manages spaces below a configured root directory.
///
/// Generic over the store so tests can substitute one that fails on
/// demand; production code uses [`LocalStore`].
pub struct SpaceManager<S: SpaceStore = LocalStore> {
    config: SpaceConfig,
    spaces_root: PathBuf,
    store: S,
    index: SpaceIndex,
}

impl SpaceManager<LocalStore> {
    /// Open a manager on the local filesystem.
    pub fn open(config: SpaceConfig) -> Result<Self, SpaceError> {
        Self::with_store(config, LocalStore::new())
    }
}

impl<S: SpaceStore> SpaceManager<S> {
    /// Open a manager backed by `store`.
    ///
    /// Creates the configured directories, then loads the persisted index
    /// snapshot (empty if none). Call [`refresh`](Self::refresh) to sync
    /// with what is actually on disk.
    pub fn with_store(config: SpaceConfig, store: S) -> Result<Self, SpaceError> {
        let config = config.into_absolute()?;
        for dir in [&config.spaces_dir, &config.metadata_dir, &config.log_dir] {
            store.create_dir_all(dir).map_err(|source| SpaceError::Io {
                path: dir.clone(),
                source,
            })?;
        }

        let index = SpaceIndex::load(&store, config.index_file())?;
        let spaces_root = config.spaces_dir.clone();
        tracing::debug!(
            "space manager opened at {} ({} spaces in snapshot)",
            spaces_root.display(),
            index.len()
        );

        Ok(Self {
            config,
            spaces_root,
            store,
            index,
        })
    }

    pub fn config(&self) -> &SpaceConfig {
        &self.config
    }

    /// Root directory below which all spaces live.
    pub fn spaces_root(&self) -> &Path {
        &self.spaces_root
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn index(&self) -> &SpaceIndex {
        &self.index
    }

    /// Rebuild the index from a full scan and persist the snapshot.
    pub fn refresh(&mut self) -> Result<(), SpaceError> {
        self.index.refresh(&self.store, &self.spaces_root)
    }

    pub fn get_space(&self, name: &str) -> Option<&Space> {
        self.index.get(name)
    }

    pub fn space_exists(&self, name: &str) -> bool {
        self.index.contains(name)
    }

    /// All indexed spaces, optionally restricted to one label.
    pub fn list_spaces(&self, label_filter: Option<&str>) -> Vec<&Space> {
        match label_filter {
            Some(label) => self
                .index
                .spaces()
                .iter()
                .filter(|s| s.label == label)
                .collect(),
            None => self.index.spaces().iter().collect(),
        }
    }

    pub fn count_spaces(&self) -> usize {
        self.index.len()
    }

    /// Directory of the named space.
    pub fn space_path(&self, name: &str) -> Result<PathBuf, SpaceError> {
        Ok(self.require(name)?.path.clone())
    }

    /// Resolve `relative` inside the named space, rejecting escapes.
    pub fn resolve_in_space(
        &self,
        name: &str,
        relative: impl AsRef<Path>,
    ) -> Result<PathBuf, SpaceError> {
        let space = self.require(name)?;
        resolver::resolve(&space.path, relative)
    }

    /// Create a space.
    ///
    /// Without `parent_path` the space goes directly under the spaces
    /// root. With `parent_path = "base/sub/..."`, `base` must be an indexed
    /// space and the new directory is `base.path/sub/.../name`, which must
    /// stay inside `base.path`.
    ///
    /// The directory is created first, then the metadata record. If the
    /// record can't be written, the directory and any ancestors this call
    /// created are removed again; if that
    /// removal fails too, `RollbackFailed` reports both causes.
    pub fn create_space(
        &mut self,
        name: &str,
        label: &str,
        parent_path: Option<&str>,
    ) -> Result<Space, SpaceError> {
        validate_name(name)?;

        if self.index.contains(name) {
            return Err(SpaceError::AlreadyExists {
                name: name.to_string(),
            });
        }

        let destination = self.destination_for(name, parent_path)?;
        tracing::debug!("creating space '{}' at {}", name, destination.display());

        let created = CreatedDir::acquire(&self.store, &destination).map_err(|source| {
            tracing::error!("could not create directory for space '{}': {}", name, source);
            SpaceError::CreateSpaceFailed {
                name: name.to_string(),
                path: destination.clone(),
                source,
            }
        })?;

        let space = Space::new(name, label, &destination);
        if let Err(cause) = write_record(&self.store, &space) {
            tracing::error!("metadata write for space '{}' failed: {}", name, cause);
            let leftover = created.top.clone();
            return Err(match created.roll_back() {
                Ok(()) => SpaceError::MetadataWriteFailed {
                    name: name.to_string(),
                    path: space.metadata_path(),
                    source: cause,
                },
                Err(source) => {
                    tracing::error!(
                        "rollback of {} failed, directory left behind: {}",
                        leftover.display(),
                        source
                    );
                    SpaceError::RollbackFailed {
                        name: name.to_string(),
                        path: leftover,
                        cause,
                        source,
                    }
                }
            });
        }
        created.keep();

        tracing::info!("space '{}' created at {}", name, destination.display());
        self.refresh()?;

        Ok(self.index.get(name).cloned().unwrap_or(space))
    }

    /// Delete a space and everything below it.
    ///
    /// With `DeletePolicy::RefuseIfNested`, a space containing other
    /// spaces is left alone and `HasSubspaces` lists them. On a failed
    /// removal the index is not touched; refresh to see what remains.
    pub fn delete_space(&mut self, name: &str, policy: DeletePolicy) -> Result<(), SpaceError> {
        let space = self.require(name)?.clone();

        let nested: Vec<String> = self
            .index
            .nested_under(&space)
            .into_iter()
            .map(|s| s.name.clone())
            .collect();
        if !nested.is_empty() {
            if policy == DeletePolicy::RefuseIfNested {
                return Err(SpaceError::HasSubspaces {
                    name: name.to_string(),
                    subspaces: nested,
                });
            }
            tracing::info!(
                "deleting space '{}' also removes nested spaces: {}",
                name,
                nested.join(", ")
            );
        }

        // The snapshot could point anywhere; never remove outside the root.
        if space.path == self.spaces_root || !is_within(&self.spaces_root, &space.path) {
            return Err(SpaceError::PathEscape {
                root: self.spaces_root.clone(),
                requested: name.to_string(),
                resolved: space.path,
            });
        }

        self.store.remove_dir_all(&space.path).map_err(|source| {
            tracing::error!("failed to delete space '{}': {}", name, source);
            SpaceError::SpaceDeleteFailed {
                name: name.to_string(),
                path: space.path.clone(),
                source,
            }
        })?;

        tracing::info!("space '{}' deleted", name);
        self.refresh()
    }

    /// Create a directory (and missing ancestors) inside a space.
    pub fn create_directory(&self, name: &str, relative: &str) -> Result<PathBuf, SpaceError> {
        let target = self.resolve_in_space(name, relative)?;

        self.store
            .create_dir_all(&target)
            .map_err(|source| SpaceError::DirectoryCreateFailed {
                space: name.to_string(),
                path: target.clone(),
                source,
            })?;

        tracing::info!("created directory {} in space '{}'", target.display(), name);
        Ok(target)
    }

    /// Remove a directory tree inside a space. The space root itself can
    /// only be removed through [`delete_space`](Self::delete_space).
    pub fn remove_directory(&mut self, name: &str, relative: &str) -> Result<(), SpaceError> {
        let space_path = self.space_path(name)?;
        let target = resolver::resolve(&space_path, relative)?;

        if target == resolver::normalize(&space_path) {
            return Err(SpaceError::RootRemovalRefused {
                space: name.to_string(),
            });
        }

        let held_spaces = self
            .index
            .spaces()
            .iter()
            .any(|s| is_within(&target, &s.path));

        self.store
            .remove_dir_all(&target)
            .map_err(|source| SpaceError::DirectoryRemoveFailed {
                space: name.to_string(),
                path: target.clone(),
                source,
            })?;

        tracing::info!("removed directory {} in space '{}'", target.display(), name);

        if held_spaces {
            tracing::debug!("removed directory contained spaces, rescanning");
            self.refresh()?;
        }
        Ok(())
    }

    /// Latest modification time of any regular file in the space (or in
    /// one of its subdirectories), falling back to the directory's own
    /// mtime when there are no files.
    pub fn last_modified(
        &self,
        name: &str,
        subdirectory: Option<&str>,
    ) -> Result<DateTime<Utc>, SpaceError> {
        let target = match subdirectory {
            Some(sub) => self.resolve_in_space(name, sub)?,
            None => self.space_path(name)?,
        };
        recency::last_modified(&self.store, &target)
    }

    fn require(&self, name: &str) -> Result<&Space, SpaceError> {
        self.index.get(name).ok_or_else(|| SpaceError::NotFound {
            name: name.to_string(),
        })
    }

    fn destination_for(&self, name: &str, parent_path: Option<&str>) -> Result<PathBuf, SpaceError> {
        let Some(parent_path) = parent_path else {
            return resolver::resolve(&self.spaces_root, name);
        };

        let (base, rest) = parent_path.split_once('/').unwrap_or((parent_path, ""));
        let base_space = self
            .index
            .get(base)
            .ok_or_else(|| SpaceError::BaseSpaceNotFound {
                base: base.to_string(),
                parent_path: parent_path.to_string(),
            })?;

        resolver::resolve(&base_space.path, Path::new(rest).join(name))
    }
}

/// Check that `name` can be used as a space directory name.
pub fn validate_name(name: &str) -> Result<(), SpaceError> {
    let invalid = |reason: String| SpaceError::InvalidName {
        name: name.to_string(),
        reason,
    };

    if name.len() > MAX_NAME_LEN {
        return Err(invalid(format!("longer than {MAX_NAME_LEN} bytes")));
    }
    let pattern = name_regex().map_err(|e| invalid(e.to_string()))?;
    if !pattern.is_match(name) {
        return Err(invalid(format!("must match {NAME_PATTERN}")));
    }
    Ok(())
}

fn name_regex() -> Result<&'static Regex, &'static regex::Error> {
    static NAME_REGEX: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    NAME_REGEX.get_or_init(|| Regex::new(NAME_PATTERN)).as_ref()
}

fn write_record<S: SpaceStore>(store: &S, space: &Space) -> io::Result<()> {
    let bytes = space
        .encode()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    store.write_bytes(&space.metadata_path(), &bytes)
}

/// Directories this call created for a new space and may still have to undo.
///
/// `top` is the highest directory that did not exist before: the leaf
/// itself, or the first missing ancestor when `parent_path` named
/// subdirectories that weren't there yet. Cleanup is explicit: the caller
/// either keeps the directories or rolls them back and handles the
/// rollback's own failure.
struct CreatedDir<'a, S: SpaceStore> {
    store: &'a S,
    path: PathBuf,
    top: PathBuf,
}

impl<'a, S: SpaceStore> CreatedDir<'a, S> {
    /// Create missing ancestors, then the leaf itself. An existing leaf is
    /// an error, so a rollback never removes something it didn't create.
    /// If creation fails partway, the ancestors created so far are removed.
    fn acquire(store: &'a S, path: &Path) -> io::Result<Self> {
        let top = path
            .ancestors()
            .take_while(|p| !store.exists(p))
            .last()
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} already exists", path.display()),
                )
            })?;

        let created = Self {
            store,
            path: path.to_path_buf(),
            top,
        };
        if let Err(e) = created.create_all() {
            // The leaf may belong to a concurrent creator; only clean up
            // ancestors that were missing when we started.
            if created.top != created.path && store.exists(&created.top) {
                if let Err(cleanup) = store.remove_dir_all(&created.top) {
                    tracing::warn!(
                        "could not remove {} after failed create: {}",
                        created.top.display(),
                        cleanup
                    );
                }
            }
            return Err(e);
        }
        Ok(created)
    }

    fn create_all(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            self.store.create_dir_all(parent)?;
        }
        self.store.create_dir(&self.path)
    }

    fn keep(self) -> PathBuf {
        self.path
    }

    fn roll_back(self) -> io::Result<()> {
        tracing::debug!("rolling back {}", self.top.display());
        self.store.remove_dir_all(&self.top)
    }
}
