// index.rs — SpaceIndex: in-memory snapshot of every discovered space.
//
// The filesystem is the source of truth; the index is a cache of what the
// last scan found. It is only ever replaced wholesale by `refresh()` and
// never patched in place, so it always equals some real scan result.
//
// A snapshot of the index is persisted as JSON after every refresh and
// loaded at startup, so a new process can answer lookups before its first
// rescan.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SpaceError;
use crate::resolver::is_within;
use crate::space::{RecordError, Space, METADATA_FILE_NAME};
use crate::store::SpaceStore;

/// Serialized form of the index on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub generated_at: DateTime<Utc>,
    pub spaces: Vec<Space>,
}

/// In-memory set of valid spaces, ordered by path.
#[derive(Debug, Clone)]
pub struct SpaceIndex {
    spaces: Vec<Space>,
    snapshot_path: PathBuf,
}

impl SpaceIndex {
    /// An empty index that will persist to `snapshot_path`.
    pub fn empty(snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            spaces: Vec::new(),
            snapshot_path: snapshot_path.into(),
        }
    }

    /// Load the persisted snapshot, or start empty if none exists yet.
    ///
    /// A snapshot that exists but cannot be read or parsed is fatal.
    pub fn load<S: SpaceStore>(
        store: &S,
        snapshot_path: impl Into<PathBuf>,
    ) -> Result<Self, SpaceError> {
        let snapshot_path = snapshot_path.into();

        if !store.exists(&snapshot_path) {
            tracing::debug!(
                "no index snapshot at {}, starting empty",
                snapshot_path.display()
            );
            return Ok(Self::empty(snapshot_path));
        }

        let bytes = store
            .read_bytes(&snapshot_path)
            .map_err(|source| SpaceError::IndexLoadFailed {
                path: snapshot_path.clone(),
                source,
            })?;
        let snapshot: IndexSnapshot =
            serde_json::from_slice(&bytes).map_err(|e| SpaceError::IndexLoadFailed {
                path: snapshot_path.clone(),
                source: io::Error::new(io::ErrorKind::InvalidData, e),
            })?;

        tracing::debug!(
            "loaded {} spaces from snapshot {}",
            snapshot.spaces.len(),
            snapshot_path.display()
        );
        Ok(Self {
            spaces: snapshot.spaces,
            snapshot_path,
        })
    }

    /// Replace the contents with a fresh scan of `root` and persist them.
    pub fn refresh<S: SpaceStore>(&mut self, store: &S, root: &Path) -> Result<(), SpaceError> {
        self.spaces = scan(store, root)?;
        self.save(store)
    }

    /// Persist the current contents to the snapshot file.
    pub fn save<S: SpaceStore>(&self, store: &S) -> Result<(), SpaceError> {
        let path = &self.snapshot_path;
        let snapshot = IndexSnapshot {
            generated_at: Utc::now(),
            spaces: self.spaces.clone(),
        };

        let bytes = serde_json::to_vec_pretty(&snapshot).map_err(|e| SpaceError::IndexSaveFailed {
            path: path.clone(),
            source: io::Error::new(io::ErrorKind::InvalidData, e),
        })?;
        if let Some(parent) = path.parent() {
            store
                .create_dir_all(parent)
                .map_err(|source| SpaceError::IndexSaveFailed {
                    path: path.clone(),
                    source,
                })?;
        }
        store
            .write_bytes(path, &bytes)
            .map_err(|source| SpaceError::IndexSaveFailed {
                path: path.clone(),
                source,
            })?;

        tracing::debug!("saved index snapshot ({} spaces)", self.spaces.len());
        Ok(())
    }

    /// Look up a space by name. With duplicate names the first in path order wins.
    pub fn get(&self, name: &str) -> Option<&Space> {
        self.spaces.iter().find(|s| s.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All spaces, ordered by path.
    pub fn spaces(&self) -> &[Space] {
        &self.spaces
    }

    pub fn len(&self) -> usize {
        self.spaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spaces.is_empty()
    }

    /// Spaces carrying exactly `label`.
    pub fn with_label<'a, 'b>(&'a self, label: &'b str) -> impl Iterator<Item = &'a Space> + 'b
    where
        'a: 'b,
    {
        self.spaces.iter().filter(move |s| s.label == label)
    }

    /// Every space strictly below `space` in the directory tree.
    pub fn nested_under(&self, space: &Space) -> Vec<&Space> {
        self.spaces
            .iter()
            .filter(|s| s.path != space.path && is_within(&space.path, &s.path))
            .collect()
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }
}

/// Walk `root` and return every valid space found below it, ordered by path.
///
/// A failing directory listing aborts the scan. A single unreadable,
/// unparseable or incomplete record is logged and skipped, so one corrupt
/// space never hides the rest of the tree.
pub fn scan<S: SpaceStore>(store: &S, root: &Path) -> Result<Vec<Space>, SpaceError> {
    let entries = store
        .list_recursive(root)
        .map_err(|source| SpaceError::DirectoryScanFailed {
            path: root.to_path_buf(),
            source,
        })?;

    let mut spaces = Vec::new();

    for entry in entries.iter().filter(|e| e.is_file()) {
        if entry.relative_path.file_name().map_or(true, |n| n != METADATA_FILE_NAME) {
            continue;
        }
        let space_rel = match entry.relative_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            // A record directly in the root would make the root a space.
            _ => continue,
        };
        let space_dir = root.join(space_rel);
        let record_path = root.join(&entry.relative_path);

        let bytes = match store.read_bytes(&record_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("skipping unreadable metadata {}: {}", record_path.display(), e);
                continue;
            }
        };

        let mut space = match Space::decode(&bytes) {
            Ok(space) => space,
            Err(e @ RecordError::MissingFields(_)) => {
                tracing::warn!("skipping incomplete metadata {}: {}", record_path.display(), e);
                continue;
            }
            Err(e) => {
                tracing::warn!("skipping corrupt metadata {}: {}", record_path.display(), e);
                continue;
            }
        };

        if space.path != space_dir {
            tracing::warn!(
                "space '{}' records path {} but was found at {}; using found location",
                space.name,
                space.path.display(),
                space_dir.display()
            );
            space.path = space_dir;
        }
        space.subspaces.clear();
        spaces.push(space);
    }

    spaces.sort_by(|a, b| a.path.cmp(&b.path));
    link_subspaces(&mut spaces);

    for (i, space) in spaces.iter().enumerate() {
        if spaces[..i].iter().any(|s| s.name == space.name) {
            tracing::warn!(
                "duplicate space name '{}' at {}; lookups resolve to the first one",
                space.name,
                space.path.display()
            );
        }
    }

    tracing::debug!("scan of {} found {} spaces", root.display(), spaces.len());
    Ok(spaces)
}

/// Fill each space's `subspaces` with the names of spaces whose nearest
/// enclosing space it is. `spaces` must be sorted by path.
fn link_subspaces(spaces: &mut [Space]) {
    let mut parents: Vec<Option<usize>> = Vec::with_capacity(spaces.len());
    for (i, child) in spaces.iter().enumerate() {
        // Sorted by path, so the last enclosing entry before `i` is the nearest.
        let parent = (0..i)
            .rev()
            .find(|&j| is_within(&spaces[j].path, &child.path) && spaces[j].path != child.path);
        parents.push(parent);
    }

    for (child, parent) in parents.into_iter().enumerate() {
        if let Some(p) = parent {
            let name = spaces[child].name.clone();
            spaces[p].subspaces.push(name);
        }
    }
    for space in spaces.iter_mut() {
        space.subspaces.sort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalStore;
    use std::fs;
    use tempfile::tempdir;

    fn write_space(root: &Path, rel: &str, name: &str, label: &str) -> PathBuf {
        let dir = root.join(rel);
        fs::create_dir_all(&dir).unwrap();
        let space = Space::new(name, label, &dir);
        fs::write(dir.join(METADATA_FILE_NAME), space.encode().unwrap()).unwrap();
        dir
    }

    #[test]
    fn scan_finds_nested_spaces() {
        let dir = tempdir().unwrap();
        write_space(dir.path(), "proj", "proj", "team-x");
        write_space(dir.path(), "proj/inner/sub", "sub", "team-y");
        write_space(dir.path(), "other", "other", "");

        let spaces = scan(&LocalStore, dir.path()).unwrap();
        let names: Vec<&str> = spaces.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["other", "proj", "sub"]);

        let proj = spaces.iter().find(|s| s.name == "proj").unwrap();
        assert_eq!(proj.subspaces, vec!["sub".to_string()]);
    }

    #[test]
    fn scan_skips_incomplete_metadata() {
        let dir = tempdir().unwrap();
        let broken = dir.path().join("broken");
        fs::create_dir(&broken).unwrap();
        fs::write(broken.join(METADATA_FILE_NAME), "name: test\nlabel: ''").unwrap();

        let spaces = scan(&LocalStore, dir.path()).unwrap();
        assert!(spaces.is_empty());
    }

    #[test]
    fn scan_skips_unparseable_metadata_but_keeps_others() {
        let dir = tempdir().unwrap();
        let failmeta = dir.path().join("failmeta");
        fs::create_dir(&failmeta).unwrap();
        fs::write(failmeta.join(METADATA_FILE_NAME), "this: will break: badly").unwrap();
        write_space(dir.path(), "good", "good", "");

        let spaces = scan(&LocalStore, dir.path()).unwrap();
        assert_eq!(spaces.len(), 1);
        assert_eq!(spaces[0].name, "good");
    }

    #[test]
    fn scan_ignores_metadata_in_root_and_other_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(METADATA_FILE_NAME), "name: x").unwrap();
        fs::create_dir(dir.path().join("plain")).unwrap();
        fs::write(dir.path().join("plain/notes.yaml"), "name: y").unwrap();

        assert!(scan(&LocalStore, dir.path()).unwrap().is_empty());
    }

    #[test]
    fn scan_of_missing_root_is_fatal() {
        let dir = tempdir().unwrap();
        let result = scan(&LocalStore, &dir.path().join("missing"));
        assert!(matches!(result, Err(SpaceError::DirectoryScanFailed { .. })));
    }

    #[test]
    fn scan_corrects_moved_space_path() {
        let dir = tempdir().unwrap();
        let moved = dir.path().join("moved");
        fs::create_dir(&moved).unwrap();
        let stale = Space::new("moved", "", dir.path().join("original"));
        fs::write(moved.join(METADATA_FILE_NAME), stale.encode().unwrap()).unwrap();

        let spaces = scan(&LocalStore, dir.path()).unwrap();
        assert_eq!(spaces[0].path, moved);
    }

    #[test]
    fn load_missing_snapshot_starts_empty() {
        let dir = tempdir().unwrap();
        let index = SpaceIndex::load(&LocalStore, dir.path().join("index.json")).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn load_corrupt_snapshot_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.json");
        fs::write(&path, "{ not json").unwrap();

        let result = SpaceIndex::load(&LocalStore, &path);
        assert!(matches!(result, Err(SpaceError::IndexLoadFailed { .. })));
    }

    #[test]
    fn refresh_persists_snapshot_that_loads_back() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("spaces");
        write_space(&root, "a", "a", "l");
        let snapshot = dir.path().join("meta/index.json");

        let mut index = SpaceIndex::empty(&snapshot);
        index.refresh(&LocalStore, &root).unwrap();
        assert!(snapshot.exists());

        let reloaded = SpaceIndex::load(&LocalStore, &snapshot).unwrap();
        assert_eq!(reloaded.spaces(), index.spaces());
    }

    #[test]
    fn refresh_twice_yields_same_set() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("spaces");
        write_space(&root, "a", "a", "");
        write_space(&root, "a/b", "b", "");

        let mut index = SpaceIndex::empty(dir.path().join("index.json"));
        index.refresh(&LocalStore, &root).unwrap();
        let first = index.spaces().to_vec();
        index.refresh(&LocalStore, &root).unwrap();
        assert_eq!(index.spaces(), first.as_slice());
    }

    #[test]
    fn nested_under_and_label_filter() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("spaces");
        write_space(&root, "p", "p", "team");
        write_space(&root, "p/c", "c", "other");
        write_space(&root, "p1", "p1", "team");

        let mut index = SpaceIndex::empty(dir.path().join("index.json"));
        index.refresh(&LocalStore, &root).unwrap();

        let p = index.get("p").unwrap();
        let nested: Vec<&str> = index.nested_under(p).iter().map(|s| s.name.as_str()).collect();
        assert_eq!(nested, vec!["c"]);

        let labelled: Vec<&str> = index.with_label("team").map(|s| s.name.as_str()).collect();
        assert_eq!(labelled, vec!["p", "p1"]);
    }

    #[test]
    fn label_filter_results_outlive_the_label() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("spaces");
        write_space(&root, "a", "a", "team");

        let mut index = SpaceIndex::empty(dir.path().join("index.json"));
        index.refresh(&LocalStore, &root).unwrap();

        let found: Vec<&Space> = {
            let label = String::from("team");
            index.with_label(&label).collect()
        };
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "a");
    }
}
