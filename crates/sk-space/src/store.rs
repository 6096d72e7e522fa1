// store.rs — SpaceStore trait and the LocalStore implementation.
//
// The SpaceStore trait is the seam between namespace logic and the raw
// filesystem. The manager and index only ever talk to a SpaceStore, so a
// test store can inject failures (a metadata write that fails, a listing
// that errors) without touching real permissions.
//
// All methods return plain `std::io::Error`; callers wrap them with the
// space/path context of the operation they were performing.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// What kind of filesystem object a listed entry is.
///
/// Symlinks are reported as `Other` and never followed during listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Other,
}

/// One entry produced by [`SpaceStore::list_recursive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Path relative to the listed directory.
    pub relative_path: PathBuf,
    pub kind: EntryKind,
    pub modified: SystemTime,
}

impl DirEntry {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// Byte-level file and directory primitives the namespace core depends on.
pub trait SpaceStore {
    /// Whether anything exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Read a whole file.
    fn read_bytes(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Replace a file's content as a whole: readers see either the old
    /// content or the new content, never a partial write.
    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Remove a single file.
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Create exactly one directory. Fails if it already exists.
    fn create_dir(&self, path: &Path) -> io::Result<()>;

    /// Create a directory and any missing ancestors.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Remove a directory and everything below it.
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Every entry below `dir` (files and directories), sorted by path.
    fn list_recursive(&self, dir: &Path) -> io::Result<Vec<DirEntry>>;

    /// Modification time of `path` itself.
    fn modified(&self, path: &Path) -> io::Result<SystemTime>;
}

/// SpaceStore backed by the local filesystem via `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStore;

impl LocalStore {
    pub fn new() -> Self {
        Self
    }

    fn walk_dir(&self, dir: &Path, root: &Path, out: &mut Vec<DirEntry>) -> io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let meta = fs::symlink_metadata(&path)?;

            let kind = if meta.is_dir() {
                EntryKind::Dir
            } else if meta.is_file() {
                EntryKind::File
            } else {
                EntryKind::Other
            };

            if let Ok(rel) = path.strip_prefix(root) {
                out.push(DirEntry {
                    relative_path: rel.to_path_buf(),
                    kind,
                    modified: meta.modified()?,
                });
            }

            if kind == EntryKind::Dir {
                self.walk_dir(&path, root, out)?;
            }
        }
        Ok(())
    }
}

impl SpaceStore for LocalStore {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_bytes(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let file_name = path
            .file_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
        let tmp = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

        fs::write(&tmp, bytes)?;
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }

    fn list_recursive(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        self.walk_dir(dir, dir, &mut entries)?;
        entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Ok(entries)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        fs::metadata(path)?.modified()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_then_read_bytes() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new();
        let path = dir.path().join("record.yaml");

        store.write_bytes(&path, b"first").unwrap();
        store.write_bytes(&path, b"second").unwrap();
        assert_eq!(store.read_bytes(&path).unwrap(), b"second");
    }

    #[test]
    fn write_leaves_no_temp_file_behind() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new();
        store.write_bytes(&dir.path().join("a.txt"), b"x").unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.txt".to_string()]);
    }

    #[test]
    fn create_dir_refuses_existing_directory() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new();
        let path = dir.path().join("leaf");

        store.create_dir(&path).unwrap();
        let err = store.create_dir(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn list_recursive_reports_files_and_dirs_sorted() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new();
        fs::create_dir_all(dir.path().join("b/c")).unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("b/c/d.txt"), "d").unwrap();

        let entries = store.list_recursive(dir.path()).unwrap();
        let listed: Vec<(String, EntryKind)> = entries
            .iter()
            .map(|e| (e.relative_path.to_string_lossy().to_string(), e.kind))
            .collect();
        assert_eq!(
            listed,
            vec![
                ("a.txt".to_string(), EntryKind::File),
                ("b".to_string(), EntryKind::Dir),
                ("b/c".to_string(), EntryKind::Dir),
                ("b/c/d.txt".to_string(), EntryKind::File),
            ]
        );
    }

    #[test]
    fn list_recursive_of_missing_dir_errors() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new();
        assert!(store.list_recursive(&dir.path().join("nope")).is_err());
    }
}
