// recency.rs — Latest-modification aggregation over a directory tree.

use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};

use crate::error::SpaceError;
use crate::store::SpaceStore;

/// Most recent modification time among regular files below `dir`.
///
/// Directories (and symlinks) don't count. When there is no regular file
/// at all, the directory's own modification time is returned instead.
pub fn last_modified<S: SpaceStore>(store: &S, dir: &Path) -> Result<DateTime<Utc>, SpaceError> {
    let mtime_failed = |source| SpaceError::DirMTimeFailed {
        path: dir.to_path_buf(),
        source,
    };

    let entries = store.list_recursive(dir).map_err(mtime_failed)?;

    let latest: Option<SystemTime> = entries
        .iter()
        .filter(|e| e.is_file())
        .map(|e| e.modified)
        .max();

    let latest = match latest {
        Some(t) => t,
        None => {
            tracing::debug!(
                "no regular files under {}, using directory mtime",
                dir.display()
            );
            store.modified(dir).map_err(mtime_failed)?
        }
    };

    Ok(DateTime::<Utc>::from(latest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalStore;
    use std::fs::{self, File};
    use std::time::Duration;
    use tempfile::tempdir;

    fn set_mtime(path: &Path, t: SystemTime) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(t)
            .unwrap();
    }

    #[test]
    fn newest_file_wins() {
        let dir = tempdir().unwrap();
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        fs::create_dir(dir.path().join("deep")).unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("deep/b.txt"), "b").unwrap();
        set_mtime(&dir.path().join("a.txt"), base);
        set_mtime(&dir.path().join("deep/b.txt"), base + Duration::from_secs(60));

        let latest = last_modified(&LocalStore, dir.path()).unwrap();
        assert_eq!(latest, DateTime::<Utc>::from(base + Duration::from_secs(60)));
    }

    #[test]
    fn only_directories_falls_back_to_dir_mtime() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("x/y")).unwrap();

        let expected = DateTime::<Utc>::from(fs::metadata(dir.path()).unwrap().modified().unwrap());
        let latest = last_modified(&LocalStore, dir.path()).unwrap();
        assert_eq!(latest, expected);
    }

    #[test]
    fn missing_directory_is_mtime_failure() {
        let dir = tempdir().unwrap();
        let result = last_modified(&LocalStore, &dir.path().join("gone"));
        assert!(matches!(result, Err(SpaceError::DirMTimeFailed { .. })));
    }
}
