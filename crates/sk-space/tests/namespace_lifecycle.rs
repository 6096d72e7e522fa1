// namespace_lifecycle.rs — End-to-end behaviour of the space namespace.
//
// Exercises the manager against a real temp directory, plus a store that
// fails on demand to drive the rollback and scan-failure paths.

use std::cell::Cell;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use tempfile::tempdir;

use sk_space::{
    DeletePolicy, DirEntry, LocalStore, SpaceConfig, SpaceError, SpaceManager, SpaceStore,
    METADATA_FILE_NAME,
};

/// LocalStore with switches that make individual primitives fail.
#[derive(Default)]
struct FlakyStore {
    inner: LocalStore,
    fail_metadata_write: Cell<bool>,
    fail_remove_dir: Cell<bool>,
    fail_listing: Cell<bool>,
}

fn injected(what: &str) -> io::Error {
    io::Error::other(format!("injected {what} failure"))
}

impl SpaceStore for FlakyStore {
    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn read_bytes(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.inner.read_bytes(path)
    }

    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        if self.fail_metadata_write.get()
            && path.file_name().is_some_and(|n| n == METADATA_FILE_NAME)
        {
            return Err(injected("write"));
        }
        self.inner.write_bytes(path, bytes)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        self.inner.remove_file(path)
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        self.inner.create_dir(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.inner.create_dir_all(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        if self.fail_remove_dir.get() {
            return Err(injected("remove"));
        }
        self.inner.remove_dir_all(path)
    }

    fn list_recursive(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        if self.fail_listing.get() {
            return Err(injected("listing"));
        }
        self.inner.list_recursive(dir)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        self.inner.modified(path)
    }
}

fn flaky_manager(base: &Path) -> SpaceManager<FlakyStore> {
    SpaceManager::with_store(SpaceConfig::for_base(base), FlakyStore::default()).unwrap()
}

fn set_mtime(path: &Path, t: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(t)
        .unwrap();
}

#[test]
fn failed_metadata_write_rolls_back_directory() {
    let dir = tempdir().unwrap();
    let mut sm = flaky_manager(dir.path());
    sm.store().fail_metadata_write.set(true);

    let err = sm.create_space("doomed", "", None).unwrap_err();
    assert!(matches!(err, SpaceError::MetadataWriteFailed { .. }));
    assert_eq!(err.error_code(), "METADATA_WRITE_FAILED");

    let target = sm.spaces_root().join("doomed");
    assert!(!target.exists());

    sm.store().fail_metadata_write.set(false);
    sm.refresh().unwrap();
    assert!(!sm.space_exists("doomed"));
}

#[test]
fn failed_rollback_is_reported_distinctly() {
    let dir = tempdir().unwrap();
    let mut sm = flaky_manager(dir.path());
    sm.store().fail_metadata_write.set(true);
    sm.store().fail_remove_dir.set(true);

    let err = sm.create_space("stuck", "", None).unwrap_err();
    match &err {
        SpaceError::RollbackFailed { name, path, .. } => {
            assert_eq!(name, "stuck");
            assert!(path.exists(), "directory is left behind and reported");
        }
        other => panic!("expected RollbackFailed, got {other:?}"),
    }
    assert_eq!(err.error_code(), "ROLLBACK_FAILED");

    // The leftover directory has no record, so it is not a space.
    sm.store().fail_remove_dir.set(false);
    sm.refresh().unwrap();
    assert!(!sm.space_exists("stuck"));
}

#[test]
fn failed_nested_create_removes_new_intermediate_dirs() {
    let dir = tempdir().unwrap();
    let mut sm = flaky_manager(dir.path());
    let base = sm.create_space("base", "", None).unwrap();
    fs::create_dir(base.path.join("kept")).unwrap();
    sm.store().fail_metadata_write.set(true);

    let err = sm.create_space("leaf", "", Some("base/a/b")).unwrap_err();
    assert_eq!(err.error_code(), "METADATA_WRITE_FAILED");
    assert!(!base.path.join("a").exists());
    assert!(base.path.is_dir());

    // Ancestors that already existed are left alone.
    let err = sm.create_space("leaf", "", Some("base/kept/x")).unwrap_err();
    assert_eq!(err.error_code(), "METADATA_WRITE_FAILED");
    assert!(base.path.join("kept").is_dir());
    assert!(!base.path.join("kept/x").exists());

    sm.store().fail_metadata_write.set(false);
    sm.refresh().unwrap();
    assert!(!sm.space_exists("leaf"));
    assert!(sm.space_exists("base"));
}

#[test]
fn failed_nested_rollback_reports_topmost_new_dir() {
    let dir = tempdir().unwrap();
    let mut sm = flaky_manager(dir.path());
    let base = sm.create_space("base", "", None).unwrap();
    sm.store().fail_metadata_write.set(true);
    sm.store().fail_remove_dir.set(true);

    match sm.create_space("leaf", "", Some("base/a/b")) {
        Err(SpaceError::RollbackFailed { path, .. }) => assert_eq!(path, base.path.join("a")),
        other => panic!("expected RollbackFailed, got {other:?}"),
    }
}

#[test]
fn failed_delete_leaves_index_untouched() {
    let dir = tempdir().unwrap();
    let mut sm = flaky_manager(dir.path());
    sm.create_space("keep", "", None).unwrap();
    sm.store().fail_remove_dir.set(true);

    let err = sm.delete_space("keep", DeletePolicy::Cascade).unwrap_err();
    assert!(matches!(err, SpaceError::SpaceDeleteFailed { .. }));
    assert!(sm.space_exists("keep"));
}

#[test]
fn listing_failure_aborts_refresh() {
    let dir = tempdir().unwrap();
    let mut sm = flaky_manager(dir.path());
    sm.create_space("one", "", None).unwrap();
    sm.store().fail_listing.set(true);

    let err = sm.refresh().unwrap_err();
    assert!(matches!(err, SpaceError::DirectoryScanFailed { .. }));
    assert_eq!(err.error_code(), "DIRECTORY_SCAN_FAILED");
    // The previous index survives a failed refresh.
    assert!(sm.space_exists("one"));
}

#[test]
fn unreadable_snapshot_fails_startup() {
    let dir = tempdir().unwrap();
    let config = SpaceConfig::for_base(dir.path());
    config.ensure_directories().unwrap();
    fs::write(config.index_file(), b"\x00\x01 not json").unwrap();

    let result = SpaceManager::open(config);
    assert!(matches!(result, Err(SpaceError::IndexLoadFailed { .. })));
}

#[test]
fn refresh_is_idempotent() {
    let dir = tempdir().unwrap();
    let mut sm = SpaceManager::open(SpaceConfig::for_base(dir.path())).unwrap();
    sm.create_space("a", "x", None).unwrap();
    sm.create_space("b", "y", Some("a/deeper")).unwrap();

    sm.refresh().unwrap();
    let first = sm.index().spaces().to_vec();
    sm.refresh().unwrap();
    assert_eq!(sm.index().spaces(), first.as_slice());
}

#[test]
fn label_filter_and_cascading_delete_scenario() {
    let dir = tempdir().unwrap();
    let mut sm = SpaceManager::open(SpaceConfig::for_base(dir.path())).unwrap();

    let proj = sm.create_space("proj", "team-x", None).unwrap();
    let sub = sm.create_space("sub", "team-y", Some("proj")).unwrap();
    assert!(sub.path.starts_with(&proj.path));

    let team_x: Vec<&str> = sm
        .list_spaces(Some("team-x"))
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(team_x, vec!["proj"]);

    sm.delete_space("proj", DeletePolicy::Cascade).unwrap();
    assert!(!proj.path.exists());
    assert!(!sub.path.exists());
    assert!(!sm.space_exists("sub"));
}

#[test]
fn corrupt_record_is_skipped_without_affecting_others() {
    let dir = tempdir().unwrap();
    let mut sm = SpaceManager::open(SpaceConfig::for_base(dir.path())).unwrap();
    let victim = sm.create_space("victim", "", None).unwrap();
    sm.create_space("healthy", "", None).unwrap();

    fs::write(
        victim.path.join(METADATA_FILE_NAME),
        format!("name: victim\nlabel: ''\npath: {}\n", victim.path.display()),
    )
    .unwrap();

    sm.refresh().unwrap();
    assert!(!sm.space_exists("victim"));
    assert!(sm.space_exists("healthy"));
}

#[test]
fn boundary_checked_operations_reject_escapes() {
    let dir = tempdir().unwrap();
    let mut sm = SpaceManager::open(SpaceConfig::for_base(dir.path())).unwrap();
    sm.create_space("jail", "", None).unwrap();
    sm.create_space("jail1", "", None).unwrap();

    for escape in ["..", "../..", "a/../../..", "../jail1", "/tmp"] {
        assert!(
            matches!(
                sm.create_directory("jail", escape),
                Err(SpaceError::PathEscape { .. })
            ),
            "create_directory({escape})"
        );
        assert!(
            matches!(
                sm.last_modified("jail", Some(escape)),
                Err(SpaceError::PathEscape { .. })
            ),
            "last_modified({escape})"
        );
        assert!(
            matches!(
                sm.resolve_in_space("jail", escape),
                Err(SpaceError::PathEscape { .. })
            ),
            "resolve_in_space({escape})"
        );
    }

    let inside = sm.create_directory("jail", "./a/../b/./c").unwrap();
    assert_eq!(inside, sm.space_path("jail").unwrap().join("b/c"));
    sm.last_modified("jail", Some("b/../b")).unwrap();
}

#[test]
fn last_modified_tracks_newest_file_then_falls_back() {
    let dir = tempdir().unwrap();
    let mut sm = SpaceManager::open(SpaceConfig::for_base(dir.path())).unwrap();
    let space = sm.create_space("recent", "", None).unwrap();
    let work = sm.create_directory("recent", "work").unwrap();

    let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
    let a = work.join("a.txt");
    let b = work.join("b.txt");
    fs::write(&a, "a").unwrap();
    fs::write(&b, "b").unwrap();
    set_mtime(&a, base);
    set_mtime(&b, base + Duration::from_secs(300));
    set_mtime(&space.path.join(METADATA_FILE_NAME), base - Duration::from_secs(300));

    let latest = sm.last_modified("recent", None).unwrap();
    assert_eq!(latest, DateTime::<Utc>::from(base + Duration::from_secs(300)));

    let in_work = sm.last_modified("recent", Some("work")).unwrap();
    assert_eq!(in_work, latest);

    fs::remove_file(&b).unwrap();
    let after = sm.last_modified("recent", None).unwrap();
    assert_eq!(after, DateTime::<Utc>::from(base));

    // Only directories left in the subdirectory: its own mtime is used.
    fs::remove_file(&a).unwrap();
    fs::create_dir(work.join("empty")).unwrap();
    let dir_mtime = DateTime::<Utc>::from(fs::metadata(&work).unwrap().modified().unwrap());
    assert_eq!(sm.last_modified("recent", Some("work")).unwrap(), dir_mtime);
}
