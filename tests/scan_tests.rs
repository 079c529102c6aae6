use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use media_catalog::hasher::{Blake3Hasher, ContentHasher};
use media_catalog::{
    Database, Error, FileStatus, ProgressReporter, ScanEngine, SilentReporter, StatusApi,
    TransitionOutcome,
};
use tempfile::tempdir;

/// Delegates to BLAKE3 but refuses to read files with the given name,
/// standing in for a permission-denied file.
struct DenyingHasher {
    deny: &'static str,
}

impl ContentHasher for DenyingHasher {
    fn fingerprint(&self, path: &Path) -> io::Result<String> {
        if path.file_name().and_then(|n| n.to_str()) == Some(self.deny) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        }
        Blake3Hasher::default().fingerprint(path)
    }
}

/// Layout:
///   root/
///     a.txt        (10 bytes)
///     sub/b.txt    (0 bytes)
fn create_example_tree(root: &Path) -> PathBuf {
    fs::create_dir_all(root.join("sub")).unwrap();
    fs::write(root.join("a.txt"), "0123456789").unwrap();
    fs::write(root.join("sub/b.txt"), "").unwrap();
    fs::canonicalize(root).unwrap()
}

fn path_str(path: PathBuf) -> String {
    path.to_string_lossy().into_owned()
}

#[test]
fn test_example_scenario() {
    let tmp = tempdir().unwrap();
    let root = create_example_tree(tmp.path());
    let db = Database::open_in_memory().unwrap();

    let engine = ScanEngine::new(&db).with_hasher(DenyingHasher { deny: "b.txt" });
    let first = engine.scan(&root, &SilentReporter).unwrap();
    assert_eq!(first.created, 2);
    assert_eq!(first.unreadable, 1);

    let a = path_str(root.join("a.txt"));
    let b = path_str(root.join("sub/b.txt"));

    let pending = db.list_by_status(FileStatus::NotStarted).unwrap();
    let paths: Vec<&str> = pending.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, vec![a.as_str(), b.as_str()]);
    assert!(pending[1].fingerprint.is_none());
    assert_eq!(pending[0].size_bytes, 10);
    assert_eq!(
        pending[0].fingerprint.as_deref(),
        Some(blake3::hash(b"0123456789").to_hex().as_str())
    );

    let second = engine.scan(&root, &SilentReporter).unwrap();
    assert_eq!(second.created, 0);
    assert_eq!(second.already_cataloged, 2);

    let api = StatusApi::new(&db);
    assert_eq!(api.claim(&a).unwrap(), TransitionOutcome::Updated);
    assert_eq!(api.complete(&a).unwrap(), TransitionOutcome::Updated);

    let stats = api.summary().unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.not_started, 1);
    assert_eq!(stats.in_progress, 0);
    assert_eq!(stats.total_bytes, 10);
    assert_eq!(stats.distinct_extensions, 1);
}

#[test]
fn test_rescan_picks_up_only_new_files() {
    let tmp = tempdir().unwrap();
    let root = create_example_tree(tmp.path());
    let db = Database::open_in_memory().unwrap();
    let engine = ScanEngine::new(&db);

    assert_eq!(engine.scan(&root, &SilentReporter).unwrap().created, 2);

    fs::write(root.join("sub/c.mkv"), "more footage").unwrap();
    let result = engine.scan(&root, &SilentReporter).unwrap();
    assert_eq!(result.created, 1);
    assert_eq!(result.already_cataloged, 2);
    assert_eq!(db.aggregate().unwrap().total, 3);
}

#[test]
fn test_rescan_does_not_rehash_changed_content() {
    let tmp = tempdir().unwrap();
    let root = create_example_tree(tmp.path());
    let db = Database::open_in_memory().unwrap();
    let engine = ScanEngine::new(&db);
    engine.scan(&root, &SilentReporter).unwrap();

    let a = path_str(root.join("a.txt"));
    let before = db.get(&a).unwrap().unwrap();

    fs::write(root.join("a.txt"), "rewritten with different bytes").unwrap();
    engine.scan(&root, &SilentReporter).unwrap();

    let after = db.get(&a).unwrap().unwrap();
    assert_eq!(after.fingerprint, before.fingerprint);
    assert_eq!(after.size_bytes, 10);
}

#[test]
fn test_deleted_file_keeps_its_record() {
    let tmp = tempdir().unwrap();
    let root = create_example_tree(tmp.path());
    let db = Database::open_in_memory().unwrap();
    let engine = ScanEngine::new(&db);
    engine.scan(&root, &SilentReporter).unwrap();

    fs::remove_file(root.join("a.txt")).unwrap();
    let result = engine.scan(&root, &SilentReporter).unwrap();
    assert_eq!(result.files_seen, 1);
    assert!(db.exists(&path_str(root.join("a.txt"))).unwrap());
    assert_eq!(db.aggregate().unwrap().total, 2);
}

#[cfg(unix)]
#[test]
fn test_permission_denied_file_is_cataloged_without_fingerprint() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = tempdir().unwrap();
    let root = create_example_tree(tmp.path());
    let locked = root.join("sub/b.txt");
    fs::write(&locked, "secret").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    if fs::File::open(&locked).is_ok() {
        // Running with privileges that ignore file modes.
        return;
    }

    let db = Database::open_in_memory().unwrap();
    let result = ScanEngine::new(&db).scan(&root, &SilentReporter).unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    assert_eq!(result.created, 2);
    assert_eq!(result.unreadable, 1);
    let record = db.get(&path_str(locked)).unwrap().unwrap();
    assert!(record.fingerprint.is_none());
    assert_eq!(record.size_bytes, 6);
}

#[test]
fn test_identical_content_shares_fingerprint() {
    let tmp = tempdir().unwrap();
    fs::create_dir_all(tmp.path().join("dc31")).unwrap();
    fs::create_dir_all(tmp.path().join("backup")).unwrap();
    let footage = vec![0xAAu8; 300_000];
    fs::write(tmp.path().join("dc31/talk.mp4"), &footage).unwrap();
    fs::write(tmp.path().join("backup/talk.mp4"), &footage).unwrap();
    let root = fs::canonicalize(tmp.path()).unwrap();

    let db = Database::open_in_memory().unwrap();
    ScanEngine::new(&db)
        .with_hasher(Blake3Hasher::new(4096))
        .scan(&root, &SilentReporter)
        .unwrap();

    let fingerprint = db
        .get(&path_str(root.join("dc31/talk.mp4")))
        .unwrap()
        .unwrap()
        .fingerprint
        .unwrap();
    assert_eq!(db.find_by_fingerprint(&fingerprint).unwrap().len(), 2);
}

#[test]
fn test_ignore_patterns_are_honoured() {
    let tmp = tempdir().unwrap();
    let root = create_example_tree(tmp.path());
    let db = Database::open_in_memory().unwrap();

    let result = ScanEngine::new(&db)
        .with_ignore_patterns(vec!["**/sub".to_string()])
        .scan(&root, &SilentReporter)
        .unwrap();
    assert_eq!(result.created, 1);
}

#[test]
fn test_scan_all_skips_nested_roots() {
    let tmp = tempdir().unwrap();
    let root = create_example_tree(tmp.path());
    let db = Database::open_in_memory().unwrap();

    let result = ScanEngine::new(&db)
        .scan_all(&[root.join("sub"), root.clone()], &SilentReporter)
        .unwrap();
    assert_eq!(result.files_seen, 2);
    assert_eq!(result.created, 2);
}

#[test]
fn test_invalid_root_is_an_error() {
    let tmp = tempdir().unwrap();
    let db = Database::open_in_memory().unwrap();

    let err = ScanEngine::new(&db)
        .scan(&tmp.path().join("missing"), &SilentReporter)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRoot(_)));
}

/// Flips the cancel token once `stop_after` records have been created.
struct CancelAfter {
    token: Arc<AtomicBool>,
    stop_after: usize,
}

impl ProgressReporter for CancelAfter {
    fn on_file_cataloged(&self, created: usize, _current_path: &Path) {
        if created >= self.stop_after {
            self.token.store(true, Ordering::Relaxed);
        }
    }
}

#[test]
fn test_cancelled_scan_keeps_applied_records_and_resumes() {
    let tmp = tempdir().unwrap();
    for i in 0..10 {
        fs::write(tmp.path().join(format!("clip{:02}.mp4", i)), format!("clip {}", i)).unwrap();
    }
    let root = fs::canonicalize(tmp.path()).unwrap();
    let db = Database::open_in_memory().unwrap();

    let token = Arc::new(AtomicBool::new(false));
    let reporter = CancelAfter {
        token: token.clone(),
        stop_after: 3,
    };
    let partial = ScanEngine::new(&db)
        .with_cancel_token(token)
        .scan(&root, &reporter)
        .unwrap();
    assert!(partial.cancelled);
    assert_eq!(partial.created, 3);
    assert_eq!(partial.files_seen, 3);
    assert_eq!(db.aggregate().unwrap().total, 3);

    let resumed = ScanEngine::new(&db).scan(&root, &SilentReporter).unwrap();
    assert!(!resumed.cancelled);
    assert_eq!(resumed.created, 7);
    assert_eq!(resumed.already_cataloged, 3);
}

#[test]
fn test_cancelled_scan_all_keeps_totals_of_finished_roots() {
    let tmp = tempdir().unwrap();
    for dir in ["dc30", "dc31", "dc32"] {
        fs::create_dir_all(tmp.path().join(dir)).unwrap();
        for i in 0..3 {
            fs::write(tmp.path().join(format!("{}/clip{}.mp4", dir, i)), format!("{} {}", dir, i))
                .unwrap();
        }
    }
    let base = fs::canonicalize(tmp.path()).unwrap();
    let roots = vec![base.join("dc30"), base.join("dc31"), base.join("dc32")];
    let db = Database::open_in_memory().unwrap();

    let token = Arc::new(AtomicBool::new(false));
    let reporter = CancelAfter {
        token: token.clone(),
        stop_after: 3,
    };
    let partial = ScanEngine::new(&db)
        .with_cancel_token(token)
        .scan_all(&roots, &reporter)
        .unwrap();

    // The token is set on the last file of the first root. The second root
    // stops before its first file and the third is never started.
    assert!(partial.cancelled);
    assert_eq!(partial.created, 3);
    assert_eq!(partial.files_seen, 3);
    assert_eq!(db.aggregate().unwrap().total, 3);
    let first_root = path_str(roots[0].clone());
    let cataloged = db.list_by_status(FileStatus::NotStarted).unwrap();
    assert!(cataloged.iter().all(|r| r.path.starts_with(&first_root)));
}

#[test]
fn test_scan_all_collapses_aliased_roots() {
    let tmp = tempdir().unwrap();
    let root = create_example_tree(tmp.path());
    let db = Database::open_in_memory().unwrap();

    // `sub/..` names the root itself, so `sub` is nested inside it.
    let result = ScanEngine::new(&db)
        .scan_all(&[root.join("sub").join(".."), root.join("sub")], &SilentReporter)
        .unwrap();
    assert_eq!(result.files_seen, 2);
    assert_eq!(result.created, 2);
    assert_eq!(result.already_cataloged, 0);
}

#[cfg(unix)]
#[test]
fn test_denied_subdirectory_is_skipped_and_siblings_cataloged() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = tempdir().unwrap();
    let root = create_example_tree(tmp.path());
    let locked = root.join("locked");
    fs::create_dir(&locked).unwrap();
    fs::write(locked.join("hidden.mp4"), "hidden").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    if fs::read_dir(&locked).is_ok() {
        // Running with privileges that ignore directory modes.
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let db = Database::open_in_memory().unwrap();
    let result = ScanEngine::new(&db).scan(&root, &SilentReporter);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    let result = result.unwrap();
    assert_eq!(result.created, 2);
    assert_eq!(result.walk_errors, 1);
    assert!(db.exists(&path_str(root.join("a.txt"))).unwrap());
    assert!(db.exists(&path_str(root.join("sub/b.txt"))).unwrap());
    assert!(!db.exists(&path_str(locked.join("hidden.mp4"))).unwrap());
}

#[cfg(target_os = "linux")]
#[test]
fn test_non_utf8_names_are_never_merged() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let tmp = tempdir().unwrap();
    let root = create_example_tree(tmp.path());
    fs::write(root.join(OsStr::from_bytes(b"talk\xff.mp4")), "first talk").unwrap();
    fs::write(root.join(OsStr::from_bytes(b"talk\xfe.mp4")), "second talk").unwrap();

    let db = Database::open_in_memory().unwrap();
    let result = ScanEngine::new(&db).scan(&root, &SilentReporter).unwrap();

    assert_eq!(result.created, 2);
    assert_eq!(result.already_cataloged, 0);
    assert_eq!(result.walk_errors, 2);

    // Every stored path names a file that exists on disk.
    let records = db.list_by_status(FileStatus::NotStarted).unwrap();
    assert_eq!(records.len(), 2);
    for record in &records {
        assert!(!record.path.contains('\u{FFFD}'));
        assert!(Path::new(&record.path).exists());
    }
}
