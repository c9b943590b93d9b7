use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use filetime::{set_file_mtime, FileTime};
use lockstep_core::{
    layout, CascadingPruneOptions, Lock, LockedProject, Manifest, ProjectConstraint, ProjectRoot,
    VendorPolicy,
};
use lockstep_writer::{
    Artifact, ArtifactOutcome, CancellationToken, LocalSourceManager, SafeWriter, Stage,
    WriterError,
};
use tempfile::TempDir;

const DEPTEST: &str = "github.com/sdboyer/deptest";
const REV_1: &str = "ff2948a2ac8f538c4ecd55962e919d1e13e74baf";
const REV_2: &str = "3f4c3bea144e112a69bbe5d8d01c1b09a544253f";

fn manifest() -> Manifest {
    Manifest {
        constraints: vec![ProjectConstraint::version(DEPTEST, "^1.0.0")],
        ..Manifest::default()
    }
}

fn lock(rev: &str) -> Lock {
    Lock::new(
        manifest().inputs_digest(),
        vec![LockedProject::new(DEPTEST, rev).with_version("v1.0.0")],
    )
    .expect("lock")
}

/// A source cache holding deptest at both revisions.
fn cache() -> TempDir {
    let cache = TempDir::new().expect("cache");
    for (rev, body) in [(REV_1, "package deptest // r1\n"), (REV_2, "package deptest // r2\n")] {
        let dir = cache.path().join(DEPTEST).join(rev);
        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(dir.join("deptest.go"), body).expect("write source");
        fs::write(dir.join("deptest_test.go"), "package deptest\n").expect("write test");
    }
    cache
}

fn writer(
    manifest: Option<Manifest>,
    old: Option<&Lock>,
    new: Option<Lock>,
    policy: VendorPolicy,
) -> SafeWriter {
    SafeWriter::new(manifest, old, new, policy, CascadingPruneOptions::default()).expect("writer")
}

fn vendored_file(root: &Path) -> std::path::PathBuf {
    root.join("vendor").join(DEPTEST).join("deptest.go")
}

fn entries(root: &Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(root)
        .expect("read root")
        .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn an_hour_ago() -> FileTime {
    FileTime::from_system_time(SystemTime::now() - Duration::from_secs(60 * 60))
}

// ---------------------------------------------------------------------------
// Bad input
// ---------------------------------------------------------------------------

#[test]
fn bad_input_empty_root() {
    let w = writer(Some(manifest()), None, None, VendorPolicy::OnChanged);
    let err = w.write(Path::new(""), None, false, None).unwrap_err();
    assert!(matches!(err, WriterError::EmptyRoot));
    assert_eq!(err.stage(), Stage::Planning);
}

#[test]
fn bad_input_missing_source_manager() {
    let root = TempDir::new().expect("root");
    let w = writer(Some(manifest()), None, Some(lock(REV_1)), VendorPolicy::Always);
    let err = w.write(root.path(), None, false, None).unwrap_err();
    assert!(matches!(err, WriterError::MissingSourceManager));
    assert!(entries(root.path()).is_empty());
}

#[test]
fn bad_input_forced_vendor_without_lock() {
    let err = SafeWriter::new(
        Some(manifest()),
        None,
        None,
        VendorPolicy::Always,
        CascadingPruneOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, WriterError::NoLockToVendor));
}

#[test]
fn bad_input_old_lock_only() {
    let old = lock(REV_1);
    let err = SafeWriter::new(
        Some(manifest()),
        Some(&old),
        None,
        VendorPolicy::OnChanged,
        CascadingPruneOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, WriterError::OldLockWithoutNewLock));
}

#[test]
fn bad_input_nonexistent_root() {
    let tmp = TempDir::new().expect("tmp");
    let missing = tmp.path().join("nonexistent");
    let w = writer(Some(manifest()), None, None, VendorPolicy::OnChanged);
    let err = w.write(&missing, None, false, None).unwrap_err();
    assert!(matches!(err, WriterError::RootNotFound { .. }));
    assert!(!missing.exists());
}

#[test]
fn bad_input_root_is_file() {
    let tmp = TempDir::new().expect("tmp");
    let file = tmp.path().join("file");
    fs::write(&file, "not a dir").expect("write");
    let w = writer(Some(manifest()), None, None, VendorPolicy::OnChanged);
    let err = w.write(&file, None, false, None).unwrap_err();
    assert!(matches!(err, WriterError::RootNotDirectory { .. }));
    assert_eq!(fs::read_to_string(&file).expect("read"), "not a dir");
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

#[test]
fn manifest_only() {
    let root = TempDir::new().expect("root");
    let w = writer(Some(manifest()), None, None, VendorPolicy::OnChanged);
    assert!(w.has_manifest());
    assert!(!w.has_lock());
    assert!(!w.will_write_vendor());

    let report = w.write(root.path(), None, false, None).expect("write");
    assert_eq!(report.written(), vec![Artifact::Manifest]);
    assert_eq!(entries(root.path()), vec![layout::MANIFEST_NAME.to_string()]);

    let read = layout::read_manifest(root.path()).expect("read").expect("manifest");
    assert_eq!(read, manifest());
}

#[test]
fn manifest_and_unmodified_lock() {
    let root = TempDir::new().expect("root");
    let old = lock(REV_1);
    let w = writer(Some(manifest()), Some(&old), Some(lock(REV_1)), VendorPolicy::OnChanged);
    assert!(w.has_lock());
    assert!(!w.will_write_lock());
    assert!(!w.will_write_vendor());

    let report = w.write(root.path(), None, false, None).expect("write");
    assert_eq!(report.outcome(Artifact::Lock), ArtifactOutcome::Skipped);
    assert_eq!(entries(root.path()), vec![layout::MANIFEST_NAME.to_string()]);
}

#[test]
fn manifest_and_unmodified_lock_with_forced_vendor() {
    let root = TempDir::new().expect("root");
    let cache = cache();
    let sm = LocalSourceManager::new(cache.path());
    let old = lock(REV_1);
    let w = writer(Some(manifest()), Some(&old), Some(lock(REV_1)), VendorPolicy::Always);
    assert!(!w.will_write_lock());
    assert!(w.will_write_vendor());

    let report = w.write(root.path(), Some(&sm), false, None).expect("write");
    assert_eq!(report.written(), vec![Artifact::Manifest, Artifact::Vendor]);
    assert!(!layout::lock_path(root.path()).exists());
    assert!(vendored_file(root.path()).is_file());
}

#[test]
fn forced_vendor_replaces_existing_tree() {
    let root = TempDir::new().expect("root");
    let stale = root.path().join("vendor/github.com/stale/project/stale.go");
    fs::create_dir_all(stale.parent().expect("parent")).expect("mkdir");
    fs::write(&stale, "package stale").expect("write");

    let cache = cache();
    let sm = LocalSourceManager::new(cache.path());
    let w = writer(Some(manifest()), None, Some(lock(REV_1)), VendorPolicy::Always);
    w.write(root.path(), Some(&sm), false, None).expect("write");

    assert!(!stale.exists());
    assert_eq!(
        fs::read_to_string(vendored_file(root.path())).expect("read"),
        "package deptest // r1\n"
    );
    assert_eq!(
        entries(root.path()),
        vec![
            layout::LOCK_NAME.to_string(),
            layout::MANIFEST_NAME.to_string(),
            layout::VENDOR_DIR.to_string(),
        ]
    );
}

#[test]
fn new_lock_writes_lock_and_vendor() {
    let root = TempDir::new().expect("root");
    let cache = cache();
    let sm = LocalSourceManager::new(cache.path());
    let old = lock(REV_1);
    let w = writer(None, Some(&old), Some(lock(REV_2)), VendorPolicy::OnChanged);
    assert!(w.will_write_lock());
    assert!(w.will_write_vendor());

    let report = w.write(root.path(), Some(&sm), false, None).expect("write");
    assert_eq!(report.written(), vec![Artifact::Lock, Artifact::Vendor]);

    let written = layout::read_lock(root.path()).expect("read").expect("lock");
    assert!(written.equivalent(&lock(REV_2)));
    assert!(!layout::manifest_path(root.path()).exists());
    // Default prune options keep test files.
    assert!(root
        .path()
        .join("vendor")
        .join(DEPTEST)
        .join("deptest_test.go")
        .is_file());
}

#[test]
fn new_lock_with_vendor_never() {
    let root = TempDir::new().expect("root");
    let w = writer(Some(manifest()), None, Some(lock(REV_2)), VendorPolicy::Never);
    assert!(w.will_write_lock());
    assert!(!w.will_write_vendor());

    let report = w.write(root.path(), None, false, None).expect("write");
    assert_eq!(report.outcome(Artifact::Vendor), ArtifactOutcome::Skipped);
    assert!(!layout::vendor_path(root.path()).exists());
    assert!(layout::lock_path(root.path()).is_file());
}

// ---------------------------------------------------------------------------
// Metadata, idempotence, failures
// ---------------------------------------------------------------------------

#[test]
fn vendor_dot_git_preserved_with_forced_vendor() {
    let root = TempDir::new().expect("root");
    let git = root.path().join("vendor/.git");
    fs::create_dir_all(git.join("objects/ab")).expect("mkdir");
    fs::write(git.join("HEAD"), "ref: refs/heads/main\n").expect("head");
    let blob: Vec<u8> = (0..=255u8).collect();
    fs::write(git.join("objects/ab/cdef"), &blob).expect("blob");

    let cache = cache();
    let sm = LocalSourceManager::new(cache.path());
    let w = writer(Some(manifest()), None, Some(lock(REV_1)), VendorPolicy::Always);
    let report = w.write(root.path(), Some(&sm), false, None).expect("write");

    assert_eq!(report.preserved, vec![".git".to_string()]);
    assert!(lockstep_writer::has_dot_git(&layout::vendor_path(root.path())));
    assert_eq!(fs::read(git.join("objects/ab/cdef")).expect("blob"), blob);
    assert_eq!(
        fs::read_to_string(git.join("HEAD")).expect("head"),
        "ref: refs/heads/main\n"
    );
    assert!(vendored_file(root.path()).is_file());
}

#[test]
fn rerun_after_interrupted_swap_keeps_dot_git() {
    // A swap interrupted after vendor/ was moved aside.
    let root = TempDir::new().expect("root");
    let parked = root.path().join(".vendor.lockstep-old");
    fs::create_dir_all(parked.join(".git")).expect("mkdir");
    fs::write(parked.join(".git/HEAD"), "ref: refs/heads/main\n").expect("head");

    let cache = cache();
    let sm = LocalSourceManager::new(cache.path());
    let w = writer(Some(manifest()), None, Some(lock(REV_1)), VendorPolicy::Always);
    let report = w.write(root.path(), Some(&sm), false, None).expect("write");

    assert_eq!(report.preserved, vec![".git".to_string()]);
    assert_eq!(
        fs::read_to_string(root.path().join("vendor/.git/HEAD")).expect("head"),
        "ref: refs/heads/main\n"
    );
    assert!(vendored_file(root.path()).is_file());
    assert!(!parked.exists());
    assert_eq!(
        entries(root.path()),
        vec![
            layout::LOCK_NAME.to_string(),
            layout::MANIFEST_NAME.to_string(),
            layout::VENDOR_DIR.to_string(),
        ]
    );
}

#[test]
fn identical_manifest_keeps_mtime_unless_forced() {
    let root = TempDir::new().expect("root");
    let w = writer(Some(manifest()), None, None, VendorPolicy::OnChanged);
    w.write(root.path(), None, false, None).expect("first write");

    let path = layout::manifest_path(root.path());
    let old = an_hour_ago();
    set_file_mtime(&path, old).expect("set mtime");

    let report = w.write(root.path(), None, false, None).expect("second write");
    assert_eq!(report.outcome(Artifact::Manifest), ArtifactOutcome::Unchanged);
    let meta = fs::metadata(&path).expect("meta");
    assert_eq!(FileTime::from_last_modification_time(&meta), old);

    let report = w.write(root.path(), None, true, None).expect("forced write");
    assert_eq!(report.outcome(Artifact::Manifest), ArtifactOutcome::Written);
    let meta = fs::metadata(&path).expect("meta");
    assert_ne!(FileTime::from_last_modification_time(&meta), old);
}

#[test]
fn unchanged_lock_leaves_lock_and_vendor_alone() {
    let root = TempDir::new().expect("root");
    let cache = cache();
    let sm = LocalSourceManager::new(cache.path());
    writer(Some(manifest()), None, Some(lock(REV_1)), VendorPolicy::OnChanged)
        .write(root.path(), Some(&sm), false, None)
        .expect("first write");

    let old = an_hour_ago();
    let lock_path = layout::lock_path(root.path());
    let vendored = vendored_file(root.path());
    set_file_mtime(&lock_path, old).expect("lock mtime");
    set_file_mtime(&vendored, old).expect("vendor mtime");

    let live = layout::read_lock(root.path()).expect("read").expect("lock");
    let w = writer(Some(manifest()), Some(&live), Some(lock(REV_1)), VendorPolicy::OnChanged);
    let report = w.write(root.path(), Some(&sm), false, None).expect("second write");

    assert_eq!(report.outcome(Artifact::Lock), ArtifactOutcome::Skipped);
    assert_eq!(report.outcome(Artifact::Vendor), ArtifactOutcome::Skipped);
    for path in [&lock_path, &vendored] {
        let meta = fs::metadata(path).expect("meta");
        assert_eq!(FileTime::from_last_modification_time(&meta), old);
    }
}

#[test]
fn vendor_digest_is_stable_across_regenerations() {
    let cache = cache();
    let sm = LocalSourceManager::new(cache.path());
    let w = writer(None, None, Some(lock(REV_1)), VendorPolicy::Always);

    let first = TempDir::new().expect("first");
    let second = TempDir::new().expect("second");
    let a = w.write(first.path(), Some(&sm), false, None).expect("write a");
    let b = w.write(second.path(), Some(&sm), false, None).expect("write b");
    let again = w.write(first.path(), Some(&sm), false, None).expect("write again");

    let key = ProjectRoot::from(DEPTEST);
    assert_eq!(a.vendor_digests.get(&key), b.vendor_digests.get(&key));
    assert_eq!(a.vendor_digests, again.vendor_digests);
}

#[test]
fn failed_materialization_leaves_root_untouched() {
    let root = TempDir::new().expect("root");
    let cache = cache();
    let sm = LocalSourceManager::new(cache.path());
    let w = writer(Some(manifest()), None, Some(lock(REV_1)), VendorPolicy::Always);
    w.write(root.path(), Some(&sm), false, None).expect("seed root");

    let lock_before = fs::read(layout::lock_path(root.path())).expect("lock");
    let vendor_before = fs::read(vendored_file(root.path())).expect("vendor");

    let old = lock(REV_1);
    let broken = lock("0000000000000000000000000000000000000000");
    let w = writer(Some(manifest()), Some(&old), Some(broken), VendorPolicy::OnChanged);
    let err = w.write(root.path(), Some(&sm), false, None).unwrap_err();

    assert!(matches!(err, WriterError::Materialize { .. }), "got {err:?}");
    assert_eq!(err.stage(), Stage::Staging);
    assert!(err.root_untouched());
    assert_eq!(fs::read(layout::lock_path(root.path())).expect("lock"), lock_before);
    assert_eq!(fs::read(vendored_file(root.path())).expect("vendor"), vendor_before);
}

#[test]
fn pre_cancelled_token_writes_nothing() {
    let root = TempDir::new().expect("root");
    let token = CancellationToken::new();
    token.cancel();
    let w = writer(Some(manifest()), None, None, VendorPolicy::OnChanged);
    let err = w.write(root.path(), None, false, Some(&token)).unwrap_err();
    assert!(matches!(err, WriterError::Cancelled));
    assert!(entries(root.path()).is_empty());
}

#[test]
fn lock_failure_after_manifest_is_partial_commit() {
    let root = TempDir::new().expect("root");
    // A non-empty directory where the lock file belongs cannot be replaced.
    let blocker = layout::lock_path(root.path()).join("occupied");
    fs::create_dir_all(&blocker).expect("mkdir");

    let w = writer(Some(manifest()), None, Some(lock(REV_1)), VendorPolicy::Never);
    let err = w.write(root.path(), None, false, None).unwrap_err();
    match &err {
        WriterError::PartialCommit {
            committed, failed, ..
        } => {
            assert_eq!(committed, &vec![Artifact::Manifest]);
            assert_eq!(*failed, Artifact::Lock);
        }
        other => panic!("expected partial commit, got {other:?}"),
    }
    assert_eq!(err.stage(), Stage::Commit);
    assert!(!err.root_untouched());
    assert!(layout::manifest_path(root.path()).is_file());
    assert!(blocker.is_dir());
}
