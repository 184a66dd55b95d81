//! Tests for the locks subsystem.

use super::metadata::LockMetadata;
use super::types::LockType;
use super::*;
use crate::config::Config;
use crate::context::AppContext;
use crate::error::ReclaimError;
use chrono::{Duration, Utc};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn create_test_context() -> (TempDir, AppContext) {
    let temp_dir = TempDir::new().unwrap();
    let ctx = AppContext::at(temp_dir.path()).unwrap();
    std::fs::create_dir_all(&ctx.locks_dir).unwrap();
    (temp_dir, ctx)
}

fn lock_root(ctx: &AppContext, root: &Path, action: &str) -> crate::error::Result<Vec<LockGuard>> {
    acquire_root_locks(ctx, &[root.to_path_buf()], action)
}

#[test]
fn test_lock_metadata_creation() {
    let meta = LockMetadata::new("clean");

    assert!(!meta.owner.is_empty());
    assert!(meta.pid.is_some());
    assert_eq!(meta.action, "clean");
    assert!(meta.age().num_minutes() < 1);
}

#[test]
fn test_lock_metadata_json_roundtrip() {
    let meta = LockMetadata::new("undo");
    let json = meta.to_json().unwrap();

    let parsed: LockMetadata = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.action, "undo");
    assert_eq!(parsed.owner, meta.owner);
}

#[test]
fn test_lock_metadata_age_and_staleness() {
    let mut meta = LockMetadata::new("clean");
    assert!(meta.age_string().ends_with('m'));
    assert!(!meta.is_stale(120));

    meta.created_at = Utc::now() - Duration::hours(2) - Duration::minutes(5);
    assert!(meta.age_string().contains('h'));
    assert!(meta.is_stale(120));

    meta.created_at = Utc::now() - Duration::days(3);
    assert!(meta.age_string().contains('d'));
}

#[test]
fn test_root_lock_is_released_on_drop() {
    let (_temp_dir, ctx) = create_test_context();
    let root = Path::new("/tmp/work");

    let guards = lock_root(&ctx, root, "clean").unwrap();
    let lock_path = ctx.root_lock_path(root);
    assert!(lock_path.exists());
    let metadata = LockMetadata::from_file(&lock_path).unwrap();
    assert_eq!(metadata.action, "clean");
    assert_eq!(metadata.roots.len(), 1);

    drop(guards);
    assert!(!lock_path.exists());
}

#[test]
fn test_lock_files_are_never_left_half_written() {
    let (_temp_dir, ctx) = create_test_context();

    let _guards = lock_root(&ctx, Path::new("/data/a"), "clean").unwrap();
    let _history = acquire_history_lock(&ctx, "append").unwrap();

    let mut names: Vec<String> = std::fs::read_dir(&ctx.locks_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["history.lock", "root-data-a.lock"]);
    for name in names {
        LockMetadata::from_file(ctx.locks_dir.join(name)).unwrap();
    }
}

#[test]
fn test_same_root_cannot_be_locked_twice() {
    let (_temp_dir, ctx) = create_test_context();
    let root = Path::new("/tmp/work");

    let first = lock_root(&ctx, root, "clean").unwrap();
    let err = lock_root(&ctx, root, "undo").unwrap_err();
    assert!(matches!(err, ReclaimError::LockError(_)));
    assert!(err.to_string().contains("held by another process"));

    drop(first);
    lock_root(&ctx, root, "undo").unwrap();
}

#[test]
fn test_disjoint_roots_lock_independently() {
    let (_temp_dir, ctx) = create_test_context();

    let _a = lock_root(&ctx, Path::new("/data/a"), "clean").unwrap();
    let _b = lock_root(&ctx, Path::new("/data/b"), "clean").unwrap();
    // A shared name prefix is not nesting.
    let _c = lock_root(&ctx, Path::new("/data/a-old"), "clean").unwrap();
}

#[test]
fn test_nested_roots_conflict_in_both_directions() {
    let (temp_dir, ctx) = create_test_context();
    let outer = temp_dir.path().join("work");
    let inner = outer.join("sub");
    std::fs::create_dir_all(&inner).unwrap();

    let held = lock_root(&ctx, &outer, "clean").unwrap();
    let err = lock_root(&ctx, &inner, "undo").unwrap_err();
    assert!(matches!(err, ReclaimError::LockError(_)));
    assert!(err.to_string().contains("overlaps"));
    // The inner lock was taken and released again.
    assert!(!ctx.root_lock_path(&inner.canonicalize().unwrap()).exists());
    drop(held);

    let held = lock_root(&ctx, &inner, "undo").unwrap();
    let err = lock_root(&ctx, &outer, "clean").unwrap_err();
    assert!(err.to_string().contains("overlaps"));
    drop(held);

    lock_root(&ctx, &outer, "clean").unwrap();
}

#[test]
fn test_acquire_root_locks_releases_all_on_conflict() {
    let (_temp_dir, ctx) = create_test_context();
    let roots = vec![PathBuf::from("/data/a"), PathBuf::from("/data/b")];

    let _held = lock_root(&ctx, Path::new("/data/b"), "undo").unwrap();
    assert!(acquire_root_locks(&ctx, &roots, "clean").is_err());

    // The lock for /data/a was taken and released again.
    assert!(!ctx.root_lock_path(Path::new("/data/a")).exists());
}

#[test]
fn test_acquire_root_locks_dedups() {
    let (_temp_dir, ctx) = create_test_context();
    let roots = vec![
        PathBuf::from("/data/a"),
        PathBuf::from("/data/a"),
        PathBuf::from("/data/b"),
    ];

    let guards = acquire_root_locks(&ctx, &roots, "clean").unwrap();
    assert_eq!(guards.len(), 2);
}

#[test]
fn test_history_lock_waits_for_release() {
    let (_temp_dir, ctx) = create_test_context();

    let guard = acquire_history_lock(&ctx, "append").unwrap();
    let ctx2 = ctx.clone();
    let waiter = std::thread::spawn(move || acquire_history_lock(&ctx2, "append").map(drop));

    std::thread::sleep(std::time::Duration::from_millis(50));
    drop(guard);

    waiter.join().unwrap().unwrap();
    assert!(!ctx.history_lock_path().exists());
}

#[test]
fn test_list_locks() {
    let (_temp_dir, ctx) = create_test_context();
    let config = Config::default();
    assert!(list_locks(&ctx, &config).unwrap().is_empty());

    let _root = lock_root(&ctx, Path::new("/tmp/work"), "clean").unwrap();
    let _history = acquire_history_lock(&ctx, "append").unwrap();
    std::fs::write(ctx.locks_dir.join("notes.txt"), "not a lock").unwrap();

    let locks = list_locks(&ctx, &config).unwrap();
    let names: Vec<&str> = locks.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["history", "root-tmp-work"]);
    assert_eq!(locks[0].lock_type, LockType::History);
    assert_eq!(locks[1].lock_type, LockType::Root);
}

#[test]
fn test_list_locks_detects_stale() {
    let (_temp_dir, ctx) = create_test_context();
    let config = Config::default();

    let stale_meta = LockMetadata {
        owner: "test@host".to_string(),
        pid: Some(12345),
        created_at: Utc::now() - Duration::minutes(200),
        action: "clean".to_string(),
        roots: vec![PathBuf::from("/srv/old")],
    };
    let lock_path = ctx.root_lock_path(Path::new("/srv/old"));
    std::fs::write(&lock_path, stale_meta.to_json().unwrap()).unwrap();

    let locks = list_locks(&ctx, &config).unwrap();
    assert_eq!(locks.len(), 1);
    assert_eq!(locks[0].name, "root-srv-old");
    assert!(locks[0].is_stale);
    assert!(locks[0].to_string().contains("STALE"));
}

#[test]
fn test_clear_lock() {
    let (_temp_dir, ctx) = create_test_context();
    let config = Config::default();

    let meta = LockMetadata::new("append");
    std::fs::write(ctx.history_lock_path(), meta.to_json().unwrap()).unwrap();

    let cleared = clear_lock(&ctx, "history", &config).unwrap();
    assert_eq!(cleared.lock_type, LockType::History);
    assert!(!ctx.history_lock_path().exists());
}

#[test]
fn test_clear_lock_rejects_unknown_and_missing() {
    let (_temp_dir, ctx) = create_test_context();
    let config = Config::default();

    let err = clear_lock(&ctx, "../../etc/passwd", &config).unwrap_err();
    assert!(err.to_string().contains("not a lock name"));

    let err = clear_lock(&ctx, "root-nowhere", &config).unwrap_err();
    assert!(err.to_string().contains("does not exist"));
}

#[test]
fn test_get_owner_string() {
    let owner = get_owner_string();
    assert!(owner.contains('@'));
}
