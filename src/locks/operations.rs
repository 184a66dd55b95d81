//! Lock acquisition, listing, and clearing operations.

use super::guard::LockGuard;
use super::metadata::LockMetadata;
use super::types::{LockInfo, LockType};
use crate::config::Config;
use crate::context::AppContext;
use crate::error::{ReclaimError, Result};
use crate::fs::atomic::temp_path_for;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// How long history writers wait for each other before giving up.
const HISTORY_LOCK_TIMEOUT: Duration = Duration::from_secs(10);
const HISTORY_LOCK_RETRY: Duration = Duration::from_millis(5);

enum Attempt {
    Acquired(LockGuard),
    Held,
}

/// Create a lock file exclusively. `Held` means another holder exists.
fn try_acquire(lock_path: &Path, metadata: &LockMetadata) -> Result<Attempt> {
    if let Some(parent) = lock_path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            ReclaimError::LockError(format!(
                "failed to create locks directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    // The metadata is complete before the lock file becomes visible, so a
    // reader never sees an empty lock.
    let temp = temp_path_for(lock_path)?;
    let json = metadata.to_json()?;
    let staged = File::create(&temp).and_then(|mut file| {
        file.write_all(json.as_bytes())?;
        file.sync_all()
    });
    if let Err(e) = staged {
        let _ = fs::remove_file(&temp);
        return Err(ReclaimError::LockError(format!(
            "failed to write lock metadata '{}': {}",
            temp.display(),
            e
        )));
    }

    let linked = fs::hard_link(&temp, lock_path);
    let _ = fs::remove_file(&temp);
    match linked {
        Ok(()) => Ok(Attempt::Acquired(LockGuard::new(lock_path.to_path_buf()))),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(Attempt::Held),
        Err(e) => Err(ReclaimError::LockError(format!(
            "failed to acquire lock '{}': {}",
            lock_path.display(),
            e
        ))),
    }
}

fn held_error(lock_path: &Path) -> ReclaimError {
    let existing_info = match LockMetadata::from_file(lock_path) {
        Ok(meta) => format!(
            "\nLock: {} (created {} ago by {})\nAction: {}",
            lock_path.display(),
            meta.age_string(),
            meta.owner,
            meta.action
        ),
        Err(_) => format!("\nLock: {}", lock_path.display()),
    };
    ReclaimError::LockError(format!("lock is held by another process{}", existing_info))
}

/// Acquire a lock file, failing fast if it is held.
fn acquire_lock(lock_path: &Path, metadata: &LockMetadata) -> Result<LockGuard> {
    match try_acquire(lock_path, metadata)? {
        Attempt::Acquired(guard) => Ok(guard),
        Attempt::Held => Err(held_error(lock_path)),
    }
}

/// Canonical form of a root used for locking. Roots that no longer exist
/// fall back to their absolute spelling.
fn lock_root(root: &Path) -> PathBuf {
    fs::canonicalize(root)
        .or_else(|_| std::path::absolute(root))
        .unwrap_or_else(|_| root.to_path_buf())
}

/// Acquire the locks guarding clean/undo for several roots.
///
/// Lock files are taken in sorted order and deduplicated (two roots can map
/// to one lock file). Each lock file records the canonical roots it covers.
/// Once all are held, the other root locks are checked: a root nested inside
/// one of ours, or containing it, conflicts even though its lock file has a
/// different name. On any conflict the locks already taken are released and a
/// `LockError` is returned.
pub fn acquire_root_locks(
    ctx: &AppContext,
    roots: &[PathBuf],
    action: &str,
) -> Result<Vec<LockGuard>> {
    let mut by_lock: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for root in roots {
        let root = lock_root(root);
        let covered = by_lock.entry(ctx.root_lock_path(&root)).or_default();
        if !covered.contains(&root) {
            covered.push(root);
        }
    }

    let mut guards = Vec::with_capacity(by_lock.len());
    for (path, covered) in &by_lock {
        let metadata = LockMetadata::new(action).with_roots(covered.clone());
        // On error `guards` drops and releases everything taken so far.
        guards.push(acquire_lock(path, &metadata)?);
    }

    // Both of two overlapping callers publish before checking, so at least
    // the later one sees the other.
    for (path, other) in other_root_locks(ctx, &by_lock)? {
        for root in by_lock.values().flatten() {
            if let Some(held) = other.overlaps(root) {
                return Err(ReclaimError::LockError(format!(
                    "root '{}' overlaps '{}', which is held by another process\nLock: {} (created {} ago by {})\nAction: {}",
                    root.display(),
                    held.display(),
                    path.display(),
                    other.age_string(),
                    other.owner,
                    other.action
                )));
            }
        }
    }
    Ok(guards)
}

/// Metadata of every root lock not in `ours`. Locks that vanish or cannot be
/// parsed while listing are skipped.
fn other_root_locks(
    ctx: &AppContext,
    ours: &BTreeMap<PathBuf, Vec<PathBuf>>,
) -> Result<Vec<(PathBuf, LockMetadata)>> {
    let entries = fs::read_dir(&ctx.locks_dir).map_err(|e| {
        ReclaimError::LockError(format!(
            "failed to read locks directory '{}': {}",
            ctx.locks_dir.display(),
            e
        ))
    })?;

    let mut others = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if ours.contains_key(&path)
            || path.extension().and_then(|e| e.to_str()) != Some("lock")
            || LockType::from_name(
                path.file_stem().and_then(|s| s.to_str()).unwrap_or(""),
            ) != Some(LockType::Root)
        {
            continue;
        }
        if let Ok(metadata) = LockMetadata::from_file(&path) {
            others.push((path, metadata));
        }
    }
    Ok(others)
}

/// Acquire the history lock, waiting briefly for other writers.
///
/// History writes are short, so contention is resolved by retrying for up to
/// ten seconds. A lock that outlives that is probably left over from a crash
/// and has to be cleared with `reclaim lock clear history`.
pub fn acquire_history_lock(ctx: &AppContext, action: &str) -> Result<LockGuard> {
    let lock_path = ctx.history_lock_path();
    let metadata = LockMetadata::new(action);
    let deadline = Instant::now() + HISTORY_LOCK_TIMEOUT;

    loop {
        match try_acquire(&lock_path, &metadata)? {
            Attempt::Acquired(guard) => return Ok(guard),
            Attempt::Held if Instant::now() < deadline => {
                std::thread::sleep(HISTORY_LOCK_RETRY);
            }
            Attempt::Held => return Err(held_error(&lock_path)),
        }
    }
}

/// List all active locks.
pub fn list_locks(ctx: &AppContext, config: &Config) -> Result<Vec<LockInfo>> {
    let mut locks = Vec::new();

    if !ctx.locks_dir.exists() {
        return Ok(locks);
    }

    let entries = fs::read_dir(&ctx.locks_dir).map_err(|e| {
        ReclaimError::LockError(format!(
            "failed to read locks directory '{}': {}",
            ctx.locks_dir.display(),
            e
        ))
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| {
            ReclaimError::LockError(format!("failed to read locks directory entry: {}", e))
        })?;

        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("lock") {
            continue;
        }

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_string();
        let Some(lock_type) = LockType::from_name(&name) else {
            continue;
        };

        // The lock may have been released since the directory was read.
        let metadata = match LockMetadata::from_file(&path) {
            Ok(meta) => meta,
            Err(_) => continue,
        };

        let is_stale = metadata.is_stale(config.lock_stale_minutes);
        locks.push(LockInfo {
            path,
            name,
            lock_type,
            metadata,
            is_stale,
        });
    }

    locks.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(locks)
}

/// Remove a lock file by name ("history" or "root-..."), returning what was removed.
///
/// The caller decides whether clearing is appropriate (e.g. the lock is stale).
pub fn clear_lock(ctx: &AppContext, name: &str, config: &Config) -> Result<LockInfo> {
    let lock_type = LockType::from_name(name).ok_or_else(|| {
        ReclaimError::UserError(format!(
            "'{}' is not a lock name (expected 'history' or 'root-...')",
            name
        ))
    })?;
    let lock_path = ctx.locks_dir.join(format!("{}.lock", name));

    if !lock_path.exists() {
        return Err(ReclaimError::UserError(format!(
            "lock '{}' does not exist at: {}",
            name,
            lock_path.display()
        )));
    }

    let metadata = LockMetadata::from_file(&lock_path)?;
    let is_stale = metadata.is_stale(config.lock_stale_minutes);

    fs::remove_file(&lock_path).map_err(|e| {
        ReclaimError::LockError(format!(
            "failed to clear lock '{}': {}",
            lock_path.display(),
            e
        ))
    })?;

    Ok(LockInfo {
        path: lock_path,
        name: name.to_string(),
        lock_type,
        metadata,
        is_stale,
    })
}
