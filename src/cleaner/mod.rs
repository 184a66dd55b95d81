//! Cleaner: move selected candidates into a per-operation quarantine.
//!
//! Nothing is ever deleted here. Items are first moved into a private staging
//! directory under the quarantine root. The history then allocates the
//! operation id, and while it holds the writer lock the staging directory is
//! renamed to `op-{id:06}`, so each item ends up at
//! `op-{id:06}/{index:05}_{file_name}`. The resulting [`OperationRecord`] is
//! appended before `clean` returns; if that append fails the files are moved
//! back, so an operation either exists in the history or left the tree
//! untouched.
//!
//! # Failure policy
//!
//! - [`FailurePolicy::Rollback`]: the first failing item stops the clean and
//!   every moved item goes back. The record is `failed_partial`.
//! - [`FailurePolicy::BestEffort`]: failing items are skipped with a warning
//!   and the record is `applied` with whatever was moved.


use crate::candidate::CandidateItem;
use crate::config::FailurePolicy;
use crate::context::AppContext;
use crate::error::{ReclaimError, Result};
use crate::fs::move_file;
use crate::history::HistoryStore;
use crate::locks::{acquire_root_locks, get_owner_string};
use crate::record::{FailedItem, OperationId, OperationRecord, QuarantinedItem, RecordStatus};
use crate::scanner::CancelToken;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// The record of a clean plus any non-fatal problems it hit.
#[derive(Debug, Clone, Serialize)]
pub struct CleanOutcome {
    #[serde(flatten)]
    pub record: OperationRecord,
    pub warnings: Vec<String>,
}

/// Quarantine directory owned by one operation.
pub fn operation_dir(quarantine_root: &Path, id: OperationId) -> PathBuf {
    quarantine_root.join(format!("op-{:06}", id))
}

/// Filter `candidates` down to the requested `paths`.
///
/// Returns the matching candidates in scan order and one warning per
/// requested path that is not a current candidate.
pub fn select(
    candidates: &[CandidateItem],
    paths: &[PathBuf],
) -> (Vec<CandidateItem>, Vec<String>) {
    let requested: HashSet<&Path> = paths.iter().map(PathBuf::as_path).collect();
    let selected: Vec<CandidateItem> = candidates
        .iter()
        .filter(|c| requested.contains(c.path.as_path()))
        .cloned()
        .collect();

    let found: HashSet<&Path> = selected.iter().map(|c| c.path.as_path()).collect();
    let mut reported = HashSet::new();
    let warnings = paths
        .iter()
        .filter(|p| !found.contains(p.as_path()) && reported.insert(p.as_path()))
        .map(|p| {
            format!(
                "'{}' is not a cleanup candidate under the current rules; skipped",
                p.display()
            )
        })
        .collect();

    (selected, warnings)
}

/// Moves candidates into quarantine and records the operation.
pub struct Cleaner<'a> {
    ctx: &'a AppContext,
    history: &'a HistoryStore,
    quarantine_root: PathBuf,
}

/// Items moved so far by one clean.
struct Progress {
    moved: Vec<QuarantinedItem>,
    failed: Vec<FailedItem>,
    warnings: Vec<String>,
}

impl<'a> Cleaner<'a> {
    pub fn new(ctx: &'a AppContext, history: &'a HistoryStore, quarantine_root: PathBuf) -> Self {
        Self {
            ctx,
            history,
            quarantine_root,
        }
    }

    /// Quarantine `selected` and append the resulting record to the history.
    pub fn clean(
        &self,
        selected: &[CandidateItem],
        policy: FailurePolicy,
        cancel: &CancelToken,
    ) -> Result<CleanOutcome> {
        if selected.is_empty() {
            return Err(ReclaimError::UserError(
                "nothing selected to clean".to_string(),
            ));
        }
        cancel.check("clean")?;

        let roots: Vec<PathBuf> = selected
            .iter()
            .map(|c| c.root.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let _locks = acquire_root_locks(self.ctx, &roots, "clean")?;

        // Last point at which cancelling leaves nothing to undo.
        cancel.check("clean")?;

        let staging = create_staging_dir(&self.quarantine_root)?;
        tracing::info!(
            items = selected.len(),
            policy = ?policy,
            staging = %staging.display(),
            "cleaning"
        );

        let mut progress = Progress {
            moved: Vec::with_capacity(selected.len()),
            failed: Vec::new(),
            warnings: Vec::new(),
        };

        let mut rolled_back = false;
        for (index, item) in selected.iter().enumerate() {
            match quarantine_item(&staging, index, item) {
                Ok(quarantined) => {
                    tracing::debug!(
                        path = %quarantined.original_path.display(),
                        to = %quarantined.quarantine_path.display(),
                        "quarantined"
                    );
                    progress.moved.push(quarantined);
                }
                Err(reason) => {
                    let failure = FailedItem::new(&item.path, reason);
                    if policy == FailurePolicy::BestEffort {
                        warn(&mut progress.warnings, format!("skipped {}", failure));
                        progress.failed.push(failure);
                        continue;
                    }

                    warn(
                        &mut progress.warnings,
                        format!("clean aborted: {}; rolling back", failure),
                    );
                    progress.failed.push(failure);
                    roll_back(&mut progress);
                    rolled_back = true;
                    break;
                }
            }
        }

        let status = if rolled_back || progress.moved.is_empty() {
            RecordStatus::FailedPartial
        } else {
            RecordStatus::Applied
        };

        let mut published: Option<PathBuf> = None;
        let appended = self.history.append(|id| {
            let op_dir = operation_dir(&self.quarantine_root, id);
            publish(&staging, &op_dir, progress.moved.is_empty())?;
            let items = relocate(&progress.moved, &op_dir);
            published = Some(op_dir);
            Ok(OperationRecord::new(
                id,
                get_owner_string(),
                roots,
                items,
                status,
                progress.failed.clone(),
            ))
        });

        let record = match appended {
            Ok(record) => record,
            Err(e) => {
                let dir = published.unwrap_or(staging);
                let items = relocate(&progress.moved, &dir);
                return Err(restore_unrecorded(&items, &dir, e));
            }
        };

        tracing::info!(
            id = record.id,
            status = %record.status,
            bytes = record.total_bytes_freed,
            failed = record.failed_items.len(),
            "clean finished"
        );
        Ok(CleanOutcome {
            record,
            warnings: progress.warnings,
        })
    }
}

/// Give the staged items their final home at `op_dir`.
///
/// Runs while the history writer lock is held, which is the only place
/// operation directories are created.
fn publish(staging: &Path, op_dir: &Path, nothing_moved: bool) -> Result<()> {
    if op_dir.exists() {
        return Err(ReclaimError::QuarantineError(format!(
            "operation directory '{}' already exists",
            op_dir.display()
        )));
    }
    if nothing_moved {
        remove_if_empty(staging);
        return Ok(());
    }
    fs::rename(staging, op_dir).map_err(|e| {
        ReclaimError::QuarantineError(format!(
            "cannot create operation directory '{}': {}",
            op_dir.display(),
            e
        ))
    })
}

/// The quarantined items as they sit once their directory is `dir`.
fn relocate(items: &[QuarantinedItem], dir: &Path) -> Vec<QuarantinedItem> {
    items
        .iter()
        .map(|item| QuarantinedItem {
            quarantine_path: match item.quarantine_path.file_name() {
                Some(name) => dir.join(name),
                None => item.quarantine_path.clone(),
            },
            ..item.clone()
        })
        .collect()
}

/// Put files back after the operation could not be recorded.
///
/// The cause keeps its kind when it is a quarantine problem; anything else
/// is reported as a history failure.
fn restore_unrecorded(items: &[QuarantinedItem], dir: &Path, cause: ReclaimError) -> ReclaimError {
    let mut stranded = Vec::new();
    for item in items.iter().rev() {
        if let Err(e) = move_file(&item.quarantine_path, &item.original_path) {
            stranded.push(format!("{} ({})", item.quarantine_path.display(), e));
        }
    }
    remove_if_empty(dir);

    let message = if stranded.is_empty() {
        format!(
            "clean could not be recorded; all files were restored: {}",
            cause
        )
    } else {
        format!(
            "clean could not be recorded and {} file(s) remain in quarantine: {}; cause: {}",
            stranded.len(),
            stranded.join(", "),
            cause
        )
    };
    tracing::error!("{}", message);
    match cause {
        ReclaimError::QuarantineError(_) => ReclaimError::QuarantineError(message),
        _ => ReclaimError::HistoryError(message),
    }
}

fn warn(warnings: &mut Vec<String>, message: String) {
    tracing::warn!("{}", message);
    warnings.push(message);
}

/// Create a staging directory no other clean can be using.
fn create_staging_dir(quarantine_root: &Path) -> Result<PathBuf> {
    fs::create_dir_all(quarantine_root).map_err(|e| {
        ReclaimError::QuarantineError(format!(
            "cannot create quarantine directory '{}': {}",
            quarantine_root.display(),
            e
        ))
    })?;

    let staging = quarantine_root.join(format!(
        ".staging-{}-{}",
        std::process::id(),
        STAGING_SEQ.fetch_add(1, Ordering::Relaxed)
    ));
    // Exclusive: an existing directory belongs to someone else.
    fs::create_dir(&staging).map_err(|e| {
        ReclaimError::QuarantineError(format!(
            "cannot create staging directory '{}': {}",
            staging.display(),
            e
        ))
    })?;
    Ok(staging)
}

/// Move one item into `dir`. `Err` carries the failure reason.
fn quarantine_item(
    dir: &Path,
    index: usize,
    item: &CandidateItem,
) -> std::result::Result<QuarantinedItem, String> {
    let metadata = match fs::symlink_metadata(&item.path) {
        Ok(metadata) => metadata,
        Err(_) => return Err("file no longer exists".to_string()),
    };
    if !metadata.is_file() {
        return Err("no longer a regular file".to_string());
    }
    if metadata.len() != item.size {
        return Err(format!(
            "size changed since scan ({} -> {} bytes)",
            item.size,
            metadata.len()
        ));
    }

    let file_name = item
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let destination = dir.join(format!("{:05}_{}", index, file_name));

    move_file(&item.path, &destination).map_err(|e| e.to_string())?;

    Ok(QuarantinedItem {
        original_path: item.path.clone(),
        quarantine_path: destination,
        size: item.size,
    })
}

/// Move every quarantined item back, newest first. Items that cannot be
/// moved back stay in `moved` so the record still points at them.
fn roll_back(progress: &mut Progress) {
    let mut stuck = Vec::new();
    for item in progress.moved.drain(..).rev() {
        match move_file(&item.quarantine_path, &item.original_path) {
            Ok(()) => {
                tracing::debug!(path = %item.original_path.display(), "rolled back");
            }
            Err(e) => {
                let message = format!(
                    "could not roll back {}: {}; it remains at {}",
                    item.original_path.display(),
                    e,
                    item.quarantine_path.display()
                );
                tracing::warn!("{}", message);
                progress.warnings.push(message);
                stuck.push(item);
            }
        }
    }
    stuck.reverse();
    progress.moved = stuck;
}

/// Remove a quarantine directory that ended up with nothing in it.
pub(crate) fn remove_if_empty(dir: &Path) {
    // `remove_dir` refuses non-empty directories.
    if let Err(e) = fs::remove_dir(dir) {
        tracing::debug!(dir = %dir.display(), error = %e, "quarantine directory kept");
    }
}
