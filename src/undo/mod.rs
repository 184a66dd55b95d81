//! Undo: restore the items of an applied operation to their original paths.
//!
//! Only `applied` records can be undone. Restoring is retry-safe: an item
//! whose quarantined copy is gone while its original path holds a file of the
//! recorded size is taken as already restored, so a partially failed undo can
//! simply be run again once the blocking paths are cleared.


use crate::cleaner::remove_if_empty;
use crate::context::AppContext;
use crate::error::{ReclaimError, Result};
use crate::fs::move_file;
use crate::history::{HistoryFilter, HistoryStore};
use crate::locks::acquire_root_locks;
use crate::record::{FailedItem, OperationId, OperationRecord, QuarantinedItem, RecordStatus};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// The updated record plus per-item problems.
#[derive(Debug, Clone, Serialize)]
pub struct UndoOutcome {
    #[serde(flatten)]
    pub record: OperationRecord,
    pub warnings: Vec<String>,
}

enum Restored {
    Moved,
    AlreadyInPlace,
}

pub struct UndoManager<'a> {
    ctx: &'a AppContext,
    history: &'a HistoryStore,
}

impl<'a> UndoManager<'a> {
    pub fn new(ctx: &'a AppContext, history: &'a HistoryStore) -> Self {
        Self { ctx, history }
    }

    /// Undo the newest operation that is still `applied`.
    pub fn undo_last(&self) -> Result<UndoOutcome> {
        let applied = HistoryFilter {
            status: Some(RecordStatus::Applied),
            ..Default::default()
        };
        let id = self
            .history
            .list(applied)?
            .last()
            .map(|record| record.id)
            .ok_or_else(|| {
                ReclaimError::NotFoundError("no applied operation to undo".to_string())
            })?;
        self.undo(id)
    }

    /// Restore every item of operation `id`.
    pub fn undo(&self, id: OperationId) -> Result<UndoOutcome> {
        let record = self.history.get(id)?;
        ensure_undoable(&record)?;
        let _locks = acquire_root_locks(self.ctx, &record.roots, "undo")?;

        // Another process may have undone it while we waited for the locks.
        let record = self.history.get(id)?;
        ensure_undoable(&record)?;
        tracing::info!(id, items = record.items.len(), "undoing operation");

        let mut restored = 0usize;
        let mut failures = Vec::new();
        let mut warnings = Vec::new();
        for item in &record.items {
            match restore_item(item) {
                Ok(Restored::Moved) => {
                    tracing::debug!(path = %item.original_path.display(), "restored");
                    restored += 1;
                }
                Ok(Restored::AlreadyInPlace) => {
                    tracing::debug!(path = %item.original_path.display(), "already restored");
                    restored += 1;
                }
                Err(reason) => {
                    let failure = FailedItem::new(&item.original_path, reason);
                    let message = format!("could not restore {}", failure);
                    tracing::warn!("{}", message);
                    warnings.push(message);
                    failures.push(failure);
                }
            }
        }

        if failures.is_empty() {
            let record = self.history.update_status(id, RecordStatus::Undone, Vec::new())?;
            for dir in operation_dirs(&record) {
                remove_if_empty(dir);
            }
            tracing::info!(id, restored, "operation undone");
            return Ok(UndoOutcome { record, warnings });
        }

        let failed = failures.len();
        let record = self.history.update_status(id, RecordStatus::Applied, failures)?;

        if restored == 0 {
            return Err(ReclaimError::RestoreError(format!(
                "none of the {} item(s) of operation {} could be restored: {}",
                failed,
                id,
                warnings.join("; ")
            )));
        }

        tracing::warn!(id, restored, failed, "operation partially restored");
        Ok(UndoOutcome { record, warnings })
    }
}

fn ensure_undoable(record: &OperationRecord) -> Result<()> {
    match record.status {
        RecordStatus::Applied => Ok(()),
        RecordStatus::Undone => Err(ReclaimError::AlreadyUndoneError(format!(
            "operation {} was already undone",
            record.id
        ))),
        RecordStatus::FailedPartial => Err(ReclaimError::InvalidStateError(format!(
            "operation {} failed and was rolled back; there is nothing to undo",
            record.id
        ))),
    }
}

/// Move one item back. `Err` carries the reason it stays quarantined.
fn restore_item(item: &QuarantinedItem) -> std::result::Result<Restored, String> {
    let original = fs::symlink_metadata(&item.original_path).ok();

    if fs::symlink_metadata(&item.quarantine_path).is_err() {
        return match original {
            Some(meta) if meta.is_file() && meta.len() == item.size => {
                Ok(Restored::AlreadyInPlace)
            }
            _ => Err(format!(
                "quarantined copy '{}' is missing",
                item.quarantine_path.display()
            )),
        };
    }

    if original.is_some() {
        return Err("original path is occupied".to_string());
    }

    move_file(&item.quarantine_path, &item.original_path)
        .map(|()| Restored::Moved)
        .map_err(|e| e.to_string())
}

fn operation_dirs(record: &OperationRecord) -> BTreeSet<&Path> {
    record
        .items
        .iter()
        .filter_map(|item| item.quarantine_path.parent())
        .collect()
}
