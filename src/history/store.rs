//! The history store: append, query and transition operation records.

use super::backend::{HistoryBackend, NdjsonBackend};
use super::entry::{HistoryEntry, replay};
use crate::context::AppContext;
use crate::error::{ReclaimError, Result};
use crate::locks::LockGuard;
use crate::record::{FailedItem, OperationId, OperationRecord, RecordStatus};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Query filter for [`HistoryStore::list`]. Time bounds are inclusive and
/// compare against `created_at`.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub status: Option<RecordStatus>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl HistoryFilter {
    pub fn matches(&self, record: &OperationRecord) -> bool {
        self.status.is_none_or(|s| record.status == s)
            && self.since.is_none_or(|t| record.created_at >= t)
            && self.until.is_none_or(|t| record.created_at <= t)
    }
}

/// Writer exclusion: the in-process mutex plus the backend's lock file.
struct WriteGuard<'a> {
    _lock: Option<LockGuard>,
    _local: MutexGuard<'a, ()>,
}

/// Append-only store of operation records.
pub struct HistoryStore {
    backend: Box<dyn HistoryBackend>,
    writers: Mutex<()>,
}

impl HistoryStore {
    /// Open the durable store under the context's history directory.
    pub fn open(ctx: &AppContext) -> Self {
        Self::with_backend(NdjsonBackend::new(ctx))
    }

    pub fn with_backend(backend: impl HistoryBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            writers: Mutex::new(()),
        }
    }

    fn write_guard(&self, action: &str) -> Result<WriteGuard<'_>> {
        // Poisoning is ignored: every write is a single backend append.
        let local = self.writers.lock().unwrap_or_else(|p| p.into_inner());
        let lock = self.backend.lock(action)?;
        Ok(WriteGuard {
            _lock: lock,
            _local: local,
        })
    }

    fn records(&self) -> Result<BTreeMap<OperationId, OperationRecord>> {
        replay(self.backend.load()?)
    }

    /// Append a new record under the next operation id.
    ///
    /// The id is allocated and the `created` entry written under one hold of
    /// the writer lock, so ids in the log are strictly increasing in append
    /// order. `build` runs inside that hold and must return a record carrying
    /// the id it was given. An id handed to `build` is consumed even when
    /// `build` fails and is never reused.
    pub fn append<F>(&self, build: F) -> Result<OperationRecord>
    where
        F: FnOnce(OperationId) -> Result<OperationRecord>,
    {
        let _guard = self.write_guard("append")?;

        let max_recorded = self.records()?.keys().next_back().copied().unwrap_or(0);
        let counter = self.backend.read_counter()?.unwrap_or(1);
        let id = counter.max(max_recorded + 1);
        self.backend.write_counter(id + 1)?;
        tracing::debug!(id, "allocated operation id");

        let record = build(id)?;
        if record.id != id {
            return Err(ReclaimError::HistoryError(format!(
                "record carries id {} but operation {} was allocated",
                record.id, id
            )));
        }

        self.backend.append(&HistoryEntry::Created {
            record: record.clone(),
        })?;

        tracing::info!(
            id,
            status = %record.status,
            items = record.items.len(),
            bytes = record.total_bytes_freed,
            "recorded operation"
        );
        Ok(record)
    }

    pub fn get(&self, id: OperationId) -> Result<OperationRecord> {
        self.records()?
            .remove(&id)
            .ok_or_else(|| ReclaimError::NotFoundError(format!("no operation with id {}", id)))
    }

    /// Records matching `filter`, ordered by id.
    pub fn list(
        &self,
        filter: HistoryFilter,
    ) -> Result<impl Iterator<Item = OperationRecord> + use<>> {
        Ok(self
            .records()?
            .into_values()
            .filter(move |record| filter.matches(record)))
    }

    /// The record with the highest id, if any.
    pub fn latest(&self) -> Result<Option<OperationRecord>> {
        Ok(self.records()?.pop_last().map(|(_, record)| record))
    }

    /// Move a record to `status`, replacing its failed items.
    ///
    /// Returns the updated record. Transitions the record state machine
    /// forbids are rejected with `InvalidStateError` and change nothing.
    pub fn update_status(
        &self,
        id: OperationId,
        status: RecordStatus,
        failed_items: Vec<FailedItem>,
    ) -> Result<OperationRecord> {
        let _guard = self.write_guard("update_status")?;

        let mut record = self.records()?.remove(&id).ok_or_else(|| {
            ReclaimError::NotFoundError(format!("no operation with id {}", id))
        })?;

        if !record.status.can_transition_to(status) {
            return Err(ReclaimError::InvalidStateError(format!(
                "operation {} is {}; it cannot become {}",
                id, record.status, status
            )));
        }

        let at = Utc::now();
        self.backend.append(&HistoryEntry::StatusChanged {
            id,
            status,
            failed_items: failed_items.clone(),
            at,
        })?;

        tracing::info!(id, from = %record.status, to = %status, "operation status changed");
        record.status = status;
        record.failed_items = failed_items;
        record.updated_at = Some(at);
        Ok(record)
    }
}
