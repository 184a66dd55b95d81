//! Log entries and their replay into current record state.

use crate::error::{ReclaimError, Result};
use crate::record::{FailedItem, OperationId, OperationRecord, RecordStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One line of the history log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HistoryEntry {
    /// A new operation record.
    Created { record: OperationRecord },

    /// A status transition of an existing record.
    StatusChanged {
        id: OperationId,
        status: RecordStatus,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        failed_items: Vec<FailedItem>,
        at: DateTime<Utc>,
    },
}

impl HistoryEntry {
    /// Serialize the entry to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            ReclaimError::HistoryError(format!("failed to serialize history entry: {}", e))
        })
    }
}

/// Fold log entries into the current state of every record, keyed by id.
///
/// A duplicate `created` entry or a status change for an unknown id means the
/// log was edited by hand or written by a broken writer; both are errors.
pub(super) fn replay(entries: Vec<HistoryEntry>) -> Result<BTreeMap<OperationId, OperationRecord>> {
    let mut records = BTreeMap::new();

    for entry in entries {
        match entry {
            HistoryEntry::Created { record } => {
                let id = record.id;
                if records.insert(id, record).is_some() {
                    return Err(ReclaimError::HistoryError(format!(
                        "history log contains operation {} twice",
                        id
                    )));
                }
            }
            HistoryEntry::StatusChanged {
                id,
                status,
                failed_items,
                at,
            } => {
                let record: &mut OperationRecord = records.get_mut(&id).ok_or_else(|| {
                    ReclaimError::HistoryError(format!(
                        "history log changes status of unknown operation {}",
                        id
                    ))
                })?;
                record.status = status;
                record.failed_items = failed_items;
                record.updated_at = Some(at);
            }
        }
    }

    Ok(records)
}
