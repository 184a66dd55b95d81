//! Operation records: what one clean did, and where its files went.
//!
//! A record's status is a small state machine:
//!
//! ```text
//! applied ──undo──▶ undone          (terminal)
//!    │  ▲
//!    └──┘ partial undo refreshes failed_items
//! failed_partial                    (terminal, produced by the cleaner)
//! ```
//!
//! The transition table lives here so the history store and the undo manager
//! enforce exactly the same rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Opaque, positive, never reused operation id.
pub type OperationId = u64;

/// Lifecycle state of an operation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Items are in quarantine; the record can be undone.
    Applied,
    /// Items were restored.
    Undone,
    /// The clean failed and was rolled back; nothing consistent to restore.
    FailedPartial,
}

impl RecordStatus {
    /// Parse a status from its wire name.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "applied" => Some(Self::Applied),
            "undone" => Some(Self::Undone),
            "failed_partial" | "failed-partial" => Some(Self::FailedPartial),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Applied => "applied",
            RecordStatus::Undone => "undone",
            RecordStatus::FailedPartial => "failed_partial",
        }
    }

    /// Whether a stored record may move from `self` to `next`.
    pub fn can_transition_to(&self, next: RecordStatus) -> bool {
        matches!(
            (self, next),
            (RecordStatus::Applied, RecordStatus::Undone)
                | (RecordStatus::Applied, RecordStatus::Applied)
        )
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file moved into quarantine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantinedItem {
    pub original_path: PathBuf,
    pub quarantine_path: PathBuf,
    pub size: u64,
}

/// A file that could not be moved (during clean) or restored (during undo).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedItem {
    pub path: PathBuf,
    pub reason: String,
}

impl FailedItem {
    pub fn new(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for FailedItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.reason)
    }
}

/// Durable record of one clean invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub id: OperationId,

    pub created_at: DateTime<Utc>,

    /// Who ran the clean (`user@host`).
    pub actor: String,

    /// Scan roots whose locks guarded the operation.
    pub roots: Vec<PathBuf>,

    /// Quarantined items; fixed once the record is created.
    pub items: Vec<QuarantinedItem>,

    pub status: RecordStatus,

    pub total_bytes_freed: u64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_items: Vec<FailedItem>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl OperationRecord {
    /// Build a record, deriving `total_bytes_freed` from the item list.
    pub fn new(
        id: OperationId,
        actor: String,
        roots: Vec<PathBuf>,
        items: Vec<QuarantinedItem>,
        status: RecordStatus,
        failed_items: Vec<FailedItem>,
    ) -> Self {
        let total_bytes_freed = items.iter().map(|i| i.size).sum();
        Self {
            id,
            created_at: Utc::now(),
            actor,
            roots,
            items,
            status,
            total_bytes_freed,
            failed_items,
            updated_at: None,
        }
    }
}
