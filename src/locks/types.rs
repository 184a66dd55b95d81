//! Lock type definitions and information structures.

use super::metadata::LockMetadata;
use serde::Serialize;
use std::path::PathBuf;

/// Type of lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LockType {
    /// Serializes writes to the operation history.
    History,
    /// Guards clean/undo against one scan root.
    Root,
}

impl LockType {
    /// Classify a lock by its file stem.
    pub fn from_name(name: &str) -> Option<Self> {
        if name == "history" {
            Some(LockType::History)
        } else if name.starts_with("root-") {
            Some(LockType::Root)
        } else {
            None
        }
    }
}

/// Information about an active lock.
#[derive(Debug, Clone, Serialize)]
pub struct LockInfo {
    /// The lock file path.
    pub path: PathBuf,

    /// The lock name (file stem, e.g. "history" or "root-tmp-work").
    pub name: String,

    pub lock_type: LockType,

    pub metadata: LockMetadata,

    /// Whether the lock is older than the configured stale threshold.
    pub is_stale: bool,
}

impl std::fmt::Display for LockInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (owner: {}, age: {}, action: {}{})",
            self.name,
            self.metadata.owner,
            self.metadata.age_string(),
            self.metadata.action,
            if self.is_stale { ", STALE" } else { "" }
        )
    }
}
