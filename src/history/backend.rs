//! Persistence backends for the history store.

use super::entry::HistoryEntry;
use crate::context::AppContext;
use crate::error::{ReclaimError, Result};
use crate::fs::atomic_write_file;
use crate::locks::{LockGuard, acquire_history_lock};
use crate::record::OperationId;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Storage used by [`super::HistoryStore`].
///
/// Backends only move bytes; replay, id allocation and transition checks live
/// in the store so every backend behaves the same.
pub trait HistoryBackend: Send + Sync {
    /// All entries in append order.
    fn load(&self) -> Result<Vec<HistoryEntry>>;

    /// Durably append one entry.
    fn append(&self, entry: &HistoryEntry) -> Result<()>;

    /// The next unallocated id, if a counter has been written.
    fn read_counter(&self) -> Result<Option<OperationId>>;

    fn write_counter(&self, next: OperationId) -> Result<()>;

    /// Cross-process exclusion for writers. `None` when the backend is
    /// private to this process.
    fn lock(&self, action: &str) -> Result<Option<LockGuard>>;
}

/// NDJSON log plus a counter file under the history directory.
#[derive(Debug, Clone)]
pub struct NdjsonBackend {
    ctx: AppContext,
    log_path: PathBuf,
    counter_path: PathBuf,
}

impl NdjsonBackend {
    pub fn new(ctx: &AppContext) -> Self {
        Self {
            ctx: ctx.clone(),
            log_path: ctx.history_log_path(),
            counter_path: ctx.next_id_path(),
        }
    }

    /// Cut a partial trailing line left by a crash so the next append starts
    /// on a fresh line.
    fn repair_tail(&self) -> Result<()> {
        let content = match fs::read(&self.log_path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(history_io("read", &self.log_path, e)),
        };
        if content.is_empty() || content.ends_with(b"\n") {
            return Ok(());
        }

        let keep = content
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |pos| pos + 1);
        tracing::warn!(
            log = %self.log_path.display(),
            dropped_bytes = content.len() - keep,
            "discarding truncated trailing history entry"
        );

        let file = OpenOptions::new()
            .write(true)
            .open(&self.log_path)
            .map_err(|e| history_io("open", &self.log_path, e))?;
        file.set_len(keep as u64)
            .and_then(|()| file.sync_all())
            .map_err(|e| history_io("truncate", &self.log_path, e))
    }
}

fn history_io(action: &str, path: &Path, e: io::Error) -> ReclaimError {
    ReclaimError::HistoryError(format!("failed to {} '{}': {}", action, path.display(), e))
}

/// Parse log content. A malformed final line without a trailing newline is an
/// interrupted append and is skipped; any other malformed line is corruption.
pub(super) fn parse_log(content: &str, path: &Path) -> Result<Vec<HistoryEntry>> {
    let complete = content.ends_with('\n');
    let lines: Vec<&str> = content.lines().collect();
    let last = lines.len().saturating_sub(1);

    let mut entries = Vec::with_capacity(lines.len());
    for (index, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<HistoryEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) if index == last && !complete => {
                tracing::warn!(
                    log = %path.display(),
                    line = index + 1,
                    error = %e,
                    "ignoring truncated trailing history entry"
                );
            }
            Err(e) => {
                return Err(ReclaimError::HistoryError(format!(
                    "malformed entry at {}:{}: {}",
                    path.display(),
                    index + 1,
                    e
                )));
            }
        }
    }
    Ok(entries)
}

impl HistoryBackend for NdjsonBackend {
    fn load(&self) -> Result<Vec<HistoryEntry>> {
        let content = match fs::read_to_string(&self.log_path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(history_io("read", &self.log_path, e)),
        };
        parse_log(&content, &self.log_path)
    }

    fn append(&self, entry: &HistoryEntry) -> Result<()> {
        let json_line = entry.to_ndjson_line()?;

        if let Some(dir) = self.log_path.parent()
            && !dir.exists()
        {
            fs::create_dir_all(dir).map_err(|e| history_io("create directory", dir, e))?;
        }
        self.repair_tail()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| history_io("open", &self.log_path, e))?;

        writeln!(file, "{}", json_line).map_err(|e| history_io("append to", &self.log_path, e))?;
        file.sync_all()
            .map_err(|e| history_io("sync", &self.log_path, e))?;

        Ok(())
    }

    fn read_counter(&self) -> Result<Option<OperationId>> {
        let content = match fs::read_to_string(&self.counter_path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(history_io("read", &self.counter_path, e)),
        };
        content.trim().parse::<OperationId>().map(Some).map_err(|e| {
            ReclaimError::HistoryError(format!(
                "id counter '{}' is corrupt: {}",
                self.counter_path.display(),
                e
            ))
        })
    }

    fn write_counter(&self, next: OperationId) -> Result<()> {
        atomic_write_file(&self.counter_path, &format!("{}\n", next))
            .map_err(|e| ReclaimError::HistoryError(e.to_string()))
    }

    fn lock(&self, action: &str) -> Result<Option<LockGuard>> {
        acquire_history_lock(&self.ctx, action).map(Some)
    }
}

#[cfg(test)]
pub(crate) use memory::MemoryBackend;
