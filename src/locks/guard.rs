//! RAII lock guard implementation.

use std::fs;
use std::path::PathBuf;

/// RAII guard for a lock file.
///
/// When dropped, the lock file is deleted. A failed deletion is logged,
/// never a panic.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
}

impl LockGuard {
    pub(super) fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(
                lock = %self.path.display(),
                error = %e,
                "failed to release lock"
            );
        }
    }
}
