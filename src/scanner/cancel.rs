//! Cooperative cancellation shared between a caller and a running scan or clean.

use crate::error::{ReclaimError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cheaply clonable flag; all clones observe the same cancellation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancellation has been requested.
    pub fn check(&self, what: &str) -> Result<()> {
        if self.is_cancelled() {
            Err(ReclaimError::Cancelled(format!("{} was cancelled", what)))
        } else {
            Ok(())
        }
    }
}
