//! Locking subsystem for reclaim.
//!
//! Two kinds of lock keep concurrent invocations from stepping on each other:
//! - Per-root locks (`root-{slug}.lock`): clean and undo against the same or
//!   nested scan roots are mutually exclusive; disjoint roots proceed
//!   concurrently.
//! - The history lock (`history.lock`): serializes id allocation, appends and
//!   status updates of the operation log across processes.
//!
//! # Lock Files
//!
//! Lock files are stored in `.reclaim/locks/`. The JSON metadata (owner, pid,
//! created_at, action, and for root locks the canonical roots) is written to
//! a temporary sibling first and then hard-linked into place. The link fails
//! if the lock exists, so only one holder can exist and a visible lock always
//! has complete metadata.
//!
//! # RAII Guards
//!
//! Locks are managed through RAII guard objects that automatically release
//! the lock when dropped. If deletion fails during drop, a warning is logged
//! but the program does not crash.

mod guard;
mod metadata;
mod operations;
mod types;

#[cfg(test)]
mod tests;

// Re-export public API
pub use guard::LockGuard;
pub(crate) use metadata::get_owner_string;
pub use operations::{acquire_history_lock, acquire_root_locks, clear_lock, list_locks};
pub use types::LockInfo;
