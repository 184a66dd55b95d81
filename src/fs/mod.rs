//! Filesystem primitives for reclaim.
//!
//! Everything that mutates user files or state files goes through here:
//! atomic writes for small state files and non-clobbering moves for
//! quarantine and restore.

pub(crate) mod atomic;
mod move_file;

pub use atomic::atomic_write_file;
pub use move_file::move_file;
