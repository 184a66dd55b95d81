//! Non-clobbering file moves.
//!
//! Quarantine and restore both move a single regular file and must never
//! overwrite whatever sits at the destination, even if something appears
//! there while the move is running. The destination is therefore claimed with
//! `link(2)`, which fails if the name exists, and the source name is removed
//! afterwards. When the quarantine lives on another device the link fails
//! with `EXDEV`; the fallback copies into a temporary sibling of the
//! destination, verifies the copied length, links it into place and only then
//! deletes the source. Filesystems without hard links fall back to a checked
//! `rename(2)`.

use crate::fs::atomic::{sync_parent, temp_path_for};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why a move did not happen. On every error the source is left in place.
#[derive(Debug, Error)]
pub enum MoveError {
    #[error("source '{0}' no longer exists")]
    SourceMissing(PathBuf),

    #[error("destination '{0}' is already occupied")]
    DestinationExists(PathBuf),

    #[error("failed to {action} '{path}': {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("copy of '{path}' is {copied} bytes, expected {expected}")]
    VerificationFailed {
        path: PathBuf,
        expected: u64,
        copied: u64,
    },
}

fn io_err(action: &'static str, path: &Path) -> impl FnOnce(io::Error) -> MoveError {
    let path = path.to_path_buf();
    move |source| MoveError::Io {
        action,
        path,
        source,
    }
}

/// Move a single file from `source` to `destination` without clobbering.
///
/// Parent directories of `destination` are created as needed.
pub fn move_file<P: AsRef<Path>, Q: AsRef<Path>>(
    source: P,
    destination: Q,
) -> std::result::Result<(), MoveError> {
    let source = source.as_ref();
    let destination = destination.as_ref();

    if fs::symlink_metadata(source).is_err() {
        return Err(MoveError::SourceMissing(source.to_path_buf()));
    }
    if fs::symlink_metadata(destination).is_ok() {
        return Err(MoveError::DestinationExists(destination.to_path_buf()));
    }

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(io_err("create directory", parent))?;
    }

    match fs::hard_link(source, destination) {
        Ok(()) => finish_link(source, destination),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            Err(MoveError::DestinationExists(destination.to_path_buf()))
        }
        Err(e) if is_cross_device(&e) => copy_verify_delete(source, destination),
        Err(e) if links_unsupported(&e) => rename_checked(source, destination),
        Err(e) => Err(MoveError::Io {
            action: "move",
            path: source.to_path_buf(),
            source: e,
        }),
    }
}

/// Drop the source name once the destination name exists. If that fails the
/// destination name goes again, so the file stays exactly where it was.
fn finish_link(source: &Path, destination: &Path) -> std::result::Result<(), MoveError> {
    if let Err(e) = fs::remove_file(source) {
        let _ = fs::remove_file(destination);
        return Err(MoveError::Io {
            action: "move",
            path: source.to_path_buf(),
            source: e,
        });
    }
    sync_parent(destination);
    sync_parent(source);
    Ok(())
}

/// `rename` after re-checking the destination, for filesystems without links.
fn rename_checked(source: &Path, destination: &Path) -> std::result::Result<(), MoveError> {
    if fs::symlink_metadata(destination).is_ok() {
        return Err(MoveError::DestinationExists(destination.to_path_buf()));
    }
    fs::rename(source, destination).map_err(io_err("move", source))?;
    sync_parent(destination);
    Ok(())
}

/// Copy-then-delete fallback used when the move crosses devices.
pub(crate) fn copy_verify_delete(
    source: &Path,
    destination: &Path,
) -> std::result::Result<(), MoveError> {
    let expected = fs::metadata(source)
        .map_err(io_err("stat", source))?
        .len();

    let temp = temp_path_for(destination).map_err(|e| MoveError::Io {
        action: "name temporary copy for",
        path: destination.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidInput, e.to_string()),
    })?;

    let copied = fs::copy(source, &temp).map_err(io_err("copy", source))?;
    let synced = File::open(&temp).and_then(|f| f.sync_all());
    if copied != expected || synced.is_err() {
        let _ = fs::remove_file(&temp);
        return Err(MoveError::VerificationFailed {
            path: source.to_path_buf(),
            expected,
            copied,
        });
    }

    let placed = match fs::hard_link(&temp, destination) {
        Err(e) if links_unsupported(&e) => rename_checked(&temp, destination),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            Err(MoveError::DestinationExists(destination.to_path_buf()))
        }
        other => other.map_err(io_err("place copy at", destination)),
    };
    let _ = fs::remove_file(&temp);
    placed?;
    sync_parent(destination);

    // The file must end up in exactly one place.
    if let Err(e) = fs::remove_file(source) {
        let _ = fs::remove_file(destination);
        return Err(io_err("delete original", source)(e));
    }

    Ok(())
}

fn links_unsupported(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::Unsupported
        || matches!(err.raw_os_error(), Some(1) | Some(95))
}

fn is_cross_device(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::CrossesDevices || err.raw_os_error() == Some(18)
}
