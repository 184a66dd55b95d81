//! Error types for reclaim.
//!
//! Uses thiserror for derive macros. Every variant carries a human-readable
//! message and maps to a stable kind string and an exit code, so front ends
//! can report failures without inspecting message text.

use crate::exit_codes;
use serde::Serialize;
use thiserror::Error;

/// Main error type for reclaim operations.
#[derive(Error, Debug)]
pub enum ReclaimError {
    /// Invalid arguments or an invalid request (empty selection, bad overrides).
    #[error("{0}")]
    UserError(String),

    /// Configuration could not be read or failed validation.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// A scan root is wholly inaccessible.
    #[error("Scan failed: {0}")]
    ScanError(String),

    /// The operation was cancelled before it mutated anything.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// The quarantine area could not be written.
    #[error("Quarantine unavailable: {0}")]
    QuarantineError(String),

    /// No operation record exists with the requested id.
    #[error("Operation not found: {0}")]
    NotFoundError(String),

    /// The operation record has already been undone.
    #[error("Operation already undone: {0}")]
    AlreadyUndoneError(String),

    /// A status transition that the record state machine forbids.
    #[error("Invalid operation state: {0}")]
    InvalidStateError(String),

    /// No quarantined item could be moved back.
    #[error("Restore failed: {0}")]
    RestoreError(String),

    /// The history log could not be read or written.
    #[error("History store failure: {0}")]
    HistoryError(String),

    /// Lock could not be acquired.
    #[error("Lock acquisition failed: {0}")]
    LockError(String),
}

impl ReclaimError {
    /// Stable, machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ReclaimError::UserError(_) => "UserError",
            ReclaimError::ConfigError(_) => "ConfigError",
            ReclaimError::ScanError(_) => "ScanError",
            ReclaimError::Cancelled(_) => "Cancelled",
            ReclaimError::QuarantineError(_) => "QuarantineError",
            ReclaimError::NotFoundError(_) => "NotFoundError",
            ReclaimError::AlreadyUndoneError(_) => "AlreadyUndoneError",
            ReclaimError::InvalidStateError(_) => "InvalidStateError",
            ReclaimError::RestoreError(_) => "RestoreError",
            ReclaimError::HistoryError(_) => "HistoryError",
            ReclaimError::LockError(_) => "LockError",
        }
    }

    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ReclaimError::UserError(_) | ReclaimError::ConfigError(_) => exit_codes::USER_ERROR,
            ReclaimError::ScanError(_) | ReclaimError::Cancelled(_) => exit_codes::SCAN_FAILURE,
            ReclaimError::QuarantineError(_) => exit_codes::QUARANTINE_FAILURE,
            ReclaimError::NotFoundError(_)
            | ReclaimError::AlreadyUndoneError(_)
            | ReclaimError::InvalidStateError(_) => exit_codes::OPERATION_STATE,
            ReclaimError::RestoreError(_) => exit_codes::RESTORE_FAILURE,
            ReclaimError::HistoryError(_) => exit_codes::HISTORY_FAILURE,
            ReclaimError::LockError(_) => exit_codes::LOCK_FAILURE,
        }
    }

    /// Serializable error body for front ends.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: ErrorDetail {
                kind: self.kind(),
                message: self.to_string(),
            },
        }
    }
}

/// Wire shape of a fatal error: `{"error": {"kind": ..., "message": ...}}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub kind: &'static str,
    pub message: String,
}

/// Result type alias for reclaim operations.
pub type Result<T> = std::result::Result<T, ReclaimError>;
