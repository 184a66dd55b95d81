//! Exit code constants for the reclaim CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid config)
//! - 2: Scan failure (inaccessible root, cancellation)
//! - 3: Quarantine failure
//! - 4: Operation state error (unknown id, already undone, not undoable)
//! - 5: Restore failure
//! - 6: History store failure
//! - 7: Lock acquisition failure

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid request, or invalid configuration.
pub const USER_ERROR: i32 = 1;

/// Scan failure: a root could not be traversed, or the scan was cancelled.
pub const SCAN_FAILURE: i32 = 2;

/// The quarantine area could not be written.
pub const QUARANTINE_FAILURE: i32 = 3;

/// The target operation record is unknown or in the wrong state.
pub const OPERATION_STATE: i32 = 4;

/// Quarantined items could not be moved back.
pub const RESTORE_FAILURE: i32 = 5;

/// The history log could not be read or written.
pub const HISTORY_FAILURE: i32 = 6;

/// Lock acquisition failure: a root or history lock could not be acquired.
pub const LOCK_FAILURE: i32 = 7;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            SUCCESS,
            USER_ERROR,
            SCAN_FAILURE,
            QUARANTINE_FAILURE,
            OPERATION_STATE,
            RESTORE_FAILURE,
            HISTORY_FAILURE,
            LOCK_FAILURE,
        ];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }

    #[test]
    fn success_is_zero() {
        assert_eq!(SUCCESS, 0);
    }
}
