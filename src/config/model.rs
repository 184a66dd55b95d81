//! Config struct definition and default implementation.

use super::types::*;
use crate::rules::RuleSpec;
use serde::{Deserialize, Serialize};

/// Configuration for reclaim.
///
/// This struct represents the contents of `.reclaim/config.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Scan settings
    // =========================================================================
    /// Directories scanned when a request names no roots.
    #[serde(default = "default_roots")]
    pub roots: Vec<String>,

    /// Globs excluded from every scan (matched against file name and
    /// root-relative path).
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,

    /// Ordered rule declarations.
    #[serde(default = "default_rules")]
    pub rules: Vec<RuleSpec>,

    // =========================================================================
    // Clean settings
    // =========================================================================
    /// Quarantine location; relative paths are resolved against the state dir.
    #[serde(default = "default_quarantine_dir")]
    pub quarantine_dir: String,

    /// Behaviour when an item of a clean cannot be moved.
    #[serde(default)]
    pub clean_failure_policy: FailurePolicy,

    // =========================================================================
    // Lock settings
    // =========================================================================
    /// Minutes after which a lock is considered stale.
    #[serde(default = "default_lock_stale_minutes")]
    pub lock_stale_minutes: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            roots: default_roots(),
            ignore_patterns: default_ignore_patterns(),
            rules: default_rules(),
            quarantine_dir: default_quarantine_dir(),
            clean_failure_policy: FailurePolicy::default(),
            lock_stale_minutes: default_lock_stale_minutes(),
        }
    }
}
