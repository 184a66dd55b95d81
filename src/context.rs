//! State directory resolution for reclaim.
//!
//! All durable state lives under one directory (default `./.reclaim/`):
//!
//! ```text
//! .reclaim/
//! ├── config.yaml
//! ├── history/
//! │   ├── operations.ndjson
//! │   └── next_id
//! ├── locks/
//! └── quarantine/          (unless config points elsewhere)
//!     └── op-000001/
//! ```
//!
//! Every command resolves an [`AppContext`] first and derives paths from it,
//! so the history, locks and quarantine always agree on where they live.

use crate::config::Config;
use crate::error::{ReclaimError, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Default state directory name, relative to the working directory.
pub const DEFAULT_STATE_DIR: &str = ".reclaim";

/// Environment variable overriding the state directory.
pub const STATE_DIR_ENV: &str = "RECLAIM_HOME";

/// Resolved paths for reclaim state. All paths are absolute.
#[derive(Debug, Clone)]
pub struct AppContext {
    /// Root of all reclaim state.
    pub state_dir: PathBuf,

    /// Directory holding the history log and id counter.
    pub history_dir: PathBuf,

    /// Directory holding lock files.
    pub locks_dir: PathBuf,

    /// Home directory used for `~` expansion, if known.
    pub home: Option<PathBuf>,
}

impl AppContext {
    /// Resolve the context from an explicit directory, `RECLAIM_HOME`, or
    /// `./.reclaim`, in that order.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(dir) = explicit {
            return Self::at(dir);
        }
        if let Ok(dir) = env::var(STATE_DIR_ENV)
            && !dir.is_empty()
        {
            return Self::at(dir);
        }

        let cwd = env::current_dir().map_err(|e| {
            ReclaimError::UserError(format!("failed to get current working directory: {}", e))
        })?;
        Self::at(cwd.join(DEFAULT_STATE_DIR))
    }

    /// Build a context rooted at `state_dir`.
    pub fn at<P: AsRef<Path>>(state_dir: P) -> Result<Self> {
        let state_dir = absolutize(state_dir.as_ref())?;
        let home = env::var_os("HOME")
            .or_else(|| env::var_os("USERPROFILE"))
            .map(PathBuf::from);

        Ok(Self {
            history_dir: state_dir.join("history"),
            locks_dir: state_dir.join("locks"),
            state_dir,
            home,
        })
    }

    /// Path to config.yaml.
    pub fn config_path(&self) -> PathBuf {
        self.state_dir.join("config.yaml")
    }

    /// Path to the NDJSON operation log.
    pub fn history_log_path(&self) -> PathBuf {
        self.history_dir.join("operations.ndjson")
    }

    /// Path to the next-id counter file.
    pub fn next_id_path(&self) -> PathBuf {
        self.history_dir.join("next_id")
    }

    /// Path to the lock serializing history writes.
    pub fn history_lock_path(&self) -> PathBuf {
        self.locks_dir.join("history.lock")
    }

    /// Path to the lock guarding clean/undo for one scan root.
    pub fn root_lock_path(&self, root: &Path) -> PathBuf {
        self.locks_dir
            .join(format!("root-{}.lock", root_lock_slug(root)))
    }

    /// Load the config, falling back to defaults when none has been written.
    pub fn load_config(&self) -> Result<Config> {
        Config::load_or_default(self.config_path())
    }

    /// Absolute quarantine directory for the given config.
    pub fn quarantine_dir(&self, config: &Config) -> PathBuf {
        config.quarantine_path(&self.state_dir, self.home.as_deref())
    }

    /// Directories reclaim writes to, which a scan must never descend into.
    pub fn protected_dirs(&self, config: &Config) -> Vec<PathBuf> {
        vec![self.state_dir.clone(), self.quarantine_dir(config)]
    }

    /// Make a user-supplied path absolute against the working directory.
    pub fn absolute_path(&self, path: &Path) -> Result<PathBuf> {
        absolutize(path)
    }
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = env::current_dir().map_err(|e| {
        ReclaimError::UserError(format!("failed to get current working directory: {}", e))
    })?;
    Ok(cwd.join(path))
}

/// Filesystem-safe lock name for a root path.
///
/// Alphanumerics are kept, everything else collapses to single hyphens:
/// `/home/u/Downloads` becomes `home-u-downloads`.
pub(crate) fn root_lock_slug(root: &Path) -> String {
    let mut result = String::new();
    let mut last_was_hyphen = true;

    for c in root.to_string_lossy().chars() {
        if c.is_ascii_alphanumeric() {
            result.push(c.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            result.push('-');
            last_was_hyphen = true;
        }
    }

    if result.ends_with('-') {
        result.pop();
    }
    if result.is_empty() {
        result.push_str("fs-root");
    }
    result
}
