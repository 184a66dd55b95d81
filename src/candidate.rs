//! Scan results: candidate items and the report that carries them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// What kind of removable data an item is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Cache,
    Log,
    Temp,
    Duplicate,
    #[default]
    Other,
}

/// Directory names that mark everything beneath them as cache data.
const CACHE_DIR_NAMES: &[&str] = &["cache", "caches", ".cache", "__pycache__", ".gradle"];
const TEMP_DIR_NAMES: &[&str] = &["tmp", "temp", ".tmp"];
const LOG_EXTENSIONS: &[&str] = &["log", "trace"];
const TEMP_EXTENSIONS: &[&str] = &["tmp", "temp", "bak", "swp", "part", "crdownload"];

impl Category {
    /// Infer a category from a path using extension and directory heuristics.
    ///
    /// Extensions win over directory names, so `cache/run.log` is a log.
    /// Duplicates cannot be recognised from a path alone; a rule has to tag
    /// them explicitly.
    pub fn infer(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        if let Some(ext) = ext.as_deref() {
            if LOG_EXTENSIONS.contains(&ext) {
                return Category::Log;
            }
            if TEMP_EXTENSIONS.contains(&ext) {
                return Category::Temp;
            }
        }

        let parent = path.parent().unwrap_or(Path::new(""));
        let mut category = Category::Other;
        for component in parent.components() {
            if let Component::Normal(name) = component {
                let name = name.to_string_lossy().to_ascii_lowercase();
                if CACHE_DIR_NAMES.contains(&name.as_str()) {
                    return Category::Cache;
                }
                if TEMP_DIR_NAMES.contains(&name.as_str()) {
                    category = Category::Temp;
                }
                if name == "logs" && category == Category::Other {
                    category = Category::Log;
                }
            }
        }
        category
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Category::Cache => "cache",
            Category::Log => "log",
            Category::Temp => "temp",
            Category::Duplicate => "duplicate",
            Category::Other => "other",
        };
        f.write_str(s)
    }
}

/// How risky removing an item is judged to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Safe,
    Caution,
    Dangerous,
}

/// A filesystem entry eligible for removal under the current rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateItem {
    /// Absolute path of the file.
    pub path: PathBuf,

    /// Size in bytes at scan time.
    pub size: u64,

    pub category: Category,

    /// Name of the most specific rule that matched.
    pub matched_rule: String,

    pub risk_level: RiskLevel,

    /// Scan root the item was discovered under.
    pub root: PathBuf,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

/// Result of one scan invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanReport {
    /// Candidates in discovery order; contiguous per root, roots in request order.
    pub candidates: Vec<CandidateItem>,

    /// Non-fatal problems such as unreadable entries.
    pub warnings: Vec<String>,
}

impl ScanReport {
    /// Total bytes across all candidates.
    pub fn total_bytes(&self) -> u64 {
        self.candidates.iter().map(|c| c.size).sum()
    }
}
