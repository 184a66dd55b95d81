//! Configuration types and defaults for reclaim.

use crate::candidate::{Category, RiskLevel};
use crate::rules::{Quantity, RuleSpec};
use serde::{Deserialize, Serialize};

/// What the cleaner does when one item of a selection cannot be moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Move every already quarantined item back and mark the record
    /// `failed_partial` (default).
    #[default]
    Rollback,
    /// Skip the failing item, keep going, and report it as a warning.
    BestEffort,
}

/// Default scan roots (`~` expands to `$HOME`).
pub fn default_roots() -> Vec<String> {
    vec!["~/Downloads".to_string(), "~/Desktop".to_string()]
}

/// Default global exclusions.
pub fn default_ignore_patterns() -> Vec<String> {
    vec![".DS_Store".to_string(), "~$*".to_string()]
}

pub fn default_quarantine_dir() -> String {
    "quarantine".to_string()
}

pub fn default_lock_stale_minutes() -> u32 {
    120
}

fn rule(
    name: &str,
    pattern: Option<&str>,
    category: Option<Category>,
    risk: RiskLevel,
    older_than: Option<&str>,
) -> RuleSpec {
    RuleSpec {
        name: name.to_string(),
        category,
        risk,
        enabled: true,
        pattern: pattern.map(str::to_string),
        min_size: None,
        max_size: None,
        older_than: older_than.map(|s| Quantity::Text(s.to_string())),
        when_category: None,
    }
}

/// Default rule set written by `reclaim init`.
pub fn default_rules() -> Vec<RuleSpec> {
    let mut cache = rule(
        "stale-cache",
        None,
        Some(Category::Cache),
        RiskLevel::Caution,
        Some("30d"),
    );
    cache.when_category = Some(Category::Cache);

    vec![
        rule(
            "temp-files",
            Some("*.{tmp,temp}"),
            Some(Category::Temp),
            RiskLevel::Safe,
            Some("1d"),
        ),
        rule(
            "partial-downloads",
            Some("*.{part,crdownload}"),
            Some(Category::Temp),
            RiskLevel::Safe,
            Some("7d"),
        ),
        rule(
            "editor-swap",
            Some("*.swp"),
            Some(Category::Temp),
            RiskLevel::Caution,
            Some("1d"),
        ),
        rule(
            "old-logs",
            Some("*.log"),
            Some(Category::Log),
            RiskLevel::Safe,
            Some("14d"),
        ),
        rule(
            "copy-duplicates",
            Some("* (1).*"),
            Some(Category::Duplicate),
            RiskLevel::Dangerous,
            None,
        ),
        cache,
    ]
}
