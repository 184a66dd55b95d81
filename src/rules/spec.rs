//! Serde-facing rule declarations and per-scan overrides.

use crate::candidate::{Category, RiskLevel};
use crate::error::{ReclaimError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A size or age bound as written in YAML/JSON: either a bare number or a
/// string with a unit (`"10MB"`, `"7d"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Number(u64),
    Text(String),
}

impl Quantity {
    /// Byte count, using [`super::parse_size`] for text values.
    pub fn to_bytes(&self) -> Result<u64> {
        match self {
            Quantity::Number(n) => Ok(*n),
            Quantity::Text(s) => super::parse_size(s),
        }
    }

    /// Duration, using [`super::parse_age`] for text values (bare numbers are seconds).
    pub fn to_duration(&self) -> Result<std::time::Duration> {
        match self {
            Quantity::Number(n) => Ok(std::time::Duration::from_secs(*n)),
            Quantity::Text(s) => super::parse_age(s),
        }
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Quantity::Number(n) => write!(f, "{}", n),
            Quantity::Text(s) => f.write_str(s),
        }
    }
}

fn default_true() -> bool {
    true
}

/// One rule as declared in `config.yaml`.
///
/// Every criterion field is optional, but a rule needs at least one of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub name: String,

    /// Category assigned to matches; inferred from the path when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,

    #[serde(default)]
    pub risk: RiskLevel,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Glob; without a `/` it is matched against the file name only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_size: Option<Quantity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<Quantity>,

    /// Minimum age since last modification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub older_than: Option<Quantity>,

    /// Only match entries whose inferred category is this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when_category: Option<Category>,
}

impl RuleSpec {
    /// A rule that matches files by glob only.
    pub fn pattern(name: &str, pattern: &str) -> Self {
        Self {
            name: name.to_string(),
            category: None,
            risk: RiskLevel::Safe,
            enabled: true,
            pattern: Some(pattern.to_string()),
            min_size: None,
            max_size: None,
            older_than: None,
            when_category: None,
        }
    }

    pub fn has_criteria(&self) -> bool {
        self.pattern.is_some()
            || self.min_size.is_some()
            || self.max_size.is_some()
            || self.older_than.is_some()
            || self.when_category.is_some()
    }
}

/// Per-scan adjustment of a named rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleOverride {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub min_size: Option<Quantity>,
    #[serde(default)]
    pub max_size: Option<Quantity>,
    #[serde(default)]
    pub older_than: Option<Quantity>,
}

/// Overrides keyed by rule name, as sent with a scan request.
pub type RuleOverrides = BTreeMap<String, RuleOverride>;

/// Apply overrides to a copy of the declared rules.
///
/// Naming a rule that does not exist is a user error so typos do not
/// silently widen or narrow a scan.
pub fn apply_overrides(specs: &[RuleSpec], overrides: &RuleOverrides) -> Result<Vec<RuleSpec>> {
    for name in overrides.keys() {
        if !specs.iter().any(|s| &s.name == name) {
            return Err(ReclaimError::UserError(format!(
                "rule override refers to unknown rule '{}'",
                name
            )));
        }
    }

    Ok(specs
        .iter()
        .map(|spec| {
            let mut spec = spec.clone();
            if let Some(o) = overrides.get(&spec.name) {
                if let Some(enabled) = o.enabled {
                    spec.enabled = enabled;
                }
                if o.min_size.is_some() {
                    spec.min_size = o.min_size.clone();
                }
                if o.max_size.is_some() {
                    spec.max_size = o.max_size.clone();
                }
                if o.older_than.is_some() {
                    spec.older_than = o.older_than.clone();
                }
            }
            spec
        })
        .collect())
}
