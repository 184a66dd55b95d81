//! Config loading, validation, and resolution helpers.

use super::model::Config;
use crate::error::{ReclaimError, Result};
use crate::rules::{RuleOverrides, RuleSet, apply_overrides};
use std::path::{Path, PathBuf};

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            ReclaimError::ConfigError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config from a YAML file, falling back to defaults when the file
    /// does not exist. An existing but invalid file is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes as unit; treat it as "all defaults".
        let config: Config = if yaml.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| {
                ReclaimError::ConfigError(format!("failed to parse config YAML: {}", e))
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            ReclaimError::ConfigError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `lock_stale_minutes` must be positive
    /// - `quarantine_dir` must be non-empty
    /// - rules and ignore patterns must compile (unique non-empty names,
    ///   at least one criterion, valid globs, sizes and ages)
    pub fn validate(&self) -> Result<()> {
        if self.lock_stale_minutes == 0 {
            return Err(ReclaimError::ConfigError(
                "lock_stale_minutes must be greater than 0".to_string(),
            ));
        }

        if self.quarantine_dir.trim().is_empty() {
            return Err(ReclaimError::ConfigError(
                "quarantine_dir must be non-empty".to_string(),
            ));
        }

        // Disabled rules are validated too, so enabling one later cannot fail.
        let mut all_enabled = self.rules.clone();
        for spec in &mut all_enabled {
            spec.enabled = true;
        }
        RuleSet::compile(&all_enabled, &self.ignore_patterns)?;

        Ok(())
    }

    /// Compile the rule set for one scan, applying optional overrides.
    pub fn rule_set(&self, overrides: Option<&RuleOverrides>) -> Result<RuleSet> {
        match overrides {
            Some(overrides) => {
                let specs = apply_overrides(&self.rules, overrides)?;
                RuleSet::compile(&specs, &self.ignore_patterns)
            }
            None => RuleSet::compile(&self.rules, &self.ignore_patterns),
        }
    }

    /// Configured roots with `~` expanded against `home`.
    pub fn resolved_roots(&self, home: Option<&Path>) -> Vec<PathBuf> {
        self.roots
            .iter()
            .map(|root| expand_home(root, home))
            .collect()
    }

    /// Absolute quarantine directory for the given state dir.
    pub fn quarantine_path(&self, state_dir: &Path, home: Option<&Path>) -> PathBuf {
        let path = expand_home(&self.quarantine_dir, home);
        if path.is_absolute() {
            path
        } else {
            state_dir.join(path)
        }
    }
}

/// Expand a leading `~` or `~/` using `home`; other paths pass through.
pub(crate) fn expand_home(path: &str, home: Option<&Path>) -> PathBuf {
    match (path, home) {
        ("~", Some(home)) => home.to_path_buf(),
        (p, Some(home)) if p.starts_with("~/") => home.join(&p[2..]),
        (p, _) => PathBuf::from(p),
    }
}
