//! Tests for config functionality.

use super::operations::expand_home;
use crate::candidate::Category;
use crate::config::types::{default_ignore_patterns, default_rules};
use crate::config::{Config, FailurePolicy};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.roots, vec!["~/Downloads", "~/Desktop"]);
    assert_eq!(config.ignore_patterns, default_ignore_patterns());
    assert_eq!(config.quarantine_dir, "quarantine");
    assert_eq!(config.clean_failure_policy, FailurePolicy::Rollback);
    assert_eq!(config.lock_stale_minutes, 120);
    assert_eq!(config.rules.len(), default_rules().len());
    config.validate().unwrap();
}

#[test]
fn test_parse_minimal_yaml() {
    let config = Config::from_yaml("").unwrap();

    assert_eq!(config.quarantine_dir, "quarantine");
    assert!(!config.rules.is_empty());
}

#[test]
fn test_parse_partial_yaml() {
    let yaml = r#"
roots: ["/tmp/work"]
clean_failure_policy: best_effort
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.roots, vec!["/tmp/work"]);
    assert_eq!(config.clean_failure_policy, FailurePolicy::BestEffort);
    // Unspecified values keep their defaults
    assert_eq!(config.lock_stale_minutes, 120);
    assert_eq!(config.rules.len(), default_rules().len());
}

#[test]
fn test_parse_full_yaml() {
    let yaml = r#"
roots:
  - /srv/scratch
ignore_patterns:
  - "*.keep"
quarantine_dir: /var/quarantine
clean_failure_policy: rollback
lock_stale_minutes: 30
rules:
  - name: temp-files
    category: temp
    risk: safe
    pattern: "*.tmp"
    older_than: 0
  - name: big-logs
    risk: caution
    pattern: "*.log"
    min_size: 10MB
    enabled: false
  - name: cache
    when_category: cache
    older_than: 30d
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.ignore_patterns, vec!["*.keep"]);
    assert_eq!(config.quarantine_dir, "/var/quarantine");
    assert_eq!(config.lock_stale_minutes, 30);
    assert_eq!(config.rules.len(), 3);
    assert_eq!(config.rules[0].category, Some(Category::Temp));
    assert!(!config.rules[1].enabled);
    assert_eq!(config.rules[2].when_category, Some(Category::Cache));

    // Disabled rules are not compiled into the rule set.
    let rules = config.rule_set(None).unwrap();
    assert_eq!(rules.rules().len(), 2);
}

#[test]
fn test_unknown_fields_ignored() {
    let yaml = r#"
lock_stale_minutes: 10
future_setting: true
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.lock_stale_minutes, 10);
}

#[test]
fn test_validation_rejects_zero_stale_minutes() {
    let err = Config::from_yaml("lock_stale_minutes: 0").unwrap_err();
    assert!(err.to_string().contains("lock_stale_minutes"));
}

#[test]
fn test_validation_rejects_bad_rules_even_when_disabled() {
    let yaml = r#"
rules:
  - name: broken
    enabled: false
    min_size: "lots"
"#;
    assert!(Config::from_yaml(yaml).is_err());

    let yaml = r#"
rules:
  - name: nothing
"#;
    let err = Config::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("no criteria"));
}

#[test]
fn test_validation_rejects_invalid_ignore_glob() {
    let yaml = r#"
ignore_patterns: ["[oops"]
"#;
    assert!(Config::from_yaml(yaml).is_err());
}

#[test]
fn test_yaml_roundtrip_keeps_rules() {
    let config = Config::default();
    let yaml = config.to_yaml().unwrap();
    let parsed = Config::from_yaml(&yaml).unwrap();

    assert_eq!(parsed.rules, config.rules);
    assert_eq!(parsed.roots, config.roots);
}

#[test]
fn test_load_or_default_missing_file() {
    let temp = TempDir::new().unwrap();
    let config = Config::load_or_default(temp.path().join("config.yaml")).unwrap();
    assert_eq!(config.quarantine_dir, "quarantine");
}

#[test]
fn test_load_reports_invalid_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.yaml");
    std::fs::write(&path, "roots: {not: a list}").unwrap();

    let err = Config::load_or_default(&path).unwrap_err();
    assert_eq!(err.kind(), "ConfigError");
}

#[test]
fn test_rule_set_applies_overrides() {
    let config = Config::default();
    let overrides = serde_json::from_str(r#"{"old-logs": {"enabled": false}}"#).unwrap();

    let base = config.rule_set(None).unwrap();
    let adjusted = config.rule_set(Some(&overrides)).unwrap();
    assert_eq!(adjusted.rules().len(), base.rules().len() - 1);
    assert!(adjusted.rules().iter().all(|r| r.name != "old-logs"));
}

#[test]
fn test_expand_home_and_quarantine_path() {
    let home = Path::new("/home/u");
    assert_eq!(expand_home("~", Some(home)), PathBuf::from("/home/u"));
    assert_eq!(
        expand_home("~/Downloads", Some(home)),
        PathBuf::from("/home/u/Downloads")
    );
    assert_eq!(expand_home("~/Downloads", None), PathBuf::from("~/Downloads"));
    assert_eq!(expand_home("/abs", Some(home)), PathBuf::from("/abs"));

    let mut config = Config::default();
    let state = Path::new("/state");
    assert_eq!(
        config.quarantine_path(state, Some(home)),
        PathBuf::from("/state/quarantine")
    );
    config.quarantine_dir = "/elsewhere/q".to_string();
    assert_eq!(
        config.quarantine_path(state, Some(home)),
        PathBuf::from("/elsewhere/q")
    );
}

#[test]
fn test_failure_policy_spellings() {
    let config = Config::from_yaml("clean_failure_policy: best_effort\n").unwrap();
    assert_eq!(config.clean_failure_policy, FailurePolicy::BestEffort);
    let config = Config::from_yaml("clean_failure_policy: rollback\n").unwrap();
    assert_eq!(config.clean_failure_policy, FailurePolicy::Rollback);
    assert!(Config::from_yaml("clean_failure_policy: yolo\n").is_err());
}
