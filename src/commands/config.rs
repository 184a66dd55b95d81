//! `reclaim config show` and `reclaim config validate`.

use crate::config::FailurePolicy;
use crate::context::AppContext;
use crate::error::Result;
use crate::rules::RuleSpec;
use serde::Serialize;
use std::path::PathBuf;

/// Effective configuration with every path resolved.
#[derive(Debug, Serialize)]
pub struct ConfigView {
    pub config_path: PathBuf,
    pub config_exists: bool,
    pub roots: Vec<PathBuf>,
    pub quarantine_dir: PathBuf,
    pub clean_failure_policy: FailurePolicy,
    pub ignore_patterns: Vec<String>,
    pub lock_stale_minutes: u32,
    pub rules: Vec<RuleSpec>,
}

#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_count: Option<usize>,
}

pub fn show(ctx: &AppContext) -> Result<ConfigView> {
    let config = ctx.load_config()?;
    let config_path = ctx.config_path();

    Ok(ConfigView {
        config_exists: config_path.exists(),
        config_path,
        roots: config.resolved_roots(ctx.home.as_deref()),
        quarantine_dir: ctx.quarantine_dir(&config),
        clean_failure_policy: config.clean_failure_policy,
        ignore_patterns: config.ignore_patterns,
        lock_stale_minutes: config.lock_stale_minutes,
        rules: config.rules,
    })
}

/// Validation problems are reported in the payload, not as an error exit.
pub fn validate(ctx: &AppContext) -> ValidationReport {
    match ctx.load_config() {
        Ok(config) => ValidationReport {
            valid: true,
            message: "Configuration is valid".to_string(),
            rule_count: Some(config.rules.len()),
            root_count: Some(config.roots.len()),
        },
        Err(e) => {
            tracing::warn!("{}", e);
            ValidationReport {
                valid: false,
                message: e.to_string(),
                rule_count: None,
                root_count: None,
            }
        }
    }
}
