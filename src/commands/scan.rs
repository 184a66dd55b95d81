//! `reclaim scan`: report cleanup candidates without touching anything.

use super::parse_overrides;
use crate::candidate::ScanReport;
use crate::cli::ScanArgs;
use crate::config::Config;
use crate::context::AppContext;
use crate::error::Result;
use crate::scanner::{CancelToken, scan};
use std::path::PathBuf;

pub fn run(ctx: &AppContext, args: &ScanArgs, cancel: &CancelToken) -> Result<ScanReport> {
    let config = ctx.load_config()?;
    let overrides = parse_overrides(args.overrides.as_deref())?;
    let rules = config.rule_set(overrides.as_ref())?;
    let roots = scan_roots(ctx, &config, &args.roots)?;

    tracing::debug!(roots = ?roots, rules = rules.rules().len(), "scanning");
    scan(&roots, &rules, &ctx.protected_dirs(&config), cancel)
}

/// Requested roots made absolute, or the configured roots when none are given.
pub(crate) fn scan_roots(
    ctx: &AppContext,
    config: &Config,
    requested: &[PathBuf],
) -> Result<Vec<PathBuf>> {
    let roots = if requested.is_empty() {
        config.resolved_roots(ctx.home.as_deref())
    } else {
        requested.to_vec()
    };
    roots
        .iter()
        .map(|root| ctx.absolute_path(root))
        .collect()
}
