//! `reclaim clean`: quarantine the requested candidates.
//!
//! Paths are never trusted as-is: the roots containing them are re-scanned
//! with the current rules and only paths that are still candidates are moved.

use super::parse_overrides;
use super::scan::scan_roots;
use crate::cleaner::{CleanOutcome, Cleaner, select};
use crate::cli::CleanArgs;
use crate::config::FailurePolicy;
use crate::context::AppContext;
use crate::error::{ReclaimError, Result};
use crate::history::HistoryStore;
use crate::scanner::{CancelToken, scan};
use std::path::PathBuf;

pub fn run(ctx: &AppContext, args: &CleanArgs, cancel: &CancelToken) -> Result<CleanOutcome> {
    let config = ctx.load_config()?;
    let overrides = parse_overrides(args.overrides.as_deref())?;
    let rules = config.rule_set(overrides.as_ref())?;

    let paths = args
        .paths
        .iter()
        .map(|p| ctx.absolute_path(p))
        .collect::<Result<Vec<PathBuf>>>()?;

    let roots: Vec<PathBuf> = scan_roots(ctx, &config, &args.roots)?
        .into_iter()
        .filter(|root| paths.iter().any(|p| p.starts_with(root)))
        .collect();
    if roots.is_empty() {
        return Err(ReclaimError::UserError(
            "none of the requested paths is under a scan root; pass --root".to_string(),
        ));
    }

    let report = scan(&roots, &rules, &ctx.protected_dirs(&config), cancel)?;
    let (selected, mut warnings) = select(&report.candidates, &paths);
    if selected.is_empty() {
        return Err(ReclaimError::UserError(format!(
            "nothing to clean: {}",
            warnings.join("; ")
        )));
    }
    for warning in &warnings {
        tracing::warn!("{}", warning);
    }

    let policy = if args.best_effort {
        FailurePolicy::BestEffort
    } else {
        config.clean_failure_policy
    };

    let history = HistoryStore::open(ctx);
    let cleaner = Cleaner::new(ctx, &history, ctx.quarantine_dir(&config));
    let mut outcome = cleaner.clean(&selected, policy, cancel)?;

    warnings.append(&mut outcome.warnings);
    outcome.warnings = warnings;
    Ok(outcome)
}
