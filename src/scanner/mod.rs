//! Scanner: walk roots and evaluate the rule set against every regular file.
//!
//! Scanning is read-only. Each root is walked by its own rayon worker with
//! siblings visited in file-name order, and the per-root results are joined in
//! the order the roots were given, so the same tree always yields the same
//! report. Symbolic links are neither followed nor reported.
//!
//! Excluded directories (reclaim's own state and quarantine) are pruned from
//! the walk wherever they sit under a root, so quarantined files are never
//! offered for cleaning again.

mod cancel;


pub use cancel::CancelToken;

use crate::candidate::{CandidateItem, Category, ScanReport};
use crate::error::{ReclaimError, Result};
use crate::rules::{EntryFacts, RuleSet};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use walkdir::{DirEntry, WalkDir};

/// Result of walking a single root.
struct RootScan {
    candidates: Vec<CandidateItem>,
    warnings: Vec<String>,
}

/// Scan `roots` for entries matching `rules`.
///
/// A root that is missing, not a directory, or unreadable fails the whole
/// scan with `ScanError`. Unreadable entries below a root become warnings.
/// Cancellation is checked before each directory is visited. Nothing inside
/// `excluded` is reported, and a root lying inside an excluded directory is
/// skipped with a warning.
pub fn scan(
    roots: &[PathBuf],
    rules: &RuleSet,
    excluded: &[PathBuf],
    cancel: &CancelToken,
) -> Result<ScanReport> {
    if roots.is_empty() {
        return Err(ReclaimError::UserError(
            "no scan roots given and none configured".to_string(),
        ));
    }
    cancel.check("scan")?;

    let results: Vec<Result<RootScan>> = roots
        .par_iter()
        .map(|root| scan_root(root, rules, excluded, cancel))
        .collect();

    // Report cancellation in preference to whatever else went wrong.
    cancel.check("scan")?;

    let mut report = ScanReport::default();
    let mut seen = HashSet::new();
    for result in results {
        let root_scan = result?;
        for candidate in root_scan.candidates {
            // Overlapping roots: the first root to discover a path keeps it.
            if seen.insert(candidate.path.clone()) {
                report.candidates.push(candidate);
            }
        }
        report.warnings.extend(root_scan.warnings);
    }

    tracing::info!(
        roots = roots.len(),
        candidates = report.candidates.len(),
        bytes = report.total_bytes(),
        warnings = report.warnings.len(),
        "scan finished"
    );
    Ok(report)
}

fn check_root(root: &Path) -> Result<PathBuf> {
    let root = std::path::absolute(root).map_err(|e| {
        ReclaimError::ScanError(format!("cannot resolve root '{}': {}", root.display(), e))
    })?;

    let metadata = fs::metadata(&root).map_err(|e| {
        ReclaimError::ScanError(format!("cannot access root '{}': {}", root.display(), e))
    })?;
    if !metadata.is_dir() {
        return Err(ReclaimError::ScanError(format!(
            "root '{}' is not a directory",
            root.display()
        )));
    }
    fs::read_dir(&root).map_err(|e| {
        ReclaimError::ScanError(format!("cannot read root '{}': {}", root.display(), e))
    })?;

    Ok(root)
}

/// Canonical form of `path`, or its absolute form when it cannot be resolved.
fn resolved(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Where each excluded directory appears under `root`, spelled the way the
/// walk will report it. `Err` names an excluded directory containing `root`.
fn pruned_under(root: &Path, excluded: &[PathBuf]) -> std::result::Result<Vec<PathBuf>, PathBuf> {
    let canonical_root = resolved(root);
    let mut pruned = Vec::new();
    for dir in excluded {
        let canonical = resolved(dir);
        if canonical_root.starts_with(&canonical) {
            return Err(dir.clone());
        }
        if let Ok(relative) = canonical.strip_prefix(&canonical_root) {
            pruned.push(root.join(relative));
        }
        if let Ok(absolute) = std::path::absolute(dir)
            && absolute.starts_with(root)
            && !pruned.contains(&absolute)
        {
            pruned.push(absolute);
        }
    }
    Ok(pruned)
}

fn scan_root(
    root: &Path,
    rules: &RuleSet,
    excluded: &[PathBuf],
    cancel: &CancelToken,
) -> Result<RootScan> {
    let root = check_root(root)?;
    tracing::debug!(root = %root.display(), "scanning root");

    let mut scan = RootScan {
        candidates: Vec::new(),
        warnings: Vec::new(),
    };
    let now = SystemTime::now();

    let pruned = match pruned_under(&root, excluded) {
        Ok(pruned) => pruned,
        Err(dir) => {
            warn(
                &mut scan,
                format!(
                    "skipped root '{}': it is inside reclaim's own directory '{}'",
                    root.display(),
                    dir.display()
                ),
            );
            return Ok(scan);
        }
    };

    let walker = WalkDir::new(&root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let keep = !pruned.iter().any(|dir| entry.path() == dir);
            if !keep {
                tracing::debug!(path = %entry.path().display(), "skipping excluded directory");
            }
            keep
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(&root).to_path_buf();
                let reason = e
                    .io_error()
                    .map_or_else(|| e.to_string(), |io| io.to_string());
                warn(&mut scan, format!("skipped '{}': {}", path.display(), reason));
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            cancel.check("scan")?;
            continue;
        }
        if file_type.is_symlink() {
            tracing::debug!(path = %entry.path().display(), "skipping symlink");
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        match evaluate(&root, &entry, rules, now) {
            Ok(Some(candidate)) => {
                tracing::debug!(
                    path = %candidate.path.display(),
                    rule = %candidate.matched_rule,
                    size = candidate.size,
                    "candidate"
                );
                scan.candidates.push(candidate);
            }
            Ok(None) => {}
            Err(reason) => warn(
                &mut scan,
                format!("skipped '{}': {}", entry.path().display(), reason),
            ),
        }
    }

    Ok(scan)
}

fn warn(scan: &mut RootScan, message: String) {
    tracing::warn!("{}", message);
    scan.warnings.push(message);
}

/// Evaluate one regular file. `Err` carries the reason it could not be read.
fn evaluate(
    root: &Path,
    entry: &DirEntry,
    rules: &RuleSet,
    now: SystemTime,
) -> std::result::Result<Option<CandidateItem>, String> {
    let metadata = entry.metadata().map_err(|e| {
        e.io_error()
            .map_or_else(|| e.to_string(), |io| io.to_string())
    })?;

    let path = entry.path();
    let relative = path.strip_prefix(root).unwrap_or(path);
    let modified = metadata.modified().ok();
    let age = modified
        .and_then(|m| now.duration_since(m).ok())
        .unwrap_or(Duration::ZERO);

    let facts = EntryFacts {
        path,
        relative,
        size: metadata.len(),
        age,
        inferred: Category::infer(path),
    };

    let Some(rule) = rules.best_match(&facts) else {
        return Ok(None);
    };

    Ok(Some(CandidateItem {
        path: path.to_path_buf(),
        size: facts.size,
        category: rule.category_for(&facts),
        matched_rule: rule.name.clone(),
        risk_level: rule.risk,
        root: root.to_path_buf(),
        modified_at: modified.map(DateTime::<Utc>::from),
    }))
}
