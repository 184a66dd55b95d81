//! CLI argument parsing for reclaim.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Reclaim: reversible, audited filesystem cleanup.
///
/// Files matched by the configured rules are moved into a per-operation
/// quarantine instead of being deleted, every clean is recorded in a durable
/// history, and any applied clean can be undone by id.
///
/// All results are printed to stdout as JSON; logs and errors go to stderr.
#[derive(Parser, Debug)]
#[command(name = "reclaim")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// State directory (default: $RECLAIM_HOME, then ./.reclaim).
    #[arg(long, global = true, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    /// Log debug details to stderr (overrides RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for reclaim.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the state directory and write the default config.
    ///
    /// An existing config.yaml is never overwritten.
    Init,

    /// Show or validate the configuration.
    Config(ConfigCommand),

    /// Find cleanup candidates without changing anything.
    ///
    /// Scans the given roots, or the configured roots when none are given.
    Scan(ScanArgs),

    /// Move the given candidate paths into quarantine.
    ///
    /// The paths are re-scanned first; paths that are not current
    /// candidates are skipped with a warning.
    Clean(CleanArgs),

    /// Restore the files of an applied clean, by id or the newest one.
    Undo(UndoArgs),

    /// List recorded operations, oldest first.
    History(HistoryArgs),

    /// Lock management commands.
    ///
    /// List or clear root and history locks.
    Lock(LockCommand),
}

/// Config subcommands.
#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration.
    Show,

    /// Check that the configuration loads and all rules compile.
    Validate,
}

/// Arguments for the `scan` command.
#[derive(Parser, Debug)]
pub struct ScanArgs {
    /// Directories to scan (default: configured roots).
    pub roots: Vec<PathBuf>,

    /// Per-scan rule overrides as a JSON object keyed by rule name,
    /// e.g. '{"old-logs": {"older_than": "1d"}}'.
    #[arg(long, value_name = "JSON")]
    pub overrides: Option<String>,
}

/// Arguments for the `clean` command.
#[derive(Parser, Debug)]
pub struct CleanArgs {
    /// Candidate paths to quarantine.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Roots to re-scan (default: configured roots). Only roots that
    /// contain a requested path are scanned.
    #[arg(long = "root", value_name = "DIR")]
    pub roots: Vec<PathBuf>,

    /// Skip items that fail to move instead of rolling everything back.
    #[arg(long)]
    pub best_effort: bool,

    /// Rule overrides used when re-scanning (same format as `scan`).
    #[arg(long, value_name = "JSON")]
    pub overrides: Option<String>,
}

/// Arguments for the `undo` command.
#[derive(Parser, Debug)]
pub struct UndoArgs {
    /// Operation id to undo.
    #[arg(
        value_parser = clap::value_parser!(u64).range(1..),
        required_unless_present = "last"
    )]
    pub id: Option<u64>,

    /// Undo the newest operation that is still applied.
    #[arg(long, conflicts_with = "id")]
    pub last: bool,
}

/// Arguments for the `history` command.
#[derive(Parser, Debug)]
pub struct HistoryArgs {
    /// Only records with this status (applied, undone, failed_partial).
    #[arg(long)]
    pub status: Option<String>,

    /// Only records created at or after this RFC 3339 timestamp.
    #[arg(long)]
    pub since: Option<String>,

    /// Only records created at or before this RFC 3339 timestamp.
    #[arg(long)]
    pub until: Option<String>,

    /// Print only the newest record.
    #[arg(long, conflicts_with_all = ["status", "since", "until"])]
    pub latest: bool,
}

/// Lock subcommands.
#[derive(Parser, Debug)]
pub struct LockCommand {
    #[command(subcommand)]
    pub action: LockAction,
}

/// Available lock actions.
#[derive(Subcommand, Debug)]
pub enum LockAction {
    /// List all active locks.
    ///
    /// Shows root and history locks with their age and owner.
    List,

    /// Clear a specific lock.
    ///
    /// Requires --force flag to prevent accidental clearing.
    Clear(LockClearArgs),
}

/// Arguments for the `lock clear` command.
#[derive(Parser, Debug)]
pub struct LockClearArgs {
    /// Lock name as shown by `lock list` ("history" or "root-...").
    pub name: String,

    /// Force clearing the lock (required for safety).
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
