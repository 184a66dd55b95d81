//! Command implementations for reclaim.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Each command has a `run` function returning a
//! serializable payload; the dispatcher prints it to stdout as JSON.

mod clean;
mod config;
mod history;
mod init;
mod lock;
mod scan;
mod undo;

use crate::cli::{Command, ConfigAction, LockAction};
use crate::context::AppContext;
use crate::error::{ReclaimError, Result};
use crate::rules::RuleOverrides;
use crate::scanner::CancelToken;
use serde::Serialize;

/// Dispatch a command to its implementation.
///
/// `cancel` is observed by scan and clean.
pub fn dispatch(ctx: &AppContext, command: Command, cancel: &CancelToken) -> Result<()> {
    match command {
        Command::Init => print_json(&init::run(ctx)?),
        Command::Config(cmd) => match cmd.action {
            ConfigAction::Show => print_json(&config::show(ctx)?),
            ConfigAction::Validate => print_json(&config::validate(ctx)),
        },
        Command::Scan(args) => print_json(&scan::run(ctx, &args, cancel)?),
        Command::Clean(args) => print_json(&clean::run(ctx, &args, cancel)?),
        Command::Undo(args) => print_json(&undo::run(ctx, &args)?),
        Command::History(args) => print_json(&history::run(ctx, &args)?),
        Command::Lock(cmd) => match cmd.action {
            LockAction::List => print_json(&lock::list(ctx)?),
            LockAction::Clear(args) => print_json(&lock::clear(ctx, &args)?),
        },
    }
}

/// Print a payload to stdout as pretty JSON.
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(|e| {
        ReclaimError::UserError(format!("failed to serialize command output: {}", e))
    })?;
    println!("{}", text);
    Ok(())
}

/// Parse the `--overrides` JSON object.
pub(crate) fn parse_overrides(raw: Option<&str>) -> Result<Option<RuleOverrides>> {
    raw.map(|json| {
        serde_json::from_str::<RuleOverrides>(json)
            .map_err(|e| ReclaimError::UserError(format!("invalid --overrides JSON: {}", e)))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Quantity;

    #[test]
    fn overrides_parse_into_rule_map() {
        let parsed = parse_overrides(Some(
            r#"{"old-logs": {"older_than": "1d"}, "temp-files": {"enabled": false}}"#,
        ))
        .unwrap()
        .unwrap();

        assert_eq!(
            parsed["old-logs"].older_than,
            Some(Quantity::Text("1d".to_string()))
        );
        assert_eq!(parsed["temp-files"].enabled, Some(false));
    }

    #[test]
    fn missing_overrides_are_none() {
        assert!(parse_overrides(None).unwrap().is_none());
    }

    #[test]
    fn malformed_overrides_are_user_errors() {
        for raw in ["not json", "[1, 2]", r#"{"x": {"colour": "red"}}"#] {
            let err = parse_overrides(Some(raw)).unwrap_err();
            assert!(matches!(err, ReclaimError::UserError(_)), "{}", raw);
        }
    }
}
