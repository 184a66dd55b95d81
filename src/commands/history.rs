//! `reclaim history`: list recorded operations, or the newest one.

use crate::cli::HistoryArgs;
use crate::context::AppContext;
use crate::error::{ReclaimError, Result};
use crate::history::{HistoryFilter, HistoryStore};
use crate::record::{OperationRecord, RecordStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum HistoryOutput {
    Records(Vec<OperationRecord>),
    Latest(Box<OperationRecord>),
}

pub fn run(ctx: &AppContext, args: &HistoryArgs) -> Result<HistoryOutput> {
    let history = HistoryStore::open(ctx);

    if args.latest {
        return match history.latest()? {
            Some(record) => Ok(HistoryOutput::Latest(Box::new(record))),
            None => Err(ReclaimError::NotFoundError(
                "no operations have been recorded".to_string(),
            )),
        };
    }

    let filter = build_filter(args)?;
    Ok(HistoryOutput::Records(history.list(filter)?.collect()))
}

fn build_filter(args: &HistoryArgs) -> Result<HistoryFilter> {
    let status = args
        .status
        .as_deref()
        .map(|s| {
            RecordStatus::from_str(s).ok_or_else(|| {
                ReclaimError::UserError(format!(
                    "invalid status '{}': expected applied, undone or failed_partial",
                    s
                ))
            })
        })
        .transpose()?;

    Ok(HistoryFilter {
        status,
        since: args.since.as_deref().map(parse_timestamp).transpose()?,
        until: args.until.as_deref().map(parse_timestamp).transpose()?,
    })
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            ReclaimError::UserError(format!("invalid timestamp '{}' (expected RFC 3339): {}", s, e))
        })
}
