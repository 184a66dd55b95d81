//! `reclaim lock list` and `reclaim lock clear`.

use crate::cli::LockClearArgs;
use crate::context::AppContext;
use crate::error::{ReclaimError, Result};
use crate::locks::{self, LockInfo};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct LockListing {
    pub locks: Vec<LockInfo>,
    pub stale_count: usize,
    pub stale_after_minutes: u32,
}

#[derive(Debug, Serialize)]
pub struct ClearedLock {
    pub cleared: LockInfo,
    pub age_minutes: i64,
}

pub fn list(ctx: &AppContext) -> Result<LockListing> {
    let config = ctx.load_config()?;
    let locks = locks::list_locks(ctx, &config)?;
    let stale_count = locks.iter().filter(|l| l.is_stale).count();
    if stale_count > 0 {
        tracing::warn!(
            stale_count,
            "stale locks found; use `reclaim lock clear <name> --force` to clear"
        );
    }

    Ok(LockListing {
        locks,
        stale_count,
        stale_after_minutes: config.lock_stale_minutes,
    })
}

pub fn clear(ctx: &AppContext, args: &LockClearArgs) -> Result<ClearedLock> {
    if !args.force {
        return Err(ReclaimError::UserError(format!(
            "refusing to clear lock without --force. Only clear a lock if its holder has \
             crashed; run `reclaim lock clear {} --force`",
            args.name
        )));
    }

    let config = ctx.load_config()?;
    let cleared = locks::clear_lock(ctx, &args.name, &config)?;
    tracing::warn!(
        name = %cleared.name,
        owner = %cleared.metadata.owner,
        action = %cleared.metadata.action,
        stale = cleared.is_stale,
        "lock cleared"
    );

    Ok(ClearedLock {
        age_minutes: cleared.metadata.age().num_minutes(),
        cleared,
    })
}
