//! `reclaim undo ID` and `reclaim undo --last`.

use crate::cli::UndoArgs;
use crate::context::AppContext;
use crate::error::{ReclaimError, Result};
use crate::history::HistoryStore;
use crate::undo::{UndoManager, UndoOutcome};

pub fn run(ctx: &AppContext, args: &UndoArgs) -> Result<UndoOutcome> {
    let history = HistoryStore::open(ctx);
    let undo = UndoManager::new(ctx, &history);
    match (args.id, args.last) {
        (Some(id), false) => undo.undo(id),
        (None, true) => undo.undo_last(),
        _ => Err(ReclaimError::UserError(
            "give either an operation id or --last".to_string(),
        )),
    }
}
