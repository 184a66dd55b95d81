//! Reclaim: reversible, audited filesystem cleanup.
//!
//! This is the main entry point for the `reclaim` CLI. It parses arguments,
//! sets up logging, dispatches to the command handler, and reports errors as
//! JSON on stderr with a per-kind exit code.

mod candidate;
mod cleaner;
mod cli;
mod commands;
mod config;
mod context;
mod error;
mod exit_codes;
mod fs;
mod history;
mod locks;
mod logging;
mod record;
mod rules;
mod scanner;
mod undo;

#[cfg(test)]
mod test_support;

use cli::Cli;
use context::AppContext;
use error::ReclaimError;
use scanner::CancelToken;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("Warning: {:#}", e);
    }

    // Ctrl-C stops a scan, or a clean before its first move. Once files are
    // moving the clean runs to a recorded end state.
    let cancel = CancelToken::new();
    let flag = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, cancelling");
        flag.cancel();
    }) {
        tracing::warn!(error = %e, "failed to install Ctrl+C handler");
    }

    let result = AppContext::resolve(cli.state_dir.as_deref())
        .and_then(|ctx| commands::dispatch(&ctx, cli.command, &cancel));

    match result {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => report(&err),
    }
}

fn report(err: &ReclaimError) -> ExitCode {
    tracing::debug!(kind = err.kind(), "command failed");
    match serde_json::to_string(&err.to_body()) {
        Ok(body) => eprintln!("{}", body),
        Err(_) => eprintln!("Error: {}", err),
    }
    ExitCode::from(err.exit_code() as u8)
}
