//! Tracing setup for the `reclaim` binary.
//!
//! Logs go to stderr so stdout carries nothing but the JSON result.

use anyhow::Context;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "reclaim=warn";
const VERBOSE_LOG_FILTER: &str = "reclaim=debug";

/// Install the global subscriber. `verbose` takes precedence over `RUST_LOG`.
pub fn init(verbose: bool) -> anyhow::Result<()> {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_LOG_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(filter),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}
