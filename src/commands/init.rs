//! Implementation of the `reclaim init` command.
//!
//! Creates the state directory layout and writes the default `config.yaml`.
//! The command is idempotent: directories are created if missing and an
//! existing config is left exactly as it is.

use crate::config::Config;
use crate::context::AppContext;
use crate::error::{ReclaimError, Result};
use crate::fs::atomic_write_file;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_HEADER: &str = "\
# reclaim configuration.
# Files matching a rule are moved into quarantine by `reclaim clean` and can
# be restored with `reclaim undo <id>`.
";

#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub state_dir: PathBuf,
    pub config: PathBuf,
    pub created_config: bool,
}

pub fn run(ctx: &AppContext) -> Result<InitOutput> {
    for dir in [&ctx.state_dir, &ctx.history_dir, &ctx.locks_dir] {
        create_dir(dir)?;
    }

    let config_path = ctx.config_path();
    let created_config = !config_path.exists();
    if created_config {
        let yaml = Config::default().to_yaml()?;
        atomic_write_file(&config_path, &format!("{}{}", CONFIG_HEADER, yaml))?;
        tracing::info!(path = %config_path.display(), "wrote default config");
    } else {
        tracing::debug!(path = %config_path.display(), "config exists, left untouched");
    }

    Ok(InitOutput {
        state_dir: ctx.state_dir.clone(),
        config: config_path,
        created_config,
    })
}

fn create_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| {
        ReclaimError::UserError(format!(
            "failed to create directory '{}': {}",
            dir.display(),
            e
        ))
    })
}
