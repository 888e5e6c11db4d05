//! Command dispatch and handler modules.

mod arrange;
mod resolve;
mod tree;

use std::path::{Path, PathBuf};

use miette::Result;

use galley_core::provisioning::PROVISIONING_FILE;
use galley_util::errors::GalleyError;
use galley_util::fs::find_ancestor_with;

use crate::cli::{Cli, Command};

/// Route a parsed CLI invocation to the appropriate command handler.
pub fn dispatch(cli: Cli) -> Result<()> {
    let config = provisioning_path(cli.config.as_deref())?;
    tracing::debug!("Using provisioning config {}", config.display());
    let repository = cli.repository;
    match cli.command {
        Command::Resolve { json } => resolve::exec(&config, repository, json),
        Command::Tree {
            depth,
            why,
            overrides,
        } => tree::exec(&config, repository, depth, why, overrides),
        Command::Arrange { only } => arrange::exec(&config, repository, only),
    }
}

/// The explicit `--config` path, or the nearest provisioning config above
/// the current directory.
fn provisioning_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(GalleyError::Config {
                message: format!("Provisioning config {} does not exist", path.display()),
            }
            .into());
        }
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(GalleyError::Io)?;
    let root = find_ancestor_with(&cwd, PROVISIONING_FILE).ok_or_else(|| GalleyError::Config {
        message: format!("Could not find {PROVISIONING_FILE} in current or parent directories"),
    })?;
    Ok(root.join(PROVISIONING_FILE))
}
