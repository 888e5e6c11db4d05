//! Handler for `galley resolve`.

use std::path::{Path, PathBuf};

use miette::Result;

use galley_ops::ops_resolve::{self, ResolveOptions};

pub fn exec(config: &Path, repository: Option<PathBuf>, json: bool) -> Result<()> {
    ops_resolve::resolve(config, &ResolveOptions { repository, json })
}
