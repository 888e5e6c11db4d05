//! Handler for `galley tree`.

use std::path::{Path, PathBuf};

use miette::Result;

use galley_ops::ops_tree::{self, TreeOptions};

pub fn exec(
    config: &Path,
    repository: Option<PathBuf>,
    depth: Option<usize>,
    why: Option<String>,
    overrides: bool,
) -> Result<()> {
    let opts = TreeOptions {
        repository,
        depth,
        why,
        overrides,
    };
    ops_tree::tree(config, &opts)
}
