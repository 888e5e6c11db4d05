//! Handler for `galley arrange`.

use std::path::{Path, PathBuf};

use miette::Result;

use galley_ops::ops_arrange::{self, ArrangeOptions};

pub fn exec(config: &Path, repository: Option<PathBuf>, only: Option<String>) -> Result<()> {
    let opts = ArrangeOptions {
        repository,
        config: only,
    };
    ops_arrange::arrange(config, &opts)
}
