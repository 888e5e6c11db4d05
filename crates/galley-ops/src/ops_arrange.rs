//! Operation: print the event stream of every resolved config.

use std::path::{Path, PathBuf};

use galley_arranger::arrange::arrange_all;
use galley_arranger::handler::EventRecorder;
use galley_arranger::replay::replay_all;
use galley_core::config_id::ConfigId;
use galley_resolver::merge::ResolvedConfig;
use galley_util::errors::{GalleyError, GalleyResult};
use galley_util::progress;

use crate::context::ProvisioningContext;

/// Options for `galley arrange`.
#[derive(Default)]
pub struct ArrangeOptions {
    pub repository: Option<PathBuf>,
    /// Only configs matching this id or pattern (`model/`, `/name`).
    pub config: Option<String>,
}

/// Resolve, arrange and replay the configs into a recorder, then print it.
pub fn arrange(config_path: &Path, opts: &ArrangeOptions) -> miette::Result<()> {
    let context = ProvisioningContext::load(config_path, opts.repository.as_deref())?;
    let plan = context.plan()?;
    let configs = select(plan.configs, opts.config.as_deref())?;

    let arrangements = arrange_all(&configs)?;
    let mut recorder = EventRecorder::new();
    replay_all(&arrangements, &mut recorder)?;

    print!("{}", recorder.render());
    let features: usize = arrangements.iter().map(|a| a.features.len()).sum();
    progress::status(
        "Arranged",
        &format!("{} config(s), {features} feature(s)", arrangements.len()),
    );
    Ok(())
}

/// Keep the configs `filter` matches; a filter matching nothing is an error.
pub fn select(configs: Vec<ResolvedConfig>, filter: Option<&str>) -> GalleyResult<Vec<ResolvedConfig>> {
    let Some(filter) = filter else {
        return Ok(configs);
    };
    let pattern = ConfigId::parse(filter)?;
    let selected: Vec<ResolvedConfig> = configs
        .into_iter()
        .filter(|c| pattern.matches(&c.id))
        .collect();
    if selected.is_empty() {
        return Err(GalleyError::Config {
            message: format!("No resolved config matches '{filter}'"),
        });
    }
    Ok(selected)
}
