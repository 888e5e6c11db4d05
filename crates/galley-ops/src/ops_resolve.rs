//! Operation: list what an installation would contain.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use galley_resolver::engine::ProvisioningPlan;
use galley_util::errors::GalleyError;
use galley_util::progress;

use crate::context::ProvisioningContext;
use crate::ops_tree::replaced_requests;

/// Options for `galley resolve`.
#[derive(Default)]
pub struct ResolveOptions {
    /// Local repository root, instead of the global config's.
    pub repository: Option<PathBuf>,
    /// Print JSON instead of text.
    pub json: bool,
}

/// Resolve the provisioning config and print every installed feature-pack.
pub fn resolve(config_path: &Path, opts: &ResolveOptions) -> miette::Result<()> {
    let context = ProvisioningContext::load(config_path, opts.repository.as_deref())?;
    let plan = context.plan()?;

    if opts.json {
        let text = serde_json::to_string_pretty(&to_json(&plan)).map_err(|e| GalleyError::Generic {
            message: format!("Failed to serialize resolution: {e}"),
        })?;
        println!("{text}");
    } else {
        print!("{}", render(&plan));
    }
    for node in plan.graph.nodes() {
        for edge in replaced_requests(node) {
            progress::status_warn(
                "Overridden",
                &format!("{} with {}", edge.requested, node.fpid),
            );
        }
    }
    progress::status_info(
        "Resolved",
        &format!(
            "{} feature-pack(s), {} config(s)",
            plan.feature_packs.len(),
            plan.configs.len()
        ),
    );
    Ok(())
}

/// One block per feature-pack, dependencies first.
pub fn render(plan: &ProvisioningPlan) -> String {
    let mut out = String::new();
    for pack in &plan.feature_packs {
        out.push_str(&format!("{}\n", pack.fpid));
        out.push_str(&format!("  packages: {}\n", list(pack.packages.iter())));
        out.push_str(&format!("  configs: {}\n", list(pack.configs.iter())));
    }
    out
}

/// The same listing as [`render`], plus the merged configs.
pub fn to_json(plan: &ProvisioningPlan) -> Value {
    let feature_packs: Vec<Value> = plan
        .feature_packs
        .iter()
        .map(|pack| {
            json!({
                "fpid": pack.fpid.to_string(),
                "packages": pack.packages,
                "configs": pack.configs.iter().map(ToString::to_string).collect::<Vec<_>>(),
            })
        })
        .collect();
    let configs: Vec<Value> = plan
        .configs
        .iter()
        .map(|config| {
            json!({
                "id": config.id.to_string(),
                "props": config.props,
                "features": config.features.len(),
            })
        })
        .collect();
    json!({
        "feature-packs": feature_packs,
        "configs": configs,
    })
}

fn list<T: ToString>(items: impl Iterator<Item = T>) -> String {
    let items: Vec<String> = items.map(|i| i.to_string()).collect();
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}
